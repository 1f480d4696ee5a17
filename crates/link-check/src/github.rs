//! GitHub API client for pull requests and check runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use workitems::Conclusion;

use crate::error::LinkCheckError;

/// Name of the check run shown on the PR.
pub const CHECK_NAME: &str = "Azure Boards Link Check";

/// Repository coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    #[must_use]
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// `owner/repo`
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// The parts of a pull request the check reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PullRequestSnapshot {
    /// PR description (null when empty)
    #[serde(default)]
    pub body: Option<String>,
    /// PR state (open, closed)
    #[serde(default)]
    pub state: Option<String>,
}

/// Output block of a check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunOutput {
    pub title: String,
    pub summary: String,
}

/// Request body for `POST /repos/{owner}/{repo}/check-runs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRunRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head_branch: Option<String>,
    pub head_sha: String,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub conclusion: Conclusion,
    pub completed_at: DateTime<Utc>,
    pub output: CheckRunOutput,
}

impl CheckRunRequest {
    /// A completed check run, stamped as finished now.
    #[must_use]
    pub fn completed(
        head_branch: Option<String>,
        head_sha: String,
        started_at: DateTime<Utc>,
        conclusion: Conclusion,
        title: String,
        summary: String,
    ) -> Self {
        Self {
            name: CHECK_NAME.to_string(),
            head_branch,
            head_sha,
            status: "completed".to_string(),
            started_at,
            conclusion,
            completed_at: Utc::now(),
            output: CheckRunOutput { title, summary },
        }
    }
}

/// Check run as returned by GitHub.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CheckRun {
    pub id: u64,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// The GitHub operations the check depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChecksApi: Send + Sync {
    /// Fetch a pull request.
    async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<PullRequestSnapshot, LinkCheckError>;

    /// Create a check run.
    async fn create_check_run(
        &self,
        repo: &RepoRef,
        request: &CheckRunRequest,
    ) -> Result<CheckRun, LinkCheckError>;
}

/// GitHub REST client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl GitHubClient {
    /// Create a new GitHub client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self, LinkCheckError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("boards-link-check/1.0"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
            None => request,
        }
    }

    async fn error_for_status(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, LinkCheckError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(LinkCheckError::GitHub { status, body })
    }
}

#[async_trait]
impl ChecksApi for GitHubClient {
    async fn get_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<PullRequestSnapshot, LinkCheckError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{number}",
            self.base_url, repo.owner, repo.repo
        );
        debug!(repo = %repo.full_name(), pull_number = number, "Fetching pull request");

        let response = self.authorize(self.client.get(&url)).send().await?;
        let response = Self::error_for_status(response).await?;

        Ok(response.json().await?)
    }

    async fn create_check_run(
        &self,
        repo: &RepoRef,
        request: &CheckRunRequest,
    ) -> Result<CheckRun, LinkCheckError> {
        let url = format!(
            "{}/repos/{}/{}/check-runs",
            self.base_url, repo.owner, repo.repo
        );

        let response = self
            .authorize(self.client.post(&url))
            .json(request)
            .send()
            .await?;
        let check_run: CheckRun = Self::error_for_status(response).await?.json().await?;

        info!(
            repo = %repo.full_name(),
            check_run_id = check_run.id,
            conclusion = %request.conclusion,
            "Created check run"
        );

        Ok(check_run)
    }
}
