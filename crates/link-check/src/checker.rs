//! Turns webhook deliveries into work item check runs.
//!
//! Flow for a handled delivery:
//! 1. Apply the event filter (event action, ignored actors)
//! 2. Resolve the PR description, either from the payload or from the API
//! 3. Validate it with [`workitems::validate`]
//! 4. Post the outcome as a completed check run

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use workitems::{validate, Conclusion, StrictnessPolicy, ValidationOutcome};

use crate::config::Config;
use crate::error::LinkCheckError;
use crate::github::{CheckRunRequest, ChecksApi, PullRequestSnapshot, RepoRef};
use crate::webhooks::{CheckRunEvent, EventFilter, IgnoreReason, PullRequestEvent, WebhookEvent};

/// Title posted when a rerequested check has no associated PR.
pub const DEFAULT_TITLE: &str = "Work item validation";

/// Summary posted when a rerequested check has no associated PR.
pub const DEFAULT_SUMMARY: &str = "The check has passed!";

/// What happened to a delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// A check run was created.
    Created {
        check_run_id: u64,
        conclusion: Conclusion,
        title: String,
    },
    /// The PR is not open; nothing was posted.
    Skipped { pr_state: Option<String> },
    /// The delivery did not qualify for validation.
    Ignored(IgnoreReason),
}

/// Work item check for one GitHub installation.
pub struct LinkChecker<A> {
    api: A,
    filter: EventFilter,
    policy: StrictnessPolicy,
    always_fetch_pr: bool,
}

impl<A: ChecksApi> LinkChecker<A> {
    /// Create a checker from the service configuration.
    pub fn new(api: A, config: &Config) -> Self {
        Self {
            api,
            filter: EventFilter::from_config(config),
            policy: config.policy(),
            always_fetch_pr: config.always_fetch_pr,
        }
    }

    /// Handle any webhook delivery.
    pub async fn handle(&self, event: &WebhookEvent) -> Result<CheckOutcome, LinkCheckError> {
        match event {
            WebhookEvent::PullRequest(event) => self.handle_pull_request(event).await,
            WebhookEvent::CheckRun(event) => self.handle_check_run(event).await,
            WebhookEvent::Other(event_type) => {
                debug!(event_type = %event_type, "Ignoring unhandled event type");
                Ok(CheckOutcome::Ignored(IgnoreReason::UnhandledEvent))
            }
        }
    }

    /// Validate a PR after `opened`, `edited`, `reopened` or `synchronize`.
    pub async fn handle_pull_request(
        &self,
        event: &PullRequestEvent,
    ) -> Result<CheckOutcome, LinkCheckError> {
        let started_at = Utc::now();

        if let Some(reason) = self.filter.pull_request_ignore_reason(event) {
            info!(
                action = %event.action,
                sender = event.sender_login().unwrap_or("unknown"),
                reason = reason.as_str(),
                "Ignoring pull_request event"
            );
            return Ok(CheckOutcome::Ignored(reason));
        }

        let repo = event
            .repository
            .repo_ref()
            .ok_or(LinkCheckError::MissingField("repository"))?;
        let pull_number = event
            .pull_number()
            .ok_or(LinkCheckError::MissingField("number"))?;
        let head = &event.pull_request.head;
        let head_sha = head
            .sha
            .clone()
            .ok_or(LinkCheckError::MissingField("pull_request.head.sha"))?;
        let pr_state = event.pull_request.state.as_deref();

        info!(
            pull_number,
            repo = %repo.full_name(),
            always_fetch_pr = self.always_fetch_pr,
            "Handling pull request event"
        );

        if let Some(state) = pr_state.filter(|s| !s.is_empty() && *s != "open") {
            info!(pull_number, pr_state = state, "Skipping check run: PR not open");
            return Ok(CheckOutcome::Skipped {
                pr_state: Some(state.to_string()),
            });
        }

        let supplied = (!self.always_fetch_pr).then(|| PullRequestSnapshot {
            body: Some(event.pull_request.body.clone().unwrap_or_default()),
            state: event.pull_request.state.clone(),
        });

        let outcome = self
            .validate_pull_request(&repo, pull_number, supplied)
            .await?;
        if outcome.skipped {
            info!(pull_number, pr_state = ?outcome.pr_state, "Skipping check run: PR not open");
            return Ok(CheckOutcome::Skipped {
                pr_state: outcome.pr_state,
            });
        }

        self.post_check_run(
            &repo,
            Some(pull_number),
            head.ref_name.clone(),
            head_sha,
            started_at,
            outcome,
        )
        .await
    }

    /// Revalidate when a user re-runs the check from the Checks tab.
    pub async fn handle_check_run(
        &self,
        event: &CheckRunEvent,
    ) -> Result<CheckOutcome, LinkCheckError> {
        let started_at = Utc::now();

        if let Some(reason) = self.filter.check_run_ignore_reason(event) {
            info!(
                action = %event.action,
                sender = event.sender_login().unwrap_or("unknown"),
                reason = reason.as_str(),
                "Ignoring check_run event"
            );
            return Ok(CheckOutcome::Ignored(reason));
        }

        let repo = event
            .repository
            .repo_ref()
            .ok_or(LinkCheckError::MissingField("repository"))?;
        let head_sha = event
            .head_sha()
            .ok_or(LinkCheckError::MissingField("check_run.head_sha"))?;
        let pull_number = event.pull_number();

        info!(
            pull_number = ?pull_number,
            repo = %repo.full_name(),
            "Handling check run request"
        );

        let outcome = match pull_number {
            Some(number) => {
                let outcome = self.validate_pull_request(&repo, number, None).await?;
                if outcome.skipped {
                    info!(
                        pull_number = number,
                        pr_state = ?outcome.pr_state,
                        "Skipping check run: PR not open"
                    );
                    return Ok(CheckOutcome::Skipped {
                        pr_state: outcome.pr_state,
                    });
                }
                outcome
            }
            None => passing_outcome(),
        };

        self.post_check_run(
            &repo,
            pull_number,
            event.head_branch(),
            head_sha,
            started_at,
            outcome,
        )
        .await
    }

    /// Validate a PR, fetching it unless a snapshot from the payload is supplied.
    pub async fn validate_pull_request(
        &self,
        repo: &RepoRef,
        pull_number: u64,
        supplied: Option<PullRequestSnapshot>,
    ) -> Result<ValidationOutcome, LinkCheckError> {
        let pr = match supplied {
            Some(pr) => pr,
            None => self.api.get_pull_request(repo, pull_number).await?,
        };

        Ok(validate(pr.body.as_deref(), pr.state.as_deref(), self.policy))
    }

    async fn post_check_run(
        &self,
        repo: &RepoRef,
        pull_number: Option<u64>,
        head_branch: Option<String>,
        head_sha: String,
        started_at: DateTime<Utc>,
        outcome: ValidationOutcome,
    ) -> Result<CheckOutcome, LinkCheckError> {
        info!(
            pull_number = ?pull_number,
            conclusion = %outcome.conclusion,
            head_branch = head_branch.as_deref().unwrap_or(""),
            head_sha = %head_sha,
            "Creating check run"
        );

        let request = CheckRunRequest::completed(
            head_branch,
            head_sha,
            started_at,
            outcome.conclusion,
            outcome.title,
            outcome.summary,
        );
        let check_run = self.api.create_check_run(repo, &request).await?;

        Ok(CheckOutcome::Created {
            check_run_id: check_run.id,
            conclusion: request.conclusion,
            title: request.output.title,
        })
    }
}

fn passing_outcome() -> ValidationOutcome {
    ValidationOutcome {
        conclusion: Conclusion::Success,
        summary: DEFAULT_SUMMARY.to_string(),
        title: DEFAULT_TITLE.to_string(),
        linked: Vec::new(),
        unlinked: Vec::new(),
        skipped: false,
        pr_state: None,
    }
}
