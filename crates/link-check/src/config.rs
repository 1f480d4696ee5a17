//! Configuration for the link check service.
//!
//! Everything is read from the environment once at startup; handlers only
//! ever see the resulting [`Config`].

use std::env;

use workitems::StrictnessPolicy;

use crate::error::LinkCheckError;

/// Default GitHub REST endpoint.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Default HTTP listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Link check service configuration.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Webhook secret for `X-Hub-Signature-256` verification.
    pub webhook_secret: Option<String>,
    /// Token for GitHub API calls.
    pub github_token: Option<String>,
    /// GitHub API base URL (override for GitHub Enterprise or tests).
    pub github_api_url: String,
    /// Whether `pull_request.opened` is handled in addition to edits.
    pub process_pr_opened: bool,
    /// Re-fetch the PR from the API instead of trusting the webhook payload.
    pub always_fetch_pr: bool,
    /// Ignore events sent by the Copilot agent.
    pub ignore_copilot: bool,
    /// Fail the check while any reference is still unlinked.
    pub require_all_linked: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }
}

impl Config {
    /// Build the configuration from a variable lookup.
    ///
    /// Opt-in flags are enabled only by the exact value `true`; opt-out flags
    /// are disabled only by the exact value `false`.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let opt_in = |key: &str| get(key).is_some_and(|v| v == "true");
        let opt_out = |key: &str| get(key).is_none_or(|v| v != "false");

        Self {
            port: get("PORT")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            webhook_secret: get("WEBHOOK_SECRET").filter(|s| !s.is_empty()),
            github_token: get("GITHUB_TOKEN").filter(|s| !s.is_empty()),
            github_api_url: get("GITHUB_API_URL")
                .filter(|s| !s.is_empty())
                .map_or_else(
                    || DEFAULT_GITHUB_API_URL.to_string(),
                    |s| s.trim_end_matches('/').to_string(),
                ),
            process_pr_opened: opt_in("PROCESS_PR_OPENED"),
            always_fetch_pr: opt_out("ALWAYS_FETCH_PR"),
            ignore_copilot: opt_out("IGNORE_COPILOT"),
            require_all_linked: opt_in("PASS_REQUIRES_ALL_LINKED_WORKITEMS"),
        }
    }

    /// Strictness policy handed to the verdict builder.
    #[must_use]
    pub const fn policy(&self) -> StrictnessPolicy {
        StrictnessPolicy {
            require_all_linked: self.require_all_linked,
        }
    }

    /// Check values that cannot be defaulted.
    pub fn validate(&self) -> Result<(), LinkCheckError> {
        if !self.github_api_url.starts_with("http://")
            && !self.github_api_url.starts_with("https://")
        {
            return Err(LinkCheckError::Config(format!(
                "GITHUB_API_URL must be an http(s) URL, got {}",
                self.github_api_url
            )));
        }
        if self.port == 0 {
            return Err(LinkCheckError::Config("PORT must not be 0".to_string()));
        }
        Ok(())
    }
}
