//! GitHub webhook payload parsing, signature verification and event filtering.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::error::LinkCheckError;
use crate::github::RepoRef;

type HmacSha256 = Hmac<Sha256>;

/// Login of the Copilot coding agent.
pub const COPILOT_LOGIN: &str = "copilot";

/// Verify a GitHub webhook signature.
///
/// # Arguments
/// * `body` - Raw webhook body bytes
/// * `signature` - Value of the `X-Hub-Signature-256` header (`sha256=<hex>`)
/// * `secret` - Webhook secret
///
/// # Returns
/// `true` if signature is valid, `false` otherwise
#[must_use]
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let Some(hex_signature) = signature.strip_prefix("sha256=") else {
        return false;
    };
    let Ok(signature_bytes) = hex::decode(hex_signature) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// GitHub user
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    /// User login
    pub login: String,
}

/// Git reference (branch head)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitRef {
    /// Branch name
    #[serde(rename = "ref", default)]
    pub ref_name: Option<String>,
    /// Head commit SHA
    #[serde(default)]
    pub sha: Option<String>,
}

/// Repository as embedded in webhook payloads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Repository {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub owner: Option<GitHubUser>,
}

impl Repository {
    /// Owner and name, when both are present.
    #[must_use]
    pub fn repo_ref(&self) -> Option<RepoRef> {
        let owner = self.owner.as_ref()?;
        let name = self.name.as_ref()?;
        Some(RepoRef::new(owner.login.clone(), name.clone()))
    }
}

/// Pull request as embedded in `pull_request` events
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PullRequest {
    #[serde(default)]
    pub number: Option<u64>,
    /// PR description
    #[serde(default)]
    pub body: Option<String>,
    /// PR state (open, closed)
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub head: GitRef,
}

/// `pull_request` event payload (simplified)
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
    /// Action type (opened, edited, reopened, synchronize, ...)
    pub action: String,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub pull_request: PullRequest,
    #[serde(default)]
    pub repository: Repository,
    /// User who triggered the event
    #[serde(default)]
    pub sender: Option<GitHubUser>,
}

impl PullRequestEvent {
    /// PR number from the pull request object, falling back to the event.
    #[must_use]
    pub fn pull_number(&self) -> Option<u64> {
        self.pull_request.number.or(self.number)
    }

    #[must_use]
    pub fn sender_login(&self) -> Option<&str> {
        self.sender.as_ref().map(|s| s.login.as_str())
    }
}

/// Minimal PR reference attached to check runs and suites
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestRef {
    pub number: u64,
}

/// Commit target shared by `check_run` and `check_suite` objects
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckTarget {
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub head_sha: Option<String>,
    #[serde(default)]
    pub pull_requests: Vec<PullRequestRef>,
}

/// `check_run` event payload (simplified)
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRunEvent {
    /// Action type (created, completed, rerequested, ...)
    pub action: String,
    #[serde(default)]
    pub check_run: Option<CheckTarget>,
    #[serde(default)]
    pub check_suite: Option<CheckTarget>,
    #[serde(default)]
    pub repository: Repository,
    #[serde(default)]
    pub sender: Option<GitHubUser>,
}

impl CheckRunEvent {
    /// First value found on the check suite, then on the check run.
    fn suite_then_run<T>(&self, pick: impl Fn(&CheckTarget) -> Option<T>) -> Option<T> {
        self.check_suite
            .as_ref()
            .and_then(&pick)
            .or_else(|| self.check_run.as_ref().and_then(&pick))
    }

    #[must_use]
    pub fn head_branch(&self) -> Option<String> {
        self.suite_then_run(|t| t.head_branch.clone())
    }

    #[must_use]
    pub fn head_sha(&self) -> Option<String> {
        self.suite_then_run(|t| t.head_sha.clone())
    }

    /// Number of the first PR associated with the check.
    #[must_use]
    pub fn pull_number(&self) -> Option<u64> {
        self.suite_then_run(|t| t.pull_requests.first().map(|pr| pr.number))
    }

    #[must_use]
    pub fn sender_login(&self) -> Option<&str> {
        self.sender.as_ref().map(|s| s.login.as_str())
    }
}

/// A webhook delivery, keyed by the `X-GitHub-Event` header.
#[derive(Debug, Clone)]
pub enum WebhookEvent {
    PullRequest(Box<PullRequestEvent>),
    CheckRun(Box<CheckRunEvent>),
    /// Any other event type; not processed
    Other(String),
}

impl WebhookEvent {
    /// Decode a delivery body according to its event type.
    pub fn parse(event_type: &str, body: &[u8]) -> Result<Self, LinkCheckError> {
        match event_type {
            "pull_request" => Ok(Self::PullRequest(Box::new(serde_json::from_slice(body)?))),
            "check_run" => Ok(Self::CheckRun(Box::new(serde_json::from_slice(body)?))),
            other => Ok(Self::Other(other.to_string())),
        }
    }
}

/// Why a delivery was not turned into a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Event type the service does not subscribe to
    UnhandledEvent,
    /// Action of a handled event type that does not trigger validation
    UnhandledAction,
    /// Sent by an ignored actor
    IgnoredActor,
}

impl IgnoreReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnhandledEvent => "unhandled_event",
            Self::UnhandledAction => "unhandled_action",
            Self::IgnoredActor => "ignored_actor",
        }
    }
}

/// Event type and actor rules applied before any API call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventFilter {
    pub process_pr_opened: bool,
    pub ignore_copilot: bool,
}

impl EventFilter {
    #[must_use]
    pub const fn from_config(config: &Config) -> Self {
        Self {
            process_pr_opened: config.process_pr_opened,
            ignore_copilot: config.ignore_copilot,
        }
    }

    /// `pull_request` actions that trigger validation.
    #[must_use]
    pub fn pull_request_actions(&self) -> Vec<&'static str> {
        let mut actions = Vec::with_capacity(4);
        if self.process_pr_opened {
            actions.push("opened");
        }
        actions.extend(["edited", "reopened", "synchronize"]);
        actions
    }

    /// Reason to drop a `pull_request` event, if any.
    ///
    /// Copilot events are dropped except `synchronize`, so new commits are
    /// always validated.
    #[must_use]
    pub fn pull_request_ignore_reason(&self, event: &PullRequestEvent) -> Option<IgnoreReason> {
        if !self.pull_request_actions().contains(&event.action.as_str()) {
            return Some(IgnoreReason::UnhandledAction);
        }
        if self.is_ignored_actor(event.sender_login()) && event.action != "synchronize" {
            return Some(IgnoreReason::IgnoredActor);
        }
        None
    }

    /// Reason to drop a `check_run` event, if any.
    #[must_use]
    pub fn check_run_ignore_reason(&self, event: &CheckRunEvent) -> Option<IgnoreReason> {
        if event.action != "rerequested" {
            return Some(IgnoreReason::UnhandledAction);
        }
        if self.is_ignored_actor(event.sender_login()) {
            return Some(IgnoreReason::IgnoredActor);
        }
        None
    }

    fn is_ignored_actor(&self, login: Option<&str>) -> bool {
        self.ignore_copilot && login == Some(COPILOT_LOGIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const FILTER: EventFilter = EventFilter {
        process_pr_opened: false,
        ignore_copilot: true,
    };

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    fn pull_request_event(action: &str, sender: &str) -> PullRequestEvent {
        serde_json::from_value(json!({
            "action": action,
            "number": 121,
            "pull_request": {
                "body": "AB#1",
                "state": "open",
                "head": { "ref": "feature", "sha": "abc123" }
            },
            "repository": { "name": "testing-things", "owner": { "login": "thundering-mona" } },
            "sender": { "login": sender }
        }))
        .unwrap()
    }

    fn check_run_event(action: &str, sender: &str) -> CheckRunEvent {
        serde_json::from_value(json!({
            "action": action,
            "check_run": {
                "head_branch": "run-branch",
                "head_sha": "run-sha",
                "pull_requests": [{ "number": 121 }]
            },
            "repository": { "name": "testing-things", "owner": { "login": "thundering-mona" } },
            "sender": { "login": sender }
        }))
        .unwrap()
    }

    #[test]
    fn test_verify_webhook_signature_valid() {
        let body = b"test payload";
        let signature = sign(body, "test-secret");

        assert!(verify_webhook_signature(body, &signature, "test-secret"));
    }

    #[test]
    fn test_verify_webhook_signature_invalid() {
        let body = b"test payload";

        assert!(!verify_webhook_signature(body, &sign(body, "other"), "test-secret"));
        assert!(!verify_webhook_signature(body, "sha256=not-hex", "test-secret"));
        let bare = sign(body, "test-secret").replace("sha256=", "");
        assert!(!verify_webhook_signature(body, &bare, "test-secret"));
    }

    #[test]
    fn test_parse_pull_request_event() {
        let event = pull_request_event("edited", "developer");

        assert_eq!(event.pull_number(), Some(121));
        assert_eq!(event.pull_request.head.sha.as_deref(), Some("abc123"));
        assert_eq!(
            event.repository.repo_ref(),
            Some(RepoRef::new("thundering-mona", "testing-things"))
        );
    }

    #[test]
    fn test_parse_webhook_event_by_type() {
        let body = br#"{"action": "rerequested"}"#;

        assert!(matches!(
            WebhookEvent::parse("check_run", body).unwrap(),
            WebhookEvent::CheckRun(_)
        ));
        assert!(matches!(
            WebhookEvent::parse("issues", body).unwrap(),
            WebhookEvent::Other(t) if t == "issues"
        ));
        assert!(WebhookEvent::parse("pull_request", b"not json").is_err());
    }

    #[test]
    fn test_check_run_prefers_check_suite() {
        let mut event = check_run_event("rerequested", "developer");
        event.check_suite = Some(CheckTarget {
            head_branch: Some("suite-branch".to_string()),
            head_sha: None,
            pull_requests: vec![],
        });

        assert_eq!(event.head_branch().as_deref(), Some("suite-branch"));
        assert_eq!(event.head_sha().as_deref(), Some("run-sha"));
        assert_eq!(event.pull_number(), Some(121));
    }

    #[test]
    fn test_ignore_reason_labels() {
        assert_eq!(IgnoreReason::UnhandledEvent.as_str(), "unhandled_event");
        assert_eq!(IgnoreReason::UnhandledAction.as_str(), "unhandled_action");
        assert_eq!(IgnoreReason::IgnoredActor.as_str(), "ignored_actor");
    }

    #[test]
    fn test_pull_request_actions() {
        assert_eq!(
            FILTER.pull_request_actions(),
            vec!["edited", "reopened", "synchronize"]
        );
        let with_opened = EventFilter {
            process_pr_opened: true,
            ..FILTER
        };
        assert_eq!(with_opened.pull_request_actions()[0], "opened");
    }

    #[test]
    fn test_pull_request_filter() {
        assert_eq!(
            FILTER.pull_request_ignore_reason(&pull_request_event("edited", "developer")),
            None
        );
        assert_eq!(
            FILTER.pull_request_ignore_reason(&pull_request_event("opened", "developer")),
            Some(IgnoreReason::UnhandledAction)
        );
        assert_eq!(
            FILTER.pull_request_ignore_reason(&pull_request_event("edited", "copilot")),
            Some(IgnoreReason::IgnoredActor)
        );
        assert_eq!(
            FILTER.pull_request_ignore_reason(&pull_request_event("synchronize", "copilot")),
            None
        );

        let allow_copilot = EventFilter {
            ignore_copilot: false,
            ..FILTER
        };
        assert_eq!(
            allow_copilot.pull_request_ignore_reason(&pull_request_event("edited", "copilot")),
            None
        );
    }

    #[test]
    fn test_check_run_filter() {
        assert_eq!(
            FILTER.check_run_ignore_reason(&check_run_event("rerequested", "developer")),
            None
        );
        assert_eq!(
            FILTER.check_run_ignore_reason(&check_run_event("completed", "developer")),
            Some(IgnoreReason::UnhandledAction)
        );
        assert_eq!(
            FILTER.check_run_ignore_reason(&check_run_event("rerequested", "copilot")),
            Some(IgnoreReason::IgnoredActor)
        );
    }
}
