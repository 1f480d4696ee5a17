//! Validation of a pull request description.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::extract::extract_work_items;
use crate::verdict::{decide, Conclusion, StrictnessPolicy, NO_WORK_ITEMS_TITLE};

/// Summary reported for PRs that are not open.
pub const SKIPPED_SUMMARY: &str = "PR is closed; skipping validation.";

/// Result of validating one pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub conclusion: Conclusion,
    pub summary: String,
    pub title: String,
    pub linked: Vec<String>,
    pub unlinked: Vec<String>,
    /// Set when the PR was not in a state that can be evaluated
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    /// PR state as observed by the caller (open, closed, merged, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_state: Option<String>,
}

impl ValidationOutcome {
    fn skipped(pr_state: &str) -> Self {
        Self {
            conclusion: Conclusion::Neutral,
            summary: SKIPPED_SUMMARY.to_string(),
            title: NO_WORK_ITEMS_TITLE.to_string(),
            linked: Vec::new(),
            unlinked: Vec::new(),
            skipped: true,
            pr_state: Some(pr_state.to_string()),
        }
    }
}

/// Validate a PR description for work item references.
///
/// A PR whose `pr_state` is known and not `open` is skipped with a neutral
/// conclusion and the description is not scanned. A missing body is treated
/// as empty.
#[must_use]
pub fn validate(
    body: Option<&str>,
    pr_state: Option<&str>,
    policy: StrictnessPolicy,
) -> ValidationOutcome {
    if let Some(state) = pr_state.filter(|s| !s.is_empty() && *s != "open") {
        debug!(pr_state = state, "PR not open, skipping validation");
        return ValidationOutcome::skipped(state);
    }

    let extraction = extract_work_items(body.unwrap_or_default());
    let verdict = decide(&extraction, policy);

    debug!(
        linked = extraction.linked.len(),
        unlinked = extraction.unlinked.len(),
        conclusion = %verdict.conclusion,
        "Validated PR description"
    );

    ValidationOutcome {
        conclusion: verdict.conclusion,
        summary: verdict.summary,
        title: verdict.title,
        linked: extraction.linked,
        unlinked: extraction.unlinked,
        skipped: false,
        pr_state: pr_state.map(String::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINK_123: &str = "[AB#123](https://dev.azure.com/org/project/_workitems/edit/123)";

    #[test]
    fn test_closed_pr_is_skipped() {
        let outcome = validate(Some(LINK_123), Some("closed"), StrictnessPolicy::lenient());

        assert!(outcome.skipped);
        assert_eq!(outcome.conclusion, Conclusion::Neutral);
        assert_eq!(outcome.pr_state.as_deref(), Some("closed"));
        assert_eq!(outcome.summary, SKIPPED_SUMMARY);
        assert_eq!(outcome.title, "No work items found");
        assert!(outcome.linked.is_empty());
        assert!(outcome.unlinked.is_empty());
    }

    #[test]
    fn test_merged_pr_is_skipped() {
        let outcome = validate(Some(LINK_123), Some("merged"), StrictnessPolicy::lenient());

        assert!(outcome.skipped);
        assert_eq!(outcome.conclusion, Conclusion::Neutral);
    }

    #[test]
    fn test_open_pr_with_linked_work_item() {
        let outcome = validate(Some(LINK_123), Some("open"), StrictnessPolicy::lenient());

        assert!(!outcome.skipped);
        assert_eq!(outcome.conclusion, Conclusion::Success);
        assert_eq!(outcome.pr_state.as_deref(), Some("open"));
        assert_eq!(outcome.linked, vec![LINK_123]);
        assert!(outcome.unlinked.is_empty());
    }

    #[test]
    fn test_unknown_state_is_evaluated() {
        let outcome = validate(Some("Fixes AB#123"), None, StrictnessPolicy::lenient());

        assert!(!outcome.skipped);
        assert_eq!(outcome.conclusion, Conclusion::Failure);
        assert_eq!(outcome.unlinked, vec!["AB#123"]);
        assert!(outcome.pr_state.is_none());
    }

    #[test]
    fn test_missing_body() {
        let outcome = validate(None, Some("open"), StrictnessPolicy::lenient());

        assert_eq!(outcome.conclusion, Conclusion::Failure);
        assert!(outcome.summary.contains("No work item references found"));
    }

    #[test]
    fn test_strict_policy() {
        let body = format!("{LINK_123}\nAB#456");

        let lenient = validate(Some(&body), Some("open"), StrictnessPolicy::lenient());
        assert_eq!(lenient.conclusion, Conclusion::Success);
        assert_eq!(lenient.linked.len(), 1);
        assert_eq!(lenient.unlinked.len(), 1);

        let strict = validate(Some(&body), Some("open"), StrictnessPolicy::strict());
        assert_eq!(strict.conclusion, Conclusion::Failure);
        assert!(strict.summary.contains("**All work items must be linked.**"));
    }

    #[test]
    fn test_outcome_serialization_omits_defaults() {
        let open = validate(Some(LINK_123), None, StrictnessPolicy::lenient());
        let json = serde_json::to_value(&open).unwrap();
        assert!(json.get("skipped").is_none());
        assert!(json.get("pr_state").is_none());
        assert_eq!(json["conclusion"], "success");

        let closed = validate(None, Some("closed"), StrictnessPolicy::lenient());
        let json = serde_json::to_value(&closed).unwrap();
        assert_eq!(json["skipped"], true);
        assert_eq!(json["pr_state"], "closed");
    }
}
