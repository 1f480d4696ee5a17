//! Verdicts derived from extracted work item references.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::extract::ExtractionResult;

/// Documentation for the Azure Boards GitHub integration.
pub const BOARDS_INTEGRATION_URL: &str =
    "https://learn.microsoft.com/en-us/azure/devops/boards/github/?view=azure-devops";

/// Title used when the description references no work items.
pub const NO_WORK_ITEMS_TITLE: &str = "No work items found";

/// Summary used when the description references no work items.
pub const NO_REFERENCES_SUMMARY: &str = "No work item references found. Add AB#<id> or [AB#<id>](...). If work items are already linked, re-run this check from the Checks tab to refresh.";

/// Conclusion of a work item check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Conclusion {
    /// At least one linked work item, and the policy is satisfied
    Success,
    /// No linked work item, or unlinked references under the strict policy
    Failure,
    /// The PR was not evaluated
    Neutral,
}

impl Conclusion {
    /// Wire name used by the GitHub checks API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether every referenced work item has to be linked for the check to pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrictnessPolicy {
    /// Fail when any bare `AB#<id>` reference remains.
    pub require_all_linked: bool,
}

impl StrictnessPolicy {
    /// One linked work item is enough to pass.
    #[must_use]
    pub const fn lenient() -> Self {
        Self {
            require_all_linked: false,
        }
    }

    /// Every reference has to be linked to pass.
    #[must_use]
    pub const fn strict() -> Self {
        Self {
            require_all_linked: true,
        }
    }
}

impl From<bool> for StrictnessPolicy {
    fn from(require_all_linked: bool) -> Self {
        Self { require_all_linked }
    }
}

/// Conclusion plus the rendered check output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub conclusion: Conclusion,
    /// One-line check title
    pub title: String,
    /// Markdown report listing linked and unlinked references
    pub summary: String,
}

/// Build the verdict for an extraction under `policy`.
#[must_use]
pub fn decide(extraction: &ExtractionResult, policy: StrictnessPolicy) -> Verdict {
    Verdict {
        conclusion: determine_conclusion(
            extraction.has_linked(),
            extraction.has_unlinked(),
            policy.require_all_linked,
        ),
        title: build_title(extraction),
        summary: build_summary(extraction, policy),
    }
}

fn determine_conclusion(
    has_linked: bool,
    has_unlinked: bool,
    require_all_linked: bool,
) -> Conclusion {
    // At least one linked work item is always required
    if !has_linked {
        return Conclusion::Failure;
    }

    if require_all_linked && has_unlinked {
        return Conclusion::Failure;
    }

    Conclusion::Success
}

fn build_title(extraction: &ExtractionResult) -> String {
    let linked = extraction.linked.len();
    let unlinked = extraction.unlinked.len();

    if linked == 0 && unlinked == 0 {
        return NO_WORK_ITEMS_TITLE.to_string();
    }

    let title = format!("{linked} {} linked", work_items(linked));
    if unlinked > 0 {
        format!("{title} and {unlinked} {} unlinked", work_items(unlinked))
    } else {
        title
    }
}

fn build_summary(extraction: &ExtractionResult, policy: StrictnessPolicy) -> String {
    if extraction.is_empty() {
        return NO_REFERENCES_SUMMARY.to_string();
    }

    let mut parts = vec![
        format!("**Linked work items ({}):**", extraction.linked.len()),
        bullet_list(&extraction.linked),
        String::new(),
        format!("**Unlinked references ({}):**", extraction.unlinked.len()),
        bullet_list(&extraction.unlinked),
    ];

    if let Some(guidance) = guidance(extraction, policy) {
        parts.push(String::new());
        parts.push(guidance);
    }

    parts.join("\n")
}

fn guidance(extraction: &ExtractionResult, policy: StrictnessPolicy) -> Option<String> {
    if !extraction.has_unlinked() {
        return None;
    }

    let text = if !extraction.has_linked() {
        format!(
            "No work items linked yet. Validate the referenced work item numbers or verify the [Boards integration]({BOARDS_INTEGRATION_URL}) is working. Will revalidate once they are linked."
        )
    } else if policy.require_all_linked {
        format!(
            "**All work items must be linked.** Unlinked references may mean the [Boards integration]({BOARDS_INTEGRATION_URL}) has not linked them yet, is misconfigured, or the work item number is invalid."
        )
    } else {
        format!(
            "Review the unlinked references. Unlinked references may mean the [Boards integration]({BOARDS_INTEGRATION_URL}) has not linked them yet, is misconfigured, or the work item number is invalid."
        )
    };

    Some(text)
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return "- _None_".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn work_items(count: usize) -> &'static str {
    if count == 1 {
        "work item"
    } else {
        "work items"
    }
}
