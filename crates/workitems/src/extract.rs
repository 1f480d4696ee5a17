//! Work item reference extraction.
//!
//! Two lexical forms are recognised:
//!
//! - linked: `[AB#123](https://dev.azure.com/org/project/_workitems/edit/123)`
//! - unlinked: a bare `AB#123` anywhere else in the text
//!
//! Linked references are matched first and their spans are removed from the
//! text before the unlinked scan runs, so the label of a linked reference is
//! never counted twice. A link whose URL does not have the work item shape is
//! left in place and its label falls through to the unlinked scan.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Markdown link to an Azure Boards work item.
///
/// Matches `[AB#123](https://{host}/{org}/{project}/_workitems/edit/123)` and
/// `[AB#123](https://{host}/{project}/_workitems/edit/123)`; the project may be
/// a name or a GUID. At least one path segment must sit between the host and
/// `_workitems`. Digits are ASCII only.
pub static LINKED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[AB#([0-9]+)\]\((https?://[^/]+(?:/[^/]+)+/_workitems/edit/[0-9]+)\)")
        .expect("linked work item pattern must compile")
});

/// Bare work item mention, e.g. `AB#123` or `ab#123`.
pub static UNLINKED_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)AB#([0-9]+)").expect("unlinked work item pattern must compile")
});

/// A single work item reference found in a description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum WorkItemReference {
    /// Markdown link whose target is a work item URL.
    Linked {
        /// Identifier taken from the link label.
        id: String,
        /// The full link exactly as it appeared in the source.
        rendered: String,
    },
    /// Bare `AB#<id>` mention.
    Unlinked {
        /// Identifier digits.
        id: String,
    },
}

impl WorkItemReference {
    /// Identifier digits, compared as text.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Linked { id, .. } | Self::Unlinked { id } => id,
        }
    }

    /// Display form used in reports.
    ///
    /// Linked references keep their source text; unlinked references are
    /// normalised to an upper-case `AB#` prefix.
    #[must_use]
    pub fn rendered(&self) -> String {
        match self {
            Self::Linked { rendered, .. } => rendered.clone(),
            Self::Unlinked { id } => format!("AB#{id}"),
        }
    }

    #[must_use]
    pub const fn is_linked(&self) -> bool {
        matches!(self, Self::Linked { .. })
    }
}

/// Linked and unlinked references of one description.
///
/// Both sequences are duplicate-free and ordered by first occurrence. No
/// identifier that appears in `linked` is ever listed in `unlinked`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Rendered linked references, e.g. `[AB#1](https://.../_workitems/edit/1)`.
    pub linked: Vec<String>,
    /// Rendered unlinked references, e.g. `AB#2`.
    pub unlinked: Vec<String>,
}

impl ExtractionResult {
    #[must_use]
    pub fn has_linked(&self) -> bool {
        !self.linked.is_empty()
    }

    #[must_use]
    pub fn has_unlinked(&self) -> bool {
        !self.unlinked.is_empty()
    }

    /// True when the description referenced no work items at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.linked.is_empty() && self.unlinked.is_empty()
    }
}

impl FromIterator<WorkItemReference> for ExtractionResult {
    fn from_iter<I: IntoIterator<Item = WorkItemReference>>(iter: I) -> Self {
        let mut result = Self::default();
        let mut seen_linked = HashSet::new();
        let mut seen_unlinked = HashSet::new();

        for reference in iter {
            let rendered = reference.rendered();
            if reference.is_linked() {
                push_unique(&mut result.linked, &mut seen_linked, rendered);
            } else {
                push_unique(&mut result.unlinked, &mut seen_unlinked, rendered);
            }
        }

        result
    }
}

/// Scan `text` for work item references.
///
/// Linked references come first in source order, followed by the unlinked
/// mentions that survive precedence. Duplicates are kept; collect into an
/// [`ExtractionResult`] to deduplicate.
#[must_use]
pub fn scan_references(text: &str) -> Vec<WorkItemReference> {
    let mut references = Vec::new();
    let mut linked_ids = HashSet::new();

    for caps in LINKED_PATTERN.captures_iter(text) {
        let (Some(whole), Some(id)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        linked_ids.insert(id.as_str().to_string());
        references.push(WorkItemReference::Linked {
            id: id.as_str().to_string(),
            rendered: whole.as_str().to_string(),
        });
    }

    let remainder = LINKED_PATTERN.replace_all(text, "");
    for caps in UNLINKED_PATTERN.captures_iter(&remainder) {
        let Some(id) = caps.get(1) else {
            continue;
        };
        if linked_ids.contains(id.as_str()) {
            trace!(id = id.as_str(), "Bare mention already linked");
            continue;
        }
        references.push(WorkItemReference::Unlinked {
            id: id.as_str().to_string(),
        });
    }

    references
}

/// Extract the deduplicated linked and unlinked references from `text`.
///
/// Never fails: text without references yields an empty result.
#[must_use]
pub fn extract_work_items(text: &str) -> ExtractionResult {
    scan_references(text).into_iter().collect()
}

fn push_unique(items: &mut Vec<String>, seen: &mut HashSet<String>, value: String) {
    if seen.insert(value.clone()) {
        items.push(value);
    }
}
