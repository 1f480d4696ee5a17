//! Work item reference extraction and verdicts for pull request descriptions.
//!
//! This crate provides:
//! - Extraction of Azure Boards references (`AB#123`) from Markdown text,
//!   split into linked (`[AB#123](https://.../_workitems/edit/123)`) and
//!   unlinked (bare `AB#123`) sets
//! - A verdict (conclusion, title, summary) derived from those sets under a
//!   [`StrictnessPolicy`]
//! - [`validate`], which combines both and skips PRs that are not open
//!
//! # Usage
//!
//! ```
//! use workitems::{validate, Conclusion, StrictnessPolicy};
//!
//! let body = "Implements feature.\n[AB#123](https://dev.azure.com/org/project/_workitems/edit/123)";
//! let outcome = validate(Some(body), Some("open"), StrictnessPolicy::lenient());
//!
//! assert_eq!(outcome.conclusion, Conclusion::Success);
//! assert_eq!(outcome.title, "1 work item linked");
//! ```
//!
//! Everything here is synchronous and free of side effects; the GitHub
//! plumbing lives in the `link-check` crate.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod extract;
pub mod validate;
pub mod verdict;

pub use extract::{extract_work_items, ExtractionResult, WorkItemReference};
pub use validate::{validate, ValidationOutcome, SKIPPED_SUMMARY};
pub use verdict::{decide, Conclusion, StrictnessPolicy, Verdict};
