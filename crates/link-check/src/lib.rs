//! GitHub check that requires PR descriptions to reference Azure Boards work items.
//!
//! This crate provides:
//! - Webhook payload parsing and signature verification
//! - Event filtering (handled actions, ignored actors)
//! - A GitHub REST client for pull requests and check runs
//! - Orchestration that validates a PR and posts the result as a check run
//! - HTTP server for webhook handling (standalone service)
//!
//! Extraction and verdict rules live in the [`workitems`] crate.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Async API methods can fail

pub mod checker;
pub mod config;
pub mod error;
pub mod github;
pub mod server;
pub mod webhooks;

pub use checker::{CheckOutcome, LinkChecker};
pub use config::Config;
pub use error::LinkCheckError;
pub use github::{ChecksApi, GitHubClient, RepoRef, CHECK_NAME};
pub use webhooks::{verify_webhook_signature, EventFilter, IgnoreReason, WebhookEvent};
