//! Error types for the link check service.

use thiserror::Error;

/// Errors raised while handling a webhook delivery.
#[derive(Debug, Error)]
pub enum LinkCheckError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// GitHub answered with a non-success status
    #[error("GitHub API error: {status} - {body}")]
    GitHub { status: u16, body: String },

    /// Payload could not be decoded
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// A field required to process the event is missing
    #[error("Missing field in webhook payload: {0}")]
    MissingField(&'static str),

    /// Configuration is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl LinkCheckError {
    /// Whether the error was caused by the delivery itself rather than by GitHub.
    #[must_use]
    pub const fn is_bad_request(&self) -> bool {
        matches!(self, Self::Payload(_) | Self::MissingField(_))
    }
}
