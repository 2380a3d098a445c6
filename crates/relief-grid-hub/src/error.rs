//! Error types for the message hub.

use thiserror::Error;

/// A result type using `HubError`.
pub type Result<T> = std::result::Result<T, HubError>;

/// Errors that can occur while publishing or reading room messages.
#[derive(Debug, Error)]
pub enum HubError {
    /// Publish was called with empty (or whitespace-only) content.
    #[error("message content is empty")]
    EmptyMessage,

    /// The durable store could not record the message in time. Nothing was
    /// delivered; safe to retry with backoff.
    #[error("persistence failed: {0}")]
    Persistence(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::Internal(_))
    }
}
