//! Error types for intent-hosting

use thiserror::Error;

/// Errors returned by a [`crate::HostingClient`].
///
/// The variants mirror how the platform answers, not how callers react:
/// `NotFound` is an expected answer that drives create-vs-update branching,
/// `Conflict` is a rejected conditional write (stale SHA, file already present).
#[derive(Error, Debug)]
pub enum HostingError {
    /// File, comment, commit or ref is absent
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Conditional write rejected by the platform
    #[error("write rejected for {resource}: {message}")]
    Conflict { resource: String, message: String },

    /// Any other non-success response
    #[error("upstream request failed with status {status}: {message}")]
    Upstream { status: u16, message: String },

    /// Transport-level failure (connect, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body could not be decoded
    #[error("Deserialization failed: {0}")]
    Decode(String),

    /// Client configuration is incomplete
    #[error("configuration error: {0}")]
    Config(String),
}

impl HostingError {
    pub fn not_found(resource: impl Into<String>) -> Self {
        HostingError::NotFound {
            resource: resource.into(),
        }
    }

    pub fn conflict(resource: impl Into<String>, message: impl Into<String>) -> Self {
        HostingError::Conflict {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// True for the 404-class answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, HostingError::NotFound { .. })
    }
}

impl From<reqwest::Error> for HostingError {
    fn from(err: reqwest::Error) -> Self {
        HostingError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for HostingError {
    fn from(err: serde_json::Error) -> Self {
        HostingError::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for HostingError {
    fn from(err: base64::DecodeError) -> Self {
        HostingError::Decode(format!("invalid base64 content: {err}"))
    }
}
