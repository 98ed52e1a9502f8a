//! Error taxonomy for Intent Layer.

use intent_hosting::HostingError;
use serde::Serialize;

/// Coarse error class used for reporting and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Absent file, comment or ref. Expected; drives branching.
    NotFound,
    /// Symlink pair conflict or stale write. Never auto-resolved.
    Conflict,
    /// Unparseable marker or inconsistent proposal. Affects one item only.
    MalformedInput,
    /// Platform or model failure. Retry policy belongs to the caller.
    Upstream,
}

/// Intent Layer errors.
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict on {path}: {message}")]
    Conflict { path: String, message: String },

    #[error("symlink conflict: both intent files exist as independent files in {}", .directories.join(", "))]
    SymlinkConflict { directories: Vec<String> },

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl IntentError {
    pub fn conflict(path: impl Into<String>, message: impl Into<String>) -> Self {
        IntentError::Conflict {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Map this error onto the four-way reporting taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            IntentError::NotFound(_) => ErrorClass::NotFound,
            IntentError::Conflict { .. } | IntentError::SymlinkConflict { .. } => {
                ErrorClass::Conflict
            }
            IntentError::MalformedInput(_) | IntentError::Config(_) => ErrorClass::MalformedInput,
            IntentError::Upstream(_) | IntentError::Io(_) => ErrorClass::Upstream,
        }
    }

    /// Whether a later delivery of the same event may succeed.
    ///
    /// Stale writes are retryable: the next attempt reads fresh SHAs.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IntentError::Conflict { .. } | IntentError::Upstream(_) | IntentError::Io(_)
        )
    }

    /// Prefix the message with the node path and action being attempted.
    pub fn context(self, action: &str, path: &str) -> Self {
        match self {
            IntentError::NotFound(msg) => IntentError::NotFound(format!("{action} {path}: {msg}")),
            IntentError::MalformedInput(msg) => {
                IntentError::MalformedInput(format!("{action} {path}: {msg}"))
            }
            IntentError::Upstream(msg) => IntentError::Upstream(format!("{action} {path}: {msg}")),
            IntentError::Conflict {
                path: conflict_path,
                message,
            } => IntentError::Conflict {
                path: conflict_path,
                message: format!("{action} {path}: {message}"),
            },
            other => other,
        }
    }
}

impl From<HostingError> for IntentError {
    fn from(err: HostingError) -> Self {
        match err {
            HostingError::NotFound { resource } => IntentError::NotFound(resource),
            HostingError::Conflict { resource, message } => IntentError::Conflict {
                path: resource,
                message,
            },
            HostingError::Config(msg) => IntentError::Config(msg),
            other => IntentError::Upstream(other.to_string()),
        }
    }
}

/// Result type for Intent Layer operations.
pub type IntentResult<T> = std::result::Result<T, IntentError>;
