//! Error types for the remote boundary.

use thiserror::Error;

/// Errors a remote call can fail with.
///
/// A rejected push because of a stale ETag is not an error; see
/// [`SyncOutcome::Conflict`](crate::SyncOutcome::Conflict).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote could not be reached.
    #[error("remote unavailable")]
    Unavailable,

    /// The remote answered with an error status.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The requested document does not exist on the remote.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The remote refused the request outright.
    #[error("request rejected: {0}")]
    Rejected(String),
}

impl RemoteError {
    /// Whether repeating the same request later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            RemoteError::Unavailable => true,
            RemoteError::Server { status, .. } => *status >= 500 || *status == 429,
            RemoteError::NotFound(_) | RemoteError::Rejected(_) => false,
        }
    }
}

/// Result type for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
