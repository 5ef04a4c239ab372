//! Error types for the docsync facade.

use docsync_core::CoreError;
use docsync_engine::SyncError;
use docsync_remote::RemoteError;
use thiserror::Error;

/// Errors that can occur during docsync operations.
#[derive(Debug, Error)]
pub enum DocSyncError {
    /// Engine error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Remote error.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Diff, merge or resolution error.
    #[error("conflict error: {0}")]
    Core(#[from] CoreError),
}

impl DocSyncError {
    /// True if the error came from a failed automatic merge.
    pub fn is_merge_conflict(&self) -> bool {
        matches!(
            self,
            DocSyncError::Core(CoreError::MergeConflict(_))
                | DocSyncError::Sync(SyncError::Core(CoreError::MergeConflict(_)))
        )
    }
}

/// Result type for docsync operations.
pub type Result<T> = std::result::Result<T, DocSyncError>;
