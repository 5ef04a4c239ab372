//! Error types for the sync engine.

use docsync_core::{CoreError, DocumentId, SyncStatus};
use docsync_remote::RemoteError;
use thiserror::Error;

/// Errors that can occur during engine operations.
///
/// Conflicts and failed background pushes are not reported here. They are
/// recorded on the document's state and published as events.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The document is not registered.
    #[error("document not registered: {0}")]
    DocumentNotFound(DocumentId),

    /// The document is already registered.
    #[error("document already registered: {0}")]
    AlreadyRegistered(DocumentId),

    /// The state machine does not allow the requested transition.
    #[error("invalid transition for {document_id}: {from} -> {to}")]
    InvalidTransition {
        document_id: DocumentId,
        from: SyncStatus,
        to: SyncStatus,
    },

    /// A resolution was requested for a document that has no conflict.
    #[error("no conflict recorded for {0}")]
    NoConflict(DocumentId),

    /// The operation needs connectivity.
    #[error("engine is offline")]
    Offline,

    /// Configuration rejected by validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A direct remote call failed.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Conflict resolution failed.
    #[error("resolution error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SyncError>;
