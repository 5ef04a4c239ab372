//! Error types for docsync core.

use thiserror::Error;

/// Errors raised by the pure conflict-resolution primitives.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// A `merge` resolution was requested without merged content.
    #[error("merge resolution requires merged content")]
    MissingMergedContent,

    /// The resolution kind is not one of keep_local, keep_remote or merge.
    #[error("invalid resolution kind: {0}")]
    InvalidResolution(String),

    /// Both sides changed the same line differently.
    #[error("automatic merge failed for document {0}")]
    MergeConflict(String),

    /// Text still contains conflict markers where resolved content was expected.
    #[error("unresolved conflict markers remain in document {0}")]
    MarkersRemaining(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
