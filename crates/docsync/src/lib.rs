//! # docsync
//!
//! The unified API for docsync: keep text documents in step with a remote
//! store, edit them offline and settle conflicts explicitly.
//!
//! ## Overview
//!
//! docsync provides:
//!
//! - **Fingerprints**: content ETags that tell whether two sides agree
//! - **Debounced pushes**: bursts of edits become one push per document
//! - **Offline queue**: failed and offline pushes are retried, latest content wins
//! - **Conflicts**: rejected pushes surface both sides for keep local, keep
//!   remote, three-way merge or hand-edited markers
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docsync::{DocSync, DocumentId, SyncConfig, SyncStatus};
//! use docsync::remote::MemoryRemote;
//!
//! async fn example() {
//!     let docs = DocSync::new(MemoryRemote::new(), SyncConfig::default()).unwrap();
//!
//!     // Load from the remote, or start local if it does not exist yet
//!     let mut status = docs.open("notes/today.md").await.unwrap();
//!     let id: DocumentId = "notes/today.md".into();
//!
//!     docs.edit(&id, "# Today\n").unwrap();
//!     status.wait_for(SyncStatus::Pending).await;
//!
//!     if docs.status(&id).unwrap() == SyncStatus::Conflict {
//!         // Fall back to hand editing when the merge fails
//!         if docs.try_auto_merge(&id).is_err() {
//!             println!("{}", docs.conflict_markers(&id).unwrap());
//!         }
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `docsync::core` - Fingerprints, diff, merge and conflict markers
//! - `docsync::remote` - Remote client trait and in-memory remote
//! - `docsync::engine` - Sync engine, scheduler and offline queue

pub mod error;
pub mod session;

// Re-export component crates
pub use docsync_core as core;
pub use docsync_engine as engine;
pub use docsync_remote as remote;

// Re-export main types for convenience
pub use error::{DocSyncError, Result};
pub use session::DocSync;

pub use docsync_core::{
    ConflictInfo, DiffStats, Document, DocumentId, LineDiff, ResolutionKind, SyncState, SyncStatus,
};
pub use docsync_engine::{
    DrainReport, PushOutcome, RefreshOutcome, RetryPolicy, StatusSubscription, SyncConfig,
    SyncEngine, SyncEvent, SyncEventKind,
};
pub use docsync_remote::{RemoteClient, RemoteError, SyncOutcome};
