//! # docsync Remote
//!
//! The boundary between the sync engine and the remote document store.
//!
//! ## Overview
//!
//! The engine is transport-agnostic: it talks to the remote through the
//! [`RemoteClient`] trait. HTTP or WebSocket clients implement it outside
//! this workspace. [`MemoryRemote`] is a faithful in-memory implementation
//! used by tests and demos.
//!
//! ## Key Types
//!
//! - [`RemoteClient`] - Async trait with `get_document`, `save_document`
//!   and `sync_document`
//! - [`SyncOutcome`] - Accepted or conflicting push
//! - [`MemoryRemote`] - Scriptable in-memory remote
//! - [`RemoteError`] - Failed remote call
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docsync_remote::{MemoryRemote, RemoteClient, SyncOutcome};
//!
//! async fn example() {
//!     let remote = MemoryRemote::new();
//!     let id = "notes/today.md".into();
//!
//!     // First push: no ETag known yet
//!     match remote.sync_document(&id, "hello", "").await.unwrap() {
//!         SyncOutcome::Accepted(doc) => println!("stored as {}", doc.etag),
//!         SyncOutcome::Conflict { server_content, .. } => {
//!             println!("remote has {}", server_content)
//!         }
//!     }
//! }
//! ```

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{RemoteError, Result};
pub use memory::{MemoryRemote, RemoteCall, SyncCall};
pub use traits::{RemoteClient, SyncOutcome};
