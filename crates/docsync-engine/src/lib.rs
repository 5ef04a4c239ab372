//! # docsync Engine
//!
//! Per-document synchronization engine: tracks the sync state of each open
//! document, decides when to push local edits to the remote, detects
//! conflicts and survives network interruption without losing edits.
//!
//! ## Overview
//!
//! ```text
//! notify_change ──> registry (pending) ──> push timer (debounce + interval)
//!                                               │
//!                                               v
//!                                     RemoteClient::sync_document
//!                                               │
//!               ┌───────────────────────────────┼───────────────────────┐
//!               v                               v                       v
//!            synced                    conflict + event          pending + queue
//!                                                                      │
//!                                  set_online(true) / retry delay ─> drain
//! ```
//!
//! ## Key Types
//!
//! - [`SyncEngine`] - The engine, generic over the remote client
//! - [`SyncConfig`] / [`RetryPolicy`] - Timings and retry behavior
//! - [`StatusSubscription`] - Observable status of one document
//! - [`SyncEvent`] - Published sync lifecycle events
//! - [`OfflineQueue`] - Pushes waiting for delivery
//!
//! ## Usage
//!
//! ```rust,no_run
//! use docsync_core::DocumentId;
//! use docsync_engine::{SyncConfig, SyncEngine};
//! use docsync_remote::MemoryRemote;
//!
//! async fn example() {
//!     let engine = SyncEngine::new(MemoryRemote::new(), SyncConfig::default()).unwrap();
//!     let id: DocumentId = "notes/today.md".into();
//!
//!     let mut status = engine.register("notes/today.md", "", None).unwrap();
//!     engine.notify_change(&id, "hello").unwrap();
//!
//!     // The push goes out once the debounce window and sync interval elapse.
//!     status.wait_for(docsync_core::SyncStatus::Synced).await;
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **No lost edits**: a failed or offline push is queued and retried
//! - **No concurrent pushes**: at most one push per document awaits the remote
//! - **Latest wins**: a newer edit replaces a queued one
//! - **Explicit conflicts**: a rejected push is never retried blindly

pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod status;

pub use config::{Backoff, RetryPolicy, SyncConfig};
pub use engine::{DrainReport, PushOutcome, RefreshOutcome, SyncEngine};
pub use error::{Result, SyncError};
pub use events::{EventBus, EventData, SubscriptionId, SyncEvent, SyncEventKind};
pub use queue::{OfflineQueue, RetryDecision, SyncQueueItem};
pub use registry::{DocumentEntry, Registry};
pub use scheduler::TimerTable;
pub use status::{StatusPublisher, StatusSubscription};
