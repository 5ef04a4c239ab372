//! # docsync Core
//!
//! Pure primitives for docsync: sync state records, content fingerprints,
//! line diffs, three-way merge and conflict markers.
//!
//! This crate contains no I/O, no timers, no networking. Everything here is
//! deterministic computation over document text.
//!
//! ## Key Types
//!
//! - [`DocumentId`] - Opaque identifier of a synced document
//! - [`SyncStatus`] / [`SyncState`] - Per-document sync state record
//! - [`Document`] - A remote document as confirmed by the server
//! - [`ConflictInfo`] - Both sides of a rejected push
//!
//! ## Algorithms
//!
//! - [`fingerprint`] - Content ETag used for optimistic concurrency
//! - [`diff_lines`] - LCS line diff with per-side line numbers
//! - [`three_way_merge`] - All-or-nothing line merge against a common base
//! - [`generate_conflict_markers`] / [`parse_conflict_markers`] - Whole-document
//!   conflict blocks

pub mod conflict;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod merge;
pub mod types;

pub use conflict::{
    generate_conflict_markers, parse_conflict_markers, resolve_conflict, ConflictSection,
    ParsedConflict, ResolutionKind, SectionKind, LOCAL_MARKER, REMOTE_MARKER, SEPARATOR,
};
pub use diff::{
    apply_diff, diff_lines, diff_stats, split_lines, DiffKind, DiffLine, DiffStats, LineDiff,
    LineNumber,
};
pub use error::{CoreError, Result};
pub use fingerprint::{fingerprint, FINGERPRINT_LEN};
pub use merge::three_way_merge;
pub use types::{now_millis, ConflictInfo, Document, DocumentId, SyncState, SyncStatus};
