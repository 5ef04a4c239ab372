//! # docsync Testkit
//!
//! Testing utilities for docsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Cases**: Named merge and diff cases with expected outputs
//! - **Generators**: Proptest strategies for texts, edit scripts and merge scenarios
//! - **Fixtures**: An engine wired to a scriptable in-memory remote, with recorded events
//!
//! ## Cases
//!
//! ```rust
//! use docsync_core::three_way_merge;
//! use docsync_testkit::cases::merge_cases;
//!
//! for case in merge_cases() {
//!     let merged = three_way_merge(case.base, case.local, case.remote);
//!     assert_eq!(merged.as_deref(), case.expected, "{}", case.name);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use docsync_testkit::generators::DisjointEdits;
//!
//! proptest! {
//!     #[test]
//!     fn disjoint_edits_merge(edits: DisjointEdits) {
//!         let merged = three_way_merge(Some(&edits.base), &edits.local, &edits.remote);
//!         prop_assert_eq!(merged, Some(edits.expected));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use docsync_testkit::fixtures::EngineFixture;
//!
//! async fn example() {
//!     let fixture = EngineFixture::new();
//!     fixture.remote.put_remote("a", "hello");
//!     let status = fixture.open("a").await;
//! }
//! ```

pub mod cases;
pub mod fixtures;
pub mod generators;

pub use cases::{diff_cases, merge_cases, DiffCase, MergeCase};
pub use fixtures::{init_tracing, EngineFixture, EventRecorder};
pub use generators::{apply_edits, DisjointEdits, Edit};
