//! RemoteClient trait: the abstract interface to the remote document store.
//!
//! The engine only ever talks to the remote through this trait. Transport,
//! authentication and persistence live behind it.

use std::sync::Arc;

use async_trait::async_trait;
use docsync_core::{Document, DocumentId};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Result of pushing local content to the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// The remote stored the content.
    Accepted(Document),
    /// The remote moved on since the ETag the push was based on.
    Conflict {
        /// Content currently stored on the remote.
        server_content: String,
        /// Fingerprint of `server_content`.
        server_etag: String,
    },
}

impl SyncOutcome {
    /// True when the push was stored.
    pub fn is_accepted(&self) -> bool {
        matches!(self, SyncOutcome::Accepted(_))
    }
}

/// Async interface to the remote document store.
///
/// # Design Notes
///
/// - **Optimistic concurrency**: `sync_document` carries the ETag the local
///   content was based on. An empty ETag means no remote version is known.
/// - **Conflict is a value**: a stale ETag yields [`SyncOutcome::Conflict`],
///   errors are reserved for failed calls.
/// - **No timeouts**: the engine imposes none; an implementation that wants
///   one reports expiry as an error.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// Fetch the current remote version of a document.
    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>>;

    /// Store a document unconditionally and return the stored version.
    ///
    /// The remote assigns `etag` and `updated_at`; the values passed in are
    /// ignored.
    async fn save_document(&self, doc: Document) -> Result<Document>;

    /// Push local content based on `etag`.
    async fn sync_document(&self, id: &DocumentId, content: &str, etag: &str)
        -> Result<SyncOutcome>;
}

#[async_trait]
impl<T: RemoteClient + ?Sized> RemoteClient for Arc<T> {
    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        (**self).get_document(id).await
    }

    async fn save_document(&self, doc: Document) -> Result<Document> {
        (**self).save_document(doc).await
    }

    async fn sync_document(
        &self,
        id: &DocumentId,
        content: &str,
        etag: &str,
    ) -> Result<SyncOutcome> {
        (**self).sync_document(id, content, etag).await
    }
}
