//! In-memory implementation of the RemoteClient trait.
//!
//! Behaves like a real server with respect to ETags, and is scriptable for
//! tests: failures can be injected, calls carry artificial latency, the
//! remote copy can be edited behind the client's back, and every call is
//! recorded.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use docsync_core::{fingerprint, now_millis, Document, DocumentId};

use crate::error::{RemoteError, Result};
use crate::traits::{RemoteClient, SyncOutcome};

/// A recorded `sync_document` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncCall {
    pub document_id: DocumentId,
    pub content: String,
    pub etag: String,
}

/// A recorded remote invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Get(DocumentId),
    Save(DocumentId),
    Sync(SyncCall),
}

/// In-memory remote store.
///
/// All data is lost when the remote is dropped.
pub struct MemoryRemote {
    inner: Mutex<MemoryRemoteInner>,
}

struct MemoryRemoteInner {
    docs: HashMap<DocumentId, Document>,
    available: bool,
    /// Number of upcoming calls that fail with a server error.
    fail_next: u32,
    latency: Option<Duration>,
    calls: Vec<RemoteCall>,
    in_flight_syncs: usize,
    peak_syncs: usize,
}

impl MemoryRemote {
    /// Create an empty, reachable remote.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MemoryRemoteInner {
                docs: HashMap::new(),
                available: true,
                fail_next: 0,
                latency: None,
                calls: Vec::new(),
                in_flight_syncs: 0,
                peak_syncs: 0,
            }),
        }
    }

    /// Delay every call by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.inner.lock().latency = Some(latency);
        self
    }

    /// Change the artificial latency of subsequent calls.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.inner.lock().latency = latency;
    }

    /// Make the remote reachable or unreachable.
    pub fn set_available(&self, available: bool) {
        self.inner.lock().available = available;
    }

    /// Fail the next `count` calls with a 503.
    pub fn fail_next(&self, count: u32) {
        self.inner.lock().fail_next = count;
    }

    /// Store content as if another client wrote it.
    pub fn put_remote(&self, id: impl Into<DocumentId>, content: &str) -> Document {
        let id = id.into();
        let doc = Document {
            id: id.clone(),
            content: content.to_string(),
            etag: fingerprint(content),
            updated_at: now_millis(),
        };
        self.inner.lock().docs.insert(id, doc.clone());
        doc
    }

    /// Current remote copy of a document.
    pub fn document(&self, id: &DocumentId) -> Option<Document> {
        self.inner.lock().docs.get(id).cloned()
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.inner.lock().calls.clone()
    }

    /// Every `sync_document` call received so far, in order.
    pub fn sync_calls(&self) -> Vec<SyncCall> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                RemoteCall::Sync(sync) => Some(sync.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `sync_document` calls received so far.
    pub fn sync_call_count(&self) -> usize {
        self.sync_calls().len()
    }

    /// Highest number of `sync_document` calls that were in progress at once.
    pub fn peak_concurrent_syncs(&self) -> usize {
        self.inner.lock().peak_syncs
    }

    fn record(&self, call: RemoteCall) -> Option<Duration> {
        let mut inner = self.inner.lock();
        inner.calls.push(call);
        inner.latency
    }

    async fn delay(latency: Option<Duration>) {
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemoteInner {
    fn check_failure(&mut self) -> Result<()> {
        if !self.available {
            return Err(RemoteError::Unavailable);
        }
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(RemoteError::Server {
                status: 503,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn store(&mut self, id: &DocumentId, content: &str) -> Document {
        let doc = Document {
            id: id.clone(),
            content: content.to_string(),
            etag: fingerprint(content),
            updated_at: now_millis(),
        };
        self.docs.insert(id.clone(), doc.clone());
        doc
    }
}

#[async_trait]
impl RemoteClient for MemoryRemote {
    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        let latency = self.record(RemoteCall::Get(id.clone()));
        Self::delay(latency).await;

        let mut inner = self.inner.lock();
        inner.check_failure()?;
        Ok(inner.docs.get(id).cloned())
    }

    async fn save_document(&self, doc: Document) -> Result<Document> {
        let latency = self.record(RemoteCall::Save(doc.id.clone()));
        Self::delay(latency).await;

        let mut inner = self.inner.lock();
        inner.check_failure()?;
        Ok(inner.store(&doc.id, &doc.content))
    }

    async fn sync_document(
        &self,
        id: &DocumentId,
        content: &str,
        etag: &str,
    ) -> Result<SyncOutcome> {
        let latency = {
            let mut inner = self.inner.lock();
            inner.calls.push(RemoteCall::Sync(SyncCall {
                document_id: id.clone(),
                content: content.to_string(),
                etag: etag.to_string(),
            }));
            inner.in_flight_syncs += 1;
            inner.peak_syncs = inner.peak_syncs.max(inner.in_flight_syncs);
            inner.latency
        };
        Self::delay(latency).await;

        let mut inner = self.inner.lock();
        inner.in_flight_syncs -= 1;
        inner.check_failure()?;

        let outcome = match inner.docs.get(id) {
            Some(existing) if existing.etag != etag && existing.content != content => {
                debug!(document_id = %id, server_etag = %existing.etag, "stale etag");
                SyncOutcome::Conflict {
                    server_content: existing.content.clone(),
                    server_etag: existing.etag.clone(),
                }
            }
            _ => SyncOutcome::Accepted(inner.store(id, content)),
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_push_creates_document() {
        let remote = MemoryRemote::new();
        let id = DocumentId::from("doc");

        let outcome = remote.sync_document(&id, "hello", "").await.unwrap();
        match outcome {
            SyncOutcome::Accepted(doc) => {
                assert_eq!(doc.content, "hello");
                assert_eq!(doc.etag, fingerprint("hello"));
            }
            other => panic!("expected accepted, got {:?}", other),
        }
        assert_eq!(remote.document(&id).unwrap().content, "hello");
    }

    #[tokio::test]
    async fn test_stale_etag_conflicts() {
        let remote = MemoryRemote::new();
        let id = DocumentId::from("doc");
        let base = remote.put_remote("doc", "base");
        remote.put_remote("doc", "X");

        let outcome = remote.sync_document(&id, "mine", &base.etag).await.unwrap();
        assert_eq!(
            outcome,
            SyncOutcome::Conflict {
                server_content: "X".into(),
                server_etag: fingerprint("X"),
            }
        );
        assert_eq!(remote.document(&id).unwrap().content, "X");
    }

    #[tokio::test]
    async fn test_identical_content_is_idempotent() {
        let remote = MemoryRemote::new();
        let id = DocumentId::from("doc");
        remote.put_remote("doc", "same");

        let outcome = remote.sync_document(&id, "same", "stale").await.unwrap();
        assert!(outcome.is_accepted());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let remote = MemoryRemote::new();
        let id = DocumentId::from("doc");

        remote.fail_next(1);
        let err = remote.sync_document(&id, "a", "").await.unwrap_err();
        assert!(matches!(err, RemoteError::Server { status: 503, .. }));
        assert!(remote.sync_document(&id, "a", "").await.is_ok());

        remote.set_available(false);
        assert_eq!(remote.get_document(&id).await.unwrap_err(), RemoteError::Unavailable);
        assert_eq!(remote.sync_call_count(), 2);
        assert_eq!(remote.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_save_assigns_etag() {
        let remote = MemoryRemote::new();
        let saved = remote
            .save_document(Document {
                id: "doc".into(),
                content: "body".into(),
                etag: String::new(),
                updated_at: 0,
            })
            .await
            .unwrap();
        assert_eq!(saved.etag, fingerprint("body"));
        assert!(saved.updated_at > 0);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_peak_concurrency_tracks_overlap() {
        let remote = Arc::new(MemoryRemote::new().with_latency(Duration::from_millis(100)));

        let a = {
            let remote = remote.clone();
            tokio::spawn(async move { remote.sync_document(&"a".into(), "1", "").await })
        };
        let b = {
            let remote = remote.clone();
            tokio::spawn(async move { remote.sync_document(&"b".into(), "2", "").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        assert_eq!(remote.peak_concurrent_syncs(), 2);
    }
}
