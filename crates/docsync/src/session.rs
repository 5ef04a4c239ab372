//! DocSync: the document-level API.
//!
//! Wraps a [`SyncEngine`] with the operations an editor needs: open a
//! document from the remote, feed it edits, and settle conflicts by choice,
//! by automatic merge or by hand-edited conflict markers.

use docsync_core::{
    diff_lines, generate_conflict_markers, parse_conflict_markers, three_way_merge, ConflictInfo,
    CoreError, DiffStats, DocumentId, LineDiff, ResolutionKind, SyncState, SyncStatus,
};
use docsync_engine::{
    DrainReport, PushOutcome, RefreshOutcome, StatusSubscription, SyncConfig, SyncEngine,
    SyncError,
};
use docsync_remote::RemoteClient;
use tracing::{debug, info};

use crate::error::Result;

/// Document sync session over one remote.
pub struct DocSync<C> {
    engine: SyncEngine<C>,
}

impl<C> Clone for DocSync<C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
        }
    }
}

impl<C: RemoteClient + 'static> DocSync<C> {
    /// Create a session with its own engine.
    pub fn new(remote: C, config: SyncConfig) -> Result<Self> {
        Ok(Self {
            engine: SyncEngine::new(remote, config)?,
        })
    }

    /// Wrap an existing engine.
    pub fn from_engine(engine: SyncEngine<C>) -> Self {
        Self { engine }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &SyncEngine<C> {
        &self.engine
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Document lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Open a document, loading it from the remote.
    ///
    /// A document the remote does not know is opened empty and `local`.
    pub async fn open(&self, id: impl Into<DocumentId>) -> Result<StatusSubscription> {
        let id = id.into();
        if !self.engine.is_online() {
            return Err(SyncError::Offline.into());
        }
        if self.engine.is_registered(&id) {
            return Err(SyncError::AlreadyRegistered(id).into());
        }

        let subscription = match self.engine.remote().get_document(&id).await? {
            Some(doc) => {
                debug!(document_id = %id, etag = %doc.etag, "opened from remote");
                self.engine.register(id, doc.content, Some(doc.etag))?
            }
            None => {
                debug!(document_id = %id, "not on remote, opened local");
                self.engine.register(id, String::new(), None)?
            }
        };
        Ok(subscription)
    }

    /// Open a document that exists only on this side.
    pub fn open_local(
        &self,
        id: impl Into<DocumentId>,
        content: impl Into<String>,
    ) -> Result<StatusSubscription> {
        Ok(self.engine.register(id, content, None)?)
    }

    /// Create the remote copy of a `local` document.
    pub async fn publish(&self, id: &DocumentId) -> Result<()> {
        self.engine.enable_cloud_sync(id).await?;
        Ok(())
    }

    /// Stop tracking a document and return its final state.
    pub fn close(&self, id: &DocumentId) -> Result<SyncState> {
        Ok(self.engine.unregister(id)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace the content of a document. The push is debounced.
    pub fn edit(&self, id: &DocumentId, content: impl Into<String>) -> Result<()> {
        Ok(self.engine.notify_change(id, content)?)
    }

    /// Push the current content now.
    pub async fn save_now(&self, id: &DocumentId) -> Result<PushOutcome> {
        let content = self.engine.content(id)?;
        Ok(self.engine.force_sync_now(id, content).await?)
    }

    /// Pull remote changes into a document without local edits.
    pub async fn refresh(&self, id: &DocumentId) -> Result<RefreshOutcome> {
        Ok(self.engine.refresh_from_remote(id).await?)
    }

    pub async fn set_online(&self, online: bool) -> DrainReport {
        self.engine.set_online(online).await
    }

    pub fn status(&self, id: &DocumentId) -> Result<SyncStatus> {
        Ok(self.engine.state(id)?.status)
    }

    pub fn content(&self, id: &DocumentId) -> Result<String> {
        Ok(self.engine.content(id)?)
    }

    /// Lines added and removed since the last synced content.
    pub fn change_summary(&self, id: &DocumentId) -> Result<DiffStats> {
        Ok(self.engine.pending_summary(id)?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conflicts
    // ─────────────────────────────────────────────────────────────────────────

    /// Settle a conflict by choosing a side or supplying merged content.
    pub fn resolve(
        &self,
        id: &DocumentId,
        kind: ResolutionKind,
        merged: Option<&str>,
    ) -> Result<String> {
        Ok(self.engine.resolve_conflict(id, kind, merged)?)
    }

    /// Try to settle a conflict with a line-based three-way merge.
    ///
    /// On success the merged content is applied as a `merge` resolution.
    /// When both sides changed the same line the conflict stays and
    /// [`CoreError::MergeConflict`] is returned.
    pub fn try_auto_merge(&self, id: &DocumentId) -> Result<String> {
        let info = self.conflict_info(id)?;
        let merged = three_way_merge(
            info.base_content.as_deref(),
            &info.local_content,
            &info.remote_content,
        )
        .ok_or_else(|| CoreError::MergeConflict(id.to_string()))?;

        info!(document_id = %id, "conflict auto-merged");
        self.resolve(id, ResolutionKind::Merge, Some(&merged))
    }

    /// The conflict rendered with `<<<<<<< LOCAL` markers for hand editing.
    pub fn conflict_markers(&self, id: &DocumentId) -> Result<String> {
        Ok(generate_conflict_markers(&self.conflict_info(id)?))
    }

    /// Line diff from the local side of a conflict to the remote side.
    pub fn conflict_diff(&self, id: &DocumentId) -> Result<LineDiff> {
        let info = self.conflict_info(id)?;
        Ok(diff_lines(&info.local_content, &info.remote_content))
    }

    /// Settle a conflict with hand-edited text.
    ///
    /// The text must no longer contain conflict markers.
    pub fn resolve_from_markers(&self, id: &DocumentId, text: &str) -> Result<String> {
        self.conflict_info(id)?;
        if parse_conflict_markers(text).has_markers {
            return Err(CoreError::MarkersRemaining(id.to_string()).into());
        }
        self.resolve(id, ResolutionKind::Merge, Some(text))
    }

    fn conflict_info(&self, id: &DocumentId) -> Result<ConflictInfo> {
        self.engine
            .conflict(id)?
            .ok_or_else(|| SyncError::NoConflict(id.clone()).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsync_remote::MemoryRemote;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::error::DocSyncError;

    fn session() -> (DocSync<Arc<MemoryRemote>>, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        let config = SyncConfig::default().with_auto_sync(false);
        (DocSync::new(remote.clone(), config).unwrap(), remote)
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_open_existing_document_is_synced() {
        let (docs, remote) = session();
        remote.put_remote("a", "hello\n");

        let status = docs.open("a").await.unwrap();
        assert_eq!(status.current(), SyncStatus::Synced);
        assert_eq!(docs.content(&"a".into()).unwrap(), "hello\n");
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_open_unknown_document_is_local() {
        let (docs, _) = session();
        let status = docs.open("new").await.unwrap();
        assert_eq!(status.current(), SyncStatus::Local);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_open_twice_rejected() {
        let (docs, _) = session();
        docs.open("a").await.unwrap();
        assert!(matches!(
            docs.open("a").await,
            Err(DocSyncError::Sync(SyncError::AlreadyRegistered(_)))
        ));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_open_offline_rejected() {
        let (docs, _) = session();
        docs.set_online(false).await;
        assert!(matches!(
            docs.open("a").await,
            Err(DocSyncError::Sync(SyncError::Offline))
        ));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_save_now_pushes_current_content() {
        let (docs, remote) = session();
        remote.put_remote("a", "v1");
        docs.open("a").await.unwrap();
        let id = DocumentId::from("a");

        docs.edit(&id, "v2").unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(remote.sync_call_count(), 0);

        assert_eq!(docs.save_now(&id).await.unwrap(), PushOutcome::Synced);
        assert_eq!(remote.document(&id).unwrap().content, "v2");
        assert_eq!(docs.status(&id).unwrap(), SyncStatus::Synced);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_conflict_helpers_require_conflict() {
        let (docs, _) = session();
        docs.open_local("a", "x").unwrap();
        let id = DocumentId::from("a");

        assert!(matches!(
            docs.conflict_markers(&id),
            Err(DocSyncError::Sync(SyncError::NoConflict(_)))
        ));
        assert!(matches!(
            docs.try_auto_merge(&id),
            Err(DocSyncError::Sync(SyncError::NoConflict(_)))
        ));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_auto_merge_disjoint_edits() {
        let (docs, remote) = session();
        remote.put_remote("a", "one\ntwo\nthree");
        docs.open("a").await.unwrap();
        let id = DocumentId::from("a");

        remote.put_remote("a", "one\ntwo\nTHREE");
        docs.edit(&id, "ONE\ntwo\nthree").unwrap();
        assert_eq!(docs.save_now(&id).await.unwrap(), PushOutcome::Conflict);

        let merged = docs.try_auto_merge(&id).unwrap();
        assert_eq!(merged, "ONE\ntwo\nTHREE");
        assert_eq!(docs.status(&id).unwrap(), SyncStatus::Pending);

        assert_eq!(docs.save_now(&id).await.unwrap(), PushOutcome::Synced);
        assert_eq!(remote.document(&id).unwrap().content, "ONE\ntwo\nTHREE");
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_auto_merge_overlapping_edits_keeps_conflict() {
        let (docs, remote) = session();
        remote.put_remote("a", "line");
        docs.open("a").await.unwrap();
        let id = DocumentId::from("a");

        remote.put_remote("a", "theirs");
        docs.edit(&id, "mine").unwrap();
        docs.save_now(&id).await.unwrap();

        let err = docs.try_auto_merge(&id).unwrap_err();
        assert!(err.is_merge_conflict());
        assert_eq!(docs.status(&id).unwrap(), SyncStatus::Conflict);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_resolve_from_markers() {
        let (docs, remote) = session();
        remote.put_remote("a", "line");
        docs.open("a").await.unwrap();
        let id = DocumentId::from("a");

        remote.put_remote("a", "theirs");
        docs.edit(&id, "mine").unwrap();
        docs.save_now(&id).await.unwrap();

        let markers = docs.conflict_markers(&id).unwrap();
        assert_eq!(markers, "<<<<<<< LOCAL\nmine\n=======\ntheirs\n>>>>>>> REMOTE");

        let err = docs.resolve_from_markers(&id, &markers).unwrap_err();
        assert!(matches!(err, DocSyncError::Core(CoreError::MarkersRemaining(_))));

        let resolved = docs.resolve_from_markers(&id, "mine and theirs").unwrap();
        assert_eq!(resolved, "mine and theirs");
        assert_eq!(docs.content(&id).unwrap(), "mine and theirs");
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_conflict_diff() {
        let (docs, remote) = session();
        remote.put_remote("a", "a\nb");
        docs.open("a").await.unwrap();
        let id = DocumentId::from("a");

        remote.put_remote("a", "a\nc");
        docs.edit(&id, "a\nd").unwrap();
        docs.save_now(&id).await.unwrap();

        let stats = docs.conflict_diff(&id).unwrap().stats();
        assert_eq!((stats.additions, stats.deletions), (1, 1));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_change_summary() {
        let (docs, remote) = session();
        remote.put_remote("a", "a\nb");
        docs.open("a").await.unwrap();
        let id = DocumentId::from("a");

        docs.edit(&id, "a\nb\nc").unwrap();
        let stats = docs.change_summary(&id).unwrap();
        assert_eq!((stats.additions, stats.deletions), (1, 0));
        assert!(stats.has_changes);
    }
}
