//! Sync state registry.
//!
//! Owns one [`DocumentEntry`] per registered document. Status changes go
//! through [`DocumentEntry::set_status`], which enforces the state machine
//! and publishes the new value to status subscribers.

use std::collections::HashMap;

use docsync_core::{fingerprint, now_millis, ConflictInfo, DocumentId, SyncState, SyncStatus};
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::status::{StatusPublisher, StatusSubscription};

/// Everything the engine tracks about one document.
#[derive(Debug)]
pub struct DocumentEntry {
    pub state: SyncState,
    /// Current local content.
    pub content: String,
    /// Last content both sides agreed on.
    pub base_content: Option<String>,
    /// Distinguishes this registration from earlier ones of the same ID.
    pub instance: u64,
    /// Bumped on every local edit.
    pub generation: u64,
    /// A push for this document is awaiting the remote.
    pub in_flight: bool,
    /// A push was requested while another was in flight.
    pub follow_up: bool,
    pub conflict: Option<ConflictInfo>,
    publisher: StatusPublisher,
}

impl DocumentEntry {
    pub fn new(
        document_id: DocumentId,
        content: String,
        initial_etag: Option<String>,
        instance: u64,
    ) -> Self {
        let state = SyncState::new(document_id, fingerprint(&content), initial_etag);
        let base_content = state.status.is_synced().then(|| content.clone());
        let publisher = StatusPublisher::new(state.status);

        Self {
            state,
            content,
            base_content,
            instance,
            generation: 0,
            in_flight: false,
            follow_up: false,
            conflict: None,
            publisher,
        }
    }

    pub fn status(&self) -> SyncStatus {
        self.state.status
    }

    /// Move to `to` if the state machine allows it.
    pub fn set_status(&mut self, to: SyncStatus) -> Result<()> {
        let from = self.state.status;
        if !from.can_transition_to(to) {
            return Err(SyncError::InvalidTransition {
                document_id: self.state.document_id.clone(),
                from,
                to,
            });
        }
        if from != to {
            debug!(document_id = %self.state.document_id, %from, %to, "status");
        }
        self.state.status = to;
        self.publisher.set(to);
        Ok(())
    }

    /// Record a local edit. Does not change the status.
    pub fn record_edit(&mut self, content: String) {
        self.state.local_etag = Some(fingerprint(&content));
        self.state.last_local_change = Some(now_millis());
        self.state.pending_changes = true;
        self.content = content;
        self.generation += 1;
    }

    /// Record content confirmed by the remote under `etag`.
    pub fn record_confirmed(&mut self, content: &str, etag: String) {
        self.state.remote_etag = Some(etag);
        self.state.last_synced_at = Some(now_millis());
        self.state.error = None;
        self.base_content = Some(content.to_string());
    }

    pub fn subscribe(&self) -> StatusSubscription {
        self.publisher.subscribe()
    }
}

/// Map of registered documents.
#[derive(Debug, Default)]
pub struct Registry {
    docs: HashMap<DocumentId, DocumentEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: DocumentEntry) -> Result<()> {
        let id = entry.state.document_id.clone();
        if self.docs.contains_key(&id) {
            return Err(SyncError::AlreadyRegistered(id));
        }
        self.docs.insert(id, entry);
        Ok(())
    }

    pub fn remove(&mut self, id: &DocumentId) -> Option<DocumentEntry> {
        self.docs.remove(id)
    }

    pub fn get(&self, id: &DocumentId) -> Result<&DocumentEntry> {
        self.docs
            .get(id)
            .ok_or_else(|| SyncError::DocumentNotFound(id.clone()))
    }

    pub fn get_mut(&mut self, id: &DocumentId) -> Result<&mut DocumentEntry> {
        self.docs
            .get_mut(id)
            .ok_or_else(|| SyncError::DocumentNotFound(id.clone()))
    }

    /// Entry for `id` only if it is still the registration `instance`.
    pub fn get_instance_mut(
        &mut self,
        id: &DocumentId,
        instance: u64,
    ) -> Option<&mut DocumentEntry> {
        self.docs.get_mut(id).filter(|entry| entry.instance == instance)
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.docs.contains_key(id)
    }

    pub fn entries_mut(&mut self) -> impl Iterator<Item = &mut DocumentEntry> {
        self.docs.values_mut()
    }

    /// Snapshot of every state, ordered by document ID.
    pub fn states(&self) -> Vec<SyncState> {
        let mut states: Vec<SyncState> = self.docs.values().map(|e| e.state.clone()).collect();
        states.sort_by(|a, b| a.document_id.cmp(&b.document_id));
        states
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, content: &str, etag: Option<&str>) -> DocumentEntry {
        DocumentEntry::new(id.into(), content.into(), etag.map(str::to_string), 1)
    }

    #[test]
    fn test_initial_status_from_etag() {
        assert_eq!(entry("a", "x", None).status(), SyncStatus::Local);

        let synced = entry("a", "x", Some(&fingerprint("x")));
        assert_eq!(synced.status(), SyncStatus::Synced);
        assert_eq!(synced.base_content.as_deref(), Some("x"));

        let pending = entry("a", "x", Some("stale"));
        assert_eq!(pending.status(), SyncStatus::Pending);
        assert!(pending.base_content.is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = Registry::new();
        registry.insert(entry("a", "x", None)).unwrap();
        assert!(matches!(
            registry.insert(entry("a", "y", None)),
            Err(SyncError::AlreadyRegistered(_))
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_transition_leaves_status() {
        let mut e = entry("a", "x", None);
        let err = e.set_status(SyncStatus::Synced).unwrap_err();
        assert!(matches!(err, SyncError::InvalidTransition { .. }));
        assert_eq!(e.status(), SyncStatus::Local);
    }

    #[test]
    fn test_set_status_publishes() {
        let mut e = entry("a", "x", None);
        let sub = e.subscribe();

        e.set_status(SyncStatus::Pending).unwrap();
        assert_eq!(sub.current(), SyncStatus::Pending);
        assert!(sub.has_changed());
    }

    #[test]
    fn test_record_edit() {
        let mut e = entry("a", "x", None);
        e.record_edit("y".into());

        assert_eq!(e.content, "y");
        assert_eq!(e.generation, 1);
        assert!(e.state.pending_changes);
        assert_eq!(e.state.local_etag, Some(fingerprint("y")));
        assert!(e.state.last_local_change.is_some());
    }

    #[test]
    fn test_instance_filter() {
        let mut registry = Registry::new();
        registry.insert(entry("a", "x", None)).unwrap();
        assert!(registry.get_instance_mut(&"a".into(), 1).is_some());
        assert!(registry.get_instance_mut(&"a".into(), 2).is_none());
    }

    #[test]
    fn test_states_sorted() {
        let mut registry = Registry::new();
        registry.insert(entry("b", "", None)).unwrap();
        registry.insert(entry("a", "", None)).unwrap();
        let ids: Vec<_> = registry.states().into_iter().map(|s| s.document_id).collect();
        assert_eq!(ids, vec![DocumentId::from("a"), DocumentId::from("b")]);
    }
}
