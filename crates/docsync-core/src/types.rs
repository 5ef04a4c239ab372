//! Strong type definitions for docsync.
//!
//! Identifiers are newtypes so a document ID cannot be confused with an
//! ETag or with document content.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a synced document.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Create a document ID from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Sync status of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Never synced, no remote counterpart.
    Local,
    /// Local changes not yet pushed.
    Pending,
    /// Push in flight.
    Syncing,
    /// Local content confirmed equal to remote as of the last push.
    Synced,
    /// Remote rejected a push due to fingerprint mismatch.
    Conflict,
    /// Network unavailable; changes are queued.
    Offline,
}

impl SyncStatus {
    /// Lowercase wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Local => "local",
            SyncStatus::Pending => "pending",
            SyncStatus::Syncing => "syncing",
            SyncStatus::Synced => "synced",
            SyncStatus::Conflict => "conflict",
            SyncStatus::Offline => "offline",
        }
    }

    /// Check whether the state machine allows moving from `self` to `to`.
    ///
    /// Re-entering the current status is always allowed. Besides the edit,
    /// push and reconnect cycle, a few shortcuts exist:
    ///
    /// - `Local -> Syncing`: a forced push of a document that was never
    ///   scheduled.
    /// - `Local -> Offline`: an edit made while the engine is offline.
    /// - `Synced -> Syncing`: a forced push or retry with no new edit.
    /// - `Pending -> Synced`: a refresh or publish that finds the remote equal
    ///   to the local content.
    /// - `Pending -> Conflict`: a refresh that finds remote changes on top of
    ///   unsaved local ones.
    /// - `Offline -> Synced`: reconnecting with nothing left to push.
    /// - `Offline -> Conflict`: a refresh or queue drain that hits a remote
    ///   change.
    pub fn can_transition_to(&self, to: SyncStatus) -> bool {
        use SyncStatus::*;

        if *self == to {
            return true;
        }

        matches!(
            (*self, to),
            (Local, Pending | Syncing | Offline)
                | (Pending, Syncing | Synced | Conflict | Offline)
                | (Syncing, Synced | Conflict | Pending | Offline)
                | (Synced, Pending | Syncing | Offline)
                | (Conflict, Pending)
                | (Offline, Pending | Synced | Conflict)
        )
    }

    /// True unless the document is parked because the network is down.
    pub fn is_online(&self) -> bool {
        !matches!(self, SyncStatus::Offline)
    }

    /// True when local content is confirmed on the remote.
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncStatus::Synced)
    }

    /// True when a push is in flight.
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }

    /// True when a conflict awaits explicit resolution.
    pub fn has_conflict(&self) -> bool {
        matches!(self, SyncStatus::Conflict)
    }

    /// True when local edits have not been confirmed yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, SyncStatus::Pending | SyncStatus::Offline)
    }

    /// True for documents that never had a remote counterpart.
    pub fn is_local_only(&self) -> bool {
        matches!(self, SyncStatus::Local)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sync state record of one registered document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// The document this state belongs to.
    pub document_id: DocumentId,
    /// Current status.
    pub status: SyncStatus,
    /// When the last push was confirmed (Unix ms).
    pub last_synced_at: Option<i64>,
    /// When the last local edit was recorded (Unix ms).
    pub last_local_change: Option<i64>,
    /// True whenever local content diverges from the last confirmed content.
    pub pending_changes: bool,
    /// Fingerprint of the current local content.
    pub local_etag: Option<String>,
    /// Last fingerprint reported by the server.
    pub remote_etag: Option<String>,
    /// Last error description.
    pub error: Option<String>,
}

impl SyncState {
    /// Create the initial state of a freshly registered document.
    ///
    /// Without a known ETag the document is `local`. With one, the document
    /// is `synced` when `local_etag` matches it and `pending` otherwise.
    pub fn new(
        document_id: DocumentId,
        local_etag: String,
        initial_etag: Option<String>,
    ) -> Self {
        let (status, pending_changes) = match &initial_etag {
            None => (SyncStatus::Local, false),
            Some(etag) if *etag == local_etag => (SyncStatus::Synced, false),
            Some(_) => (SyncStatus::Pending, true),
        };

        Self {
            document_id,
            status,
            last_synced_at: None,
            last_local_change: None,
            pending_changes,
            local_etag: Some(local_etag),
            remote_etag: initial_etag,
            error: None,
        }
    }

    /// Check the `pending_changes` invariant against the current status.
    pub fn is_consistent(&self) -> bool {
        !self.pending_changes
            || matches!(
                self.status,
                SyncStatus::Pending
                    | SyncStatus::Syncing
                    | SyncStatus::Offline
                    | SyncStatus::Conflict
            )
    }
}

/// A document as stored on the remote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier.
    pub id: DocumentId,
    /// Full text content.
    pub content: String,
    /// Server fingerprint of `content`.
    pub etag: String,
    /// Last modification time on the server (Unix ms).
    pub updated_at: i64,
}

/// Both sides of a push the remote rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictInfo {
    /// The conflicted document.
    pub document_id: DocumentId,
    /// Local content at detection time.
    pub local_content: String,
    /// Content currently on the server.
    pub remote_content: String,
    /// When the local side last changed (Unix ms).
    pub local_timestamp: i64,
    /// When the conflict was observed (Unix ms).
    pub remote_timestamp: i64,
    /// Last content both sides agreed on, if known.
    pub base_content: Option<String>,
}

/// Get current time in milliseconds.
pub fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_display() {
        let id = DocumentId::from("notes/today.md");
        assert_eq!(id.to_string(), "notes/today.md");
        assert_eq!(format!("{:?}", id), "DocumentId(notes/today.md)");
    }

    #[test]
    fn test_initial_state_without_etag_is_local() {
        let state = SyncState::new("doc".into(), "abc".into(), None);
        assert_eq!(state.status, SyncStatus::Local);
        assert!(!state.pending_changes);
        assert!(state.remote_etag.is_none());
    }

    #[test]
    fn test_initial_state_with_matching_etag_is_synced() {
        let state = SyncState::new("doc".into(), "abc".into(), Some("abc".into()));
        assert_eq!(state.status, SyncStatus::Synced);
        assert!(!state.pending_changes);
    }

    #[test]
    fn test_initial_state_with_stale_etag_is_pending() {
        let state = SyncState::new("doc".into(), "abc".into(), Some("def".into()));
        assert_eq!(state.status, SyncStatus::Pending);
        assert!(state.pending_changes);
        assert!(state.is_consistent());
    }

    #[test]
    fn test_transitions() {
        use SyncStatus::*;

        assert!(Local.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Syncing));
        assert!(Syncing.can_transition_to(Synced));
        assert!(Syncing.can_transition_to(Conflict));
        assert!(Syncing.can_transition_to(Pending));
        assert!(Synced.can_transition_to(Offline));
        assert!(Offline.can_transition_to(Pending));
        assert!(Conflict.can_transition_to(Pending));

        assert!(Local.can_transition_to(Syncing));
        assert!(Local.can_transition_to(Offline));
        assert!(Synced.can_transition_to(Syncing));
        assert!(Pending.can_transition_to(Synced));
        assert!(Pending.can_transition_to(Conflict));
        assert!(Offline.can_transition_to(Synced));
        assert!(Offline.can_transition_to(Conflict));

        assert!(!Local.can_transition_to(Synced));
        assert!(!Conflict.can_transition_to(Synced));
        assert!(!Conflict.can_transition_to(Syncing));
        assert!(!Synced.can_transition_to(Conflict));
    }

    #[test]
    fn test_status_predicates() {
        assert!(SyncStatus::Synced.is_synced());
        assert!(SyncStatus::Conflict.has_conflict());
        assert!(!SyncStatus::Offline.is_online());
        assert!(SyncStatus::Offline.is_pending());
        assert!(SyncStatus::Local.is_local_only());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&SyncStatus::Conflict).unwrap();
        assert_eq!(json, "\"conflict\"");
        let back: SyncStatus = serde_json::from_str("\"offline\"").unwrap();
        assert_eq!(back, SyncStatus::Offline);
    }
}
