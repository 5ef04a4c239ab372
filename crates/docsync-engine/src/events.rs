//! Sync events and the subscriber list they are delivered to.
//!
//! Delivery is synchronous: [`EventBus::publish`] calls every matching
//! subscriber in subscription order before returning. The engine never
//! publishes while holding its state lock, so a subscriber may call back
//! into the engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use docsync_core::{now_millis, Document, DocumentId};
use parking_lot::Mutex;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncEventKind {
    SyncStart,
    SyncComplete,
    SyncError,
    ConflictDetected,
    RemoteUpdate,
}

impl SyncEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncEventKind::SyncStart => "sync_start",
            SyncEventKind::SyncComplete => "sync_complete",
            SyncEventKind::SyncError => "sync_error",
            SyncEventKind::ConflictDetected => "conflict_detected",
            SyncEventKind::RemoteUpdate => "remote_update",
        }
    }
}

/// Payload attached to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    /// The document as confirmed or fetched.
    Document(Document),
    /// Both sides of a detected conflict.
    Conflict {
        local_content: String,
        remote_content: String,
        remote_etag: String,
    },
    /// A failed push. `exhausted` is set when the queued item was dropped.
    Error { message: String, exhausted: bool },
}

/// A published sync event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub kind: SyncEventKind,
    pub document_id: DocumentId,
    /// Unix ms.
    pub timestamp: i64,
    pub data: Option<EventData>,
}

impl SyncEvent {
    pub fn new(kind: SyncEventKind, document_id: DocumentId, data: Option<EventData>) -> Self {
        Self {
            kind,
            document_id,
            timestamp: now_millis(),
            data,
        }
    }

    pub(crate) fn start(document_id: DocumentId) -> Self {
        Self::new(SyncEventKind::SyncStart, document_id, None)
    }

    pub(crate) fn complete(document: Document) -> Self {
        Self::new(
            SyncEventKind::SyncComplete,
            document.id.clone(),
            Some(EventData::Document(document)),
        )
    }

    pub(crate) fn remote_update(document: Document) -> Self {
        Self::new(
            SyncEventKind::RemoteUpdate,
            document.id.clone(),
            Some(EventData::Document(document)),
        )
    }

    pub(crate) fn error(document_id: DocumentId, message: String, exhausted: bool) -> Self {
        Self::new(
            SyncEventKind::SyncError,
            document_id,
            Some(EventData::Error { message, exhausted }),
        )
    }

    pub(crate) fn conflict(
        document_id: DocumentId,
        local_content: String,
        remote_content: String,
        remote_etag: String,
    ) -> Self {
        Self::new(
            SyncEventKind::ConflictDetected,
            document_id,
            Some(EventData::Conflict {
                local_content,
                remote_content,
                remote_etag,
            }),
        )
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Callback = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

struct Subscriber {
    id: SubscriptionId,
    filter: Option<DocumentId>,
    callback: Callback,
}

/// Explicit subscriber list.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.add(None, Arc::new(callback))
    }

    /// Receive events for one document only.
    pub fn subscribe_document<F>(&self, document_id: DocumentId, callback: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.add(Some(document_id), Arc::new(callback))
    }

    /// Remove a subscriber. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Deliver `event` to every matching subscriber.
    pub fn publish(&self, event: &SyncEvent) {
        // Snapshot so callbacks may subscribe or unsubscribe.
        let targets: Vec<Callback> = self
            .subscribers
            .lock()
            .iter()
            .filter(|s| s.filter.as_ref().map_or(true, |id| *id == event.document_id))
            .map(|s| s.callback.clone())
            .collect();

        for callback in targets {
            callback(event);
        }
    }

    fn add(&self, filter: Option<DocumentId>, callback: Callback) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push(Subscriber {
            id,
            filter,
            callback,
        });
        id
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(bus: &EventBus) -> Arc<Mutex<Vec<SyncEventKind>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe(move |event| sink.lock().push(event.kind));
        seen
    }

    #[test]
    fn test_publish_reaches_all_subscribers() {
        let bus = EventBus::new();
        let a = recorder(&bus);
        let b = recorder(&bus);

        bus.publish(&SyncEvent::start("doc".into()));

        assert_eq!(*a.lock(), vec![SyncEventKind::SyncStart]);
        assert_eq!(*b.lock(), vec![SyncEventKind::SyncStart]);
    }

    #[test]
    fn test_document_filter() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        bus.subscribe_document("a".into(), move |event| {
            sink.lock().push(event.document_id.clone())
        });

        bus.publish(&SyncEvent::start("a".into()));
        bus.publish(&SyncEvent::start("b".into()));

        assert_eq!(*seen.lock(), vec![DocumentId::from("a")]);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(0));
        let sink = seen.clone();
        let id = bus.subscribe(move |_| *sink.lock() += 1);

        bus.publish(&SyncEvent::start("doc".into()));
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.publish(&SyncEvent::start("doc".into()));

        assert_eq!(*seen.lock(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_callback_may_unsubscribe_itself() {
        let bus = Arc::new(EventBus::new());
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&bus);
        let own = slot.clone();
        let id = bus.subscribe(move |_| {
            if let (Some(bus), Some(id)) = (weak.upgrade(), *own.lock()) {
                bus.unsubscribe(id);
            }
        });
        *slot.lock() = Some(id);

        bus.publish(&SyncEvent::start("doc".into()));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(SyncEventKind::ConflictDetected.as_str(), "conflict_detected");
        assert_eq!(SyncEventKind::RemoteUpdate.as_str(), "remote_update");
    }
}
