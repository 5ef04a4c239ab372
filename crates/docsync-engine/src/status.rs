//! Per-document status observable.
//!
//! Each registered document owns a [`StatusPublisher`]. Subscribers hold a
//! [`StatusSubscription`] and are woken only when the status value actually
//! changes; setting the current value again is not a change. Dropping the
//! subscription unsubscribes.

use docsync_core::SyncStatus;
use tokio::sync::watch;

/// Owning side of a document's status observable.
#[derive(Debug)]
pub struct StatusPublisher {
    tx: watch::Sender<SyncStatus>,
}

impl StatusPublisher {
    pub fn new(initial: SyncStatus) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx }
    }

    /// Publish `status`. Returns true if subscribers were notified.
    pub fn set(&self, status: SyncStatus) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        })
    }

    /// The last published status.
    pub fn get(&self) -> SyncStatus {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> StatusSubscription {
        StatusSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Receiving side of a document's status observable.
#[derive(Debug, Clone)]
pub struct StatusSubscription {
    rx: watch::Receiver<SyncStatus>,
}

impl StatusSubscription {
    /// Current status, without marking it seen.
    pub fn current(&self) -> SyncStatus {
        *self.rx.borrow()
    }

    /// True if the status changed since it was last seen.
    ///
    /// Returns false once the document has been unregistered.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Wait for the next change and return the new status.
    ///
    /// Returns `None` once the document has been unregistered.
    pub async fn changed(&mut self) -> Option<SyncStatus> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    /// Wait until the status equals `status`.
    ///
    /// Returns immediately if it already does. Returns `None` once the
    /// document has been unregistered.
    pub async fn wait_for(&mut self, status: SyncStatus) -> Option<SyncStatus> {
        let seen = self.rx.wait_for(|current| *current == status).await.ok()?;
        Some(*seen)
    }

    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    pub fn is_synced(&self) -> bool {
        self.current().is_synced()
    }

    pub fn is_syncing(&self) -> bool {
        self.current().is_syncing()
    }

    pub fn has_conflict(&self) -> bool {
        self.current().has_conflict()
    }

    pub fn is_pending(&self) -> bool {
        self.current().is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_set_does_not_notify() {
        let publisher = StatusPublisher::new(SyncStatus::Local);
        let sub = publisher.subscribe();

        assert!(!publisher.set(SyncStatus::Local));
        assert!(!sub.has_changed());

        assert!(publisher.set(SyncStatus::Pending));
        assert!(sub.has_changed());
        assert!(!publisher.set(SyncStatus::Pending));
    }

    #[test]
    fn test_set_without_subscribers() {
        let publisher = StatusPublisher::new(SyncStatus::Local);
        assert!(publisher.set(SyncStatus::Pending));
        assert_eq!(publisher.get(), SyncStatus::Pending);
        assert_eq!(publisher.subscriber_count(), 0);
    }

    #[test]
    fn test_derived_predicates() {
        let publisher = StatusPublisher::new(SyncStatus::Synced);
        let sub = publisher.subscribe();
        assert!(sub.is_synced());
        assert!(sub.is_online());

        publisher.set(SyncStatus::Offline);
        assert!(!sub.is_online());
        assert!(sub.is_pending());

        publisher.set(SyncStatus::Conflict);
        assert!(sub.has_conflict());
    }

    #[tokio::test]
    async fn test_changed_yields_new_value() {
        let publisher = StatusPublisher::new(SyncStatus::Pending);
        let mut sub = publisher.subscribe();

        publisher.set(SyncStatus::Syncing);
        assert_eq!(sub.changed().await, Some(SyncStatus::Syncing));
        assert!(!sub.has_changed());
    }

    #[tokio::test]
    async fn test_dropped_publisher_ends_subscription() {
        let publisher = StatusPublisher::new(SyncStatus::Pending);
        let mut sub = publisher.subscribe();
        drop(publisher);

        assert_eq!(sub.changed().await, None);
        assert_eq!(sub.current(), SyncStatus::Pending);
    }
}
