//! Offline queue of pushes that could not be delivered.
//!
//! Holds at most one item per document. Adding an item for a document that
//! is already queued replaces it with a fresh one, so the latest content
//! wins and the retry count starts over.

use docsync_core::{now_millis, DocumentId};

/// A push waiting for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncQueueItem {
    pub id: u64,
    pub document_id: DocumentId,
    pub content: String,
    /// When the item was queued (Unix ms).
    pub timestamp: i64,
    /// Failed drain attempts so far.
    pub retry_count: u32,
    pub max_retries: u32,
}

/// What happened to an item after a failed drain attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// The item stays queued for the next pass.
    Requeued { retry_count: u32 },
    /// The item reached its retry limit and was dropped.
    Exhausted { retry_count: u32 },
}

/// FIFO queue keyed by document.
#[derive(Debug, Default)]
pub struct OfflineQueue {
    items: Vec<SyncQueueItem>,
    next_id: u64,
}

impl OfflineQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `content` for `document_id`, replacing any existing item.
    ///
    /// Returns the new item's ID.
    pub fn add(&mut self, document_id: DocumentId, content: String, max_retries: u32) -> u64 {
        self.remove(&document_id);

        self.next_id += 1;
        let id = self.next_id;
        self.items.push(SyncQueueItem {
            id,
            document_id,
            content,
            timestamp: now_millis(),
            retry_count: 0,
            max_retries,
        });
        id
    }

    /// Remove the item of a document.
    pub fn remove(&mut self, document_id: &DocumentId) -> Option<SyncQueueItem> {
        let pos = self
            .items
            .iter()
            .position(|item| item.document_id == *document_id)?;
        Some(self.items.remove(pos))
    }

    /// Remove the item of a document only if it still carries `content`.
    ///
    /// Used after a successful push, so a newer item queued meanwhile is
    /// kept.
    pub fn remove_if_content(&mut self, document_id: &DocumentId, content: &str) -> bool {
        match self.get(document_id) {
            Some(item) if item.content == content => self.remove(document_id).is_some(),
            _ => false,
        }
    }

    /// Count a failed delivery attempt, dropping the item once it reaches
    /// its retry limit.
    ///
    /// Returns `None` if the document has no queued item.
    pub fn record_failure(&mut self, document_id: &DocumentId) -> Option<RetryDecision> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.document_id == *document_id)?;
        item.retry_count += 1;
        let retry_count = item.retry_count;

        if retry_count >= item.max_retries {
            self.remove(document_id);
            Some(RetryDecision::Exhausted { retry_count })
        } else {
            Some(RetryDecision::Requeued { retry_count })
        }
    }

    pub fn get(&self, document_id: &DocumentId) -> Option<&SyncQueueItem> {
        self.items.iter().find(|item| item.document_id == *document_id)
    }

    pub fn contains(&self, document_id: &DocumentId) -> bool {
        self.get(document_id).is_some()
    }

    /// Documents with queued items, oldest first.
    pub fn document_ids(&self) -> Vec<DocumentId> {
        self.items.iter().map(|item| item.document_id.clone()).collect()
    }

    pub fn items(&self) -> &[SyncQueueItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(s: &str) -> DocumentId {
        DocumentId::from(s)
    }

    #[test]
    fn test_add_replaces_existing_item() {
        let mut queue = OfflineQueue::new();
        let first = queue.add(id("doc"), "v1".into(), 3);
        queue.record_failure(&id("doc"));

        let second = queue.add(id("doc"), "v2".into(), 3);

        assert_ne!(first, second);
        assert_eq!(queue.len(), 1);
        let item = queue.get(&id("doc")).unwrap();
        assert_eq!(item.content, "v2");
        assert_eq!(item.retry_count, 0);
    }

    #[test]
    fn test_fifo_order_across_documents() {
        let mut queue = OfflineQueue::new();
        queue.add(id("a"), "1".into(), 3);
        queue.add(id("b"), "2".into(), 3);
        queue.add(id("a"), "3".into(), 3);

        assert_eq!(queue.document_ids(), vec![id("b"), id("a")]);
    }

    #[test]
    fn test_remove_if_content_keeps_newer_item() {
        let mut queue = OfflineQueue::new();
        queue.add(id("doc"), "new".into(), 3);

        assert!(!queue.remove_if_content(&id("doc"), "old"));
        assert!(queue.contains(&id("doc")));
        assert!(queue.remove_if_content(&id("doc"), "new"));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_retry_limit_drops_item() {
        let mut queue = OfflineQueue::new();
        queue.add(id("doc"), "x".into(), 3);

        assert_eq!(
            queue.record_failure(&id("doc")),
            Some(RetryDecision::Requeued { retry_count: 1 })
        );
        assert_eq!(
            queue.record_failure(&id("doc")),
            Some(RetryDecision::Requeued { retry_count: 2 })
        );
        assert_eq!(
            queue.record_failure(&id("doc")),
            Some(RetryDecision::Exhausted { retry_count: 3 })
        );
        assert!(queue.is_empty());
        assert_eq!(queue.record_failure(&id("doc")), None);
    }

    proptest! {
        #[test]
        fn test_failures_below_limit_keep_item(max in 1u32..10, failures in 0u32..10) {
            let mut queue = OfflineQueue::new();
            queue.add(id("doc"), "x".into(), max);
            for _ in 0..failures {
                queue.record_failure(&id("doc"));
            }

            if failures < max {
                let item = queue.get(&id("doc"));
                prop_assert!(item.is_some());
                prop_assert_eq!(item.map(|i| i.retry_count), Some(failures));
            } else {
                prop_assert!(!queue.contains(&id("doc")));
            }
        }
    }
}
