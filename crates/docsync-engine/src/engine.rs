//! The sync engine.
//!
//! [`SyncEngine`] ties the registry, the per-document push timers, the
//! offline queue and the event bus to a [`RemoteClient`].
//!
//! # Push lifecycle
//!
//! A push runs in three phases:
//!
//! 1. Under the state lock: check that the document may be pushed, mark it
//!    `syncing` and take a ticket (content, base ETag, edit generation).
//! 2. Without any lock: await the remote.
//! 3. Under the state lock again: apply the outcome to whatever the document
//!    looks like now. If it was unregistered meanwhile the outcome is
//!    discarded; if it was edited meanwhile it stays `pending`.
//!
//! A document never has two pushes awaiting the remote at once. A push
//! requested while one is in flight is deferred and re-issued as soon as the
//! first completes.
//!
//! Events are published after the state lock is released.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use docsync_core::{
    diff_stats, now_millis, ConflictInfo, DiffStats, Document, DocumentId, ResolutionKind,
    SyncState, SyncStatus,
};
use docsync_remote::{RemoteClient, RemoteError, SyncOutcome};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::events::{EventBus, SubscriptionId, SyncEvent};
use crate::queue::{OfflineQueue, RetryDecision, SyncQueueItem};
use crate::registry::{DocumentEntry, Registry};
use crate::scheduler::TimerTable;
use crate::status::StatusSubscription;

/// What a push request ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// The remote accepted the content.
    Synced,
    /// The remote rejected the content; a conflict is recorded.
    Conflict,
    /// The call failed; the content is queued for retry.
    Failed,
    /// Offline; the content is queued.
    Queued,
    /// Another push is in flight; this one follows when it completes.
    Deferred,
    /// The document has an unresolved conflict.
    Blocked,
    /// The document was unregistered.
    Discarded,
}

/// Summary of one offline queue pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub attempted: usize,
    pub synced: usize,
    pub conflicts: usize,
    /// Failed and still queued.
    pub requeued: usize,
    /// Failed and dropped at the retry limit.
    pub dropped: usize,
    /// The pass did not run (offline, or another pass was in progress).
    pub skipped: bool,
}

/// Result of [`SyncEngine::refresh_from_remote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The remote has not moved.
    Unchanged,
    /// The remote moved and the local copy was replaced.
    Updated(Document),
    /// The remote moved while local changes were pending.
    Conflict,
    /// Not refreshed: local-only, in conflict, or a push is in flight.
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PushSource {
    Scheduled,
    Manual,
    Drain,
}

struct Ticket {
    id: DocumentId,
    instance: u64,
    generation: u64,
    content: String,
    etag: String,
    source: PushSource,
}

enum Begin {
    Push(Ticket),
    Done(PushOutcome),
}

struct EngineState {
    registry: Registry,
    queue: OfflineQueue,
    online: bool,
    draining: bool,
    /// Drain passes since the queue was last empty.
    drain_passes: u32,
    next_instance: u64,
}

struct EngineInner<C> {
    config: SyncConfig,
    remote: C,
    state: Mutex<EngineState>,
    push_timers: TimerTable<DocumentId>,
    drain_timer: TimerTable<()>,
    events: EventBus,
}

/// Per-document sync engine.
///
/// Cheap to clone; clones share state. Timer-driven work holds only a weak
/// reference, so dropping the last clone stops all background activity.
///
/// Methods that schedule timers must be called from within a Tokio runtime.
pub struct SyncEngine<C> {
    inner: Arc<EngineInner<C>>,
}

impl<C> Clone for SyncEngine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: RemoteClient + 'static> SyncEngine<C> {
    /// Create an engine. It starts online with no documents.
    pub fn new(remote: C, config: SyncConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(EngineInner {
                config,
                remote,
                state: Mutex::new(EngineState {
                    registry: Registry::new(),
                    queue: OfflineQueue::new(),
                    online: true,
                    draining: false,
                    drain_passes: 0,
                    next_instance: 0,
                }),
                push_timers: TimerTable::new(),
                drain_timer: TimerTable::new(),
                events: EventBus::new(),
            }),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registration
    // ─────────────────────────────────────────────────────────────────────────

    /// Start tracking a document.
    ///
    /// Without `initial_etag` the document starts `local`. With one it
    /// starts `synced` if the ETag matches `content`, otherwise `pending`
    /// and a push is scheduled.
    pub fn register(
        &self,
        id: impl Into<DocumentId>,
        content: impl Into<String>,
        initial_etag: Option<String>,
    ) -> Result<StatusSubscription> {
        let id = id.into();
        let max_retries = self.inner.config.retry.max_retries;

        let (subscription, schedule) = {
            let mut st = self.lock();
            if st.registry.contains(&id) {
                return Err(SyncError::AlreadyRegistered(id));
            }
            st.next_instance += 1;
            let mut entry =
                DocumentEntry::new(id.clone(), content.into(), initial_etag, st.next_instance);

            let mut schedule = false;
            if entry.status() == SyncStatus::Pending {
                if st.online {
                    schedule = self.inner.config.auto_sync;
                } else {
                    entry.set_status(SyncStatus::Offline)?;
                    st.queue.add(id.clone(), entry.content.clone(), max_retries);
                }
            }

            let subscription = entry.subscribe();
            debug!(document_id = %id, status = %entry.status(), "registered");
            st.registry.insert(entry)?;
            (subscription, schedule)
        };

        if schedule {
            self.schedule_push(id, self.inner.config.push_delay());
        }
        Ok(subscription)
    }

    /// Stop tracking a document.
    ///
    /// Its timer is cleared and its queued push dropped. A push already
    /// awaiting the remote completes, but its result is discarded.
    pub fn unregister(&self, id: &DocumentId) -> Result<SyncState> {
        let entry = {
            let mut st = self.lock();
            let entry = st
                .registry
                .remove(id)
                .ok_or_else(|| SyncError::DocumentNotFound(id.clone()))?;
            st.queue.remove(id);
            entry
        };
        self.inner.push_timers.cancel(id);
        debug!(document_id = %id, "unregistered");
        Ok(entry.state)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local edits
    // ─────────────────────────────────────────────────────────────────────────

    /// Record a local edit and (re)arm the document's push timer.
    ///
    /// While offline the edit is queued instead. While a conflict is
    /// unresolved the edit only updates the local side of the conflict.
    pub fn notify_change(&self, id: &DocumentId, content: impl Into<String>) -> Result<()> {
        let schedule = {
            let mut st = self.lock();
            let EngineState {
                registry,
                queue,
                online,
                ..
            } = &mut *st;
            let entry = registry.get_mut(id)?;
            apply_edit(entry, queue, *online, content.into(), self.inner.config.retry.max_retries)?
        };

        if schedule && self.inner.config.auto_sync {
            debug!(document_id = %id, delay = ?self.inner.config.push_delay(), "push scheduled");
            self.schedule_push(id.clone(), self.inner.config.push_delay());
        }
        Ok(())
    }

    /// Push `content` immediately, bypassing and cancelling the timer.
    pub async fn force_sync_now(
        &self,
        id: &DocumentId,
        content: impl Into<String>,
    ) -> Result<PushOutcome> {
        let content = content.into();
        {
            let mut st = self.lock();
            let EngineState {
                registry,
                queue,
                online,
                ..
            } = &mut *st;
            let entry = registry.get_mut(id)?;
            if entry.content != content {
                apply_edit(entry, queue, *online, content, self.inner.config.retry.max_retries)?;
            }
        }
        self.push_now(id).await
    }

    /// Push the current content immediately.
    ///
    /// This is how a document whose queued push was dropped at the retry
    /// limit gets another attempt without a new edit.
    pub async fn retry_now(&self, id: &DocumentId) -> Result<PushOutcome> {
        self.lock().registry.get(id)?;
        self.push_now(id).await
    }

    /// Local changes since the last confirmed content.
    pub fn pending_summary(&self, id: &DocumentId) -> Result<DiffStats> {
        let st = self.lock();
        let entry = st.registry.get(id)?;
        Ok(diff_stats(
            entry.base_content.as_deref().unwrap_or(""),
            &entry.content,
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Connectivity & offline queue
    // ─────────────────────────────────────────────────────────────────────────

    /// Report connectivity.
    ///
    /// Going offline marks `synced` and `syncing` documents `offline`. In
    /// flight pushes are not cancelled. Coming back online returns offline
    /// documents to `pending` (or `synced` if they have nothing to push)
    /// and drains the queue.
    pub async fn set_online(&self, online: bool) -> DrainReport {
        let changed = {
            let mut st = self.lock();
            let changed = st.online != online;
            st.online = online;
            if changed {
                for entry in st.registry.entries_mut() {
                    let to = match (online, entry.status()) {
                        (false, SyncStatus::Synced | SyncStatus::Syncing) => SyncStatus::Offline,
                        (true, SyncStatus::Offline)
                            if entry.state.pending_changes || entry.in_flight =>
                        {
                            SyncStatus::Pending
                        }
                        (true, SyncStatus::Offline) => SyncStatus::Synced,
                        _ => continue,
                    };
                    transition(entry, to);
                }
            }
            changed
        };

        if !changed {
            return DrainReport {
                skipped: true,
                ..DrainReport::default()
            };
        }

        info!(online, "connectivity changed");
        if online {
            self.process_queue().await
        } else {
            self.inner.drain_timer.cancel(&());
            DrainReport {
                skipped: true,
                ..DrainReport::default()
            }
        }
    }

    /// Queue `content` for a document, replacing its queued item.
    ///
    /// Returns the queue item ID.
    pub fn add_to_queue(&self, id: &DocumentId, content: impl Into<String>) -> Result<u64> {
        let item_id = {
            let mut st = self.lock();
            st.registry.get(id)?;
            st.queue
                .add(id.clone(), content.into(), self.inner.config.retry.max_retries)
        };
        self.arm_drain();
        Ok(item_id)
    }

    /// Attempt every queued push once, in queue order.
    ///
    /// While items remain afterwards, another pass is scheduled after the
    /// retry delay.
    pub async fn process_queue(&self) -> DrainReport {
        let mut report = DrainReport::default();

        let ids = {
            let mut st = self.lock();
            if !st.online || st.draining {
                report.skipped = true;
                return report;
            }
            st.draining = true;
            st.queue.document_ids()
        };
        let guard = DrainGuard {
            state: &self.inner.state,
        };
        self.inner.drain_timer.cancel(&());

        if !ids.is_empty() {
            debug!(items = ids.len(), "draining offline queue");
        }

        for id in ids {
            if !self.is_online() {
                break;
            }
            report.attempted += 1;
            match self.run_push(&id, PushSource::Drain).await {
                Ok(PushOutcome::Synced) => report.synced += 1,
                Ok(PushOutcome::Conflict) => report.conflicts += 1,
                Ok(PushOutcome::Failed) => {
                    if self.lock().queue.contains(&id) {
                        report.requeued += 1;
                    } else {
                        report.dropped += 1;
                    }
                }
                Ok(_) => {}
                Err(err) => warn!(document_id = %id, error = %err, "queued push not started"),
            }
        }
        drop(guard);

        let remaining = {
            let mut st = self.lock();
            if st.queue.is_empty() {
                st.drain_passes = 0;
                false
            } else {
                st.drain_passes += 1;
                true
            }
        };
        if remaining {
            self.arm_drain();
        }
        report
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Conflicts & remote
    // ─────────────────────────────────────────────────────────────────────────

    /// Settle a conflict and reapply the result as a fresh edit.
    ///
    /// Returns the resolved content. The remote side becomes the new base.
    pub fn resolve_conflict(
        &self,
        id: &DocumentId,
        kind: ResolutionKind,
        merged: Option<&str>,
    ) -> Result<String> {
        let max_retries = self.inner.config.retry.max_retries;

        let (resolved, schedule) = {
            let mut st = self.lock();
            let EngineState {
                registry,
                queue,
                online,
                ..
            } = &mut *st;
            let entry = registry.get_mut(id)?;
            let info = entry
                .conflict
                .as_ref()
                .ok_or_else(|| SyncError::NoConflict(id.clone()))?;
            let resolved = docsync_core::resolve_conflict(info, kind, merged)?;
            let remote_content = info.remote_content.clone();

            entry.set_status(SyncStatus::Pending)?;
            entry.conflict = None;
            entry.base_content = Some(remote_content);
            entry.state.error = None;
            let schedule = apply_edit(entry, queue, *online, resolved.clone(), max_retries)?;
            (resolved, schedule)
        };

        info!(document_id = %id, resolution = %kind, "conflict resolved");
        if schedule && self.inner.config.auto_sync {
            self.schedule_push(id.clone(), self.inner.config.push_delay());
        }
        Ok(resolved)
    }

    /// Create the remote counterpart of a `local` document.
    pub async fn enable_cloud_sync(&self, id: &DocumentId) -> Result<Document> {
        let (content, instance) = {
            let mut st = self.lock();
            let online = st.online;
            let entry = st.registry.get_mut(id)?;
            if entry.status() != SyncStatus::Local {
                return Err(SyncError::InvalidTransition {
                    document_id: id.clone(),
                    from: entry.status(),
                    to: SyncStatus::Pending,
                });
            }
            if !online {
                return Err(SyncError::Offline);
            }
            entry.set_status(SyncStatus::Pending)?;
            entry.state.pending_changes = true;
            entry.in_flight = true;
            (entry.content.clone(), entry.instance)
        };
        self.inner.push_timers.cancel(id);

        let result = self
            .inner
            .remote
            .save_document(Document {
                id: id.clone(),
                content: content.clone(),
                etag: String::new(),
                updated_at: now_millis(),
            })
            .await;

        let mut events = Vec::new();
        let mut reschedule = false;
        let mut drain = false;
        let result = {
            let mut st = self.lock();
            let EngineState {
                registry,
                queue,
                online,
                ..
            } = &mut *st;
            match registry.get_instance_mut(id, instance) {
                None => result.map_err(SyncError::from),
                Some(entry) => {
                    entry.in_flight = false;
                    let follow_up = std::mem::take(&mut entry.follow_up);
                    match result {
                        Ok(doc) => {
                            entry.record_confirmed(&content, doc.etag.clone());
                            if entry.content == content {
                                entry.state.local_etag = Some(doc.etag.clone());
                                entry.state.pending_changes = false;
                                let next = if *online {
                                    SyncStatus::Synced
                                } else {
                                    SyncStatus::Offline
                                };
                                transition(entry, next);
                            } else {
                                reschedule = *online && follow_up;
                            }
                            info!(document_id = %id, etag = %doc.etag, "cloud sync enabled");
                            events.push(SyncEvent::complete(doc.clone()));
                            Ok(doc)
                        }
                        Err(err) => {
                            warn!(document_id = %id, error = %err, "enabling cloud sync failed");
                            entry.state.error = Some(err.to_string());
                            queue.add(
                                id.clone(),
                                entry.content.clone(),
                                self.inner.config.retry.max_retries,
                            );
                            drain = *online;
                            events.push(SyncEvent::error(id.clone(), err.to_string(), false));
                            Err(SyncError::from(err))
                        }
                    }
                }
            }
        };

        if reschedule {
            self.schedule_follow_up(id, Duration::ZERO);
        }
        if drain {
            self.arm_drain();
        }
        self.publish_all(&events);
        result
    }

    /// Fetch the remote copy and reconcile it with the local state.
    ///
    /// Without local changes a newer remote copy replaces the local content
    /// and a `remote_update` event is published. With local changes a
    /// conflict is recorded.
    pub async fn refresh_from_remote(&self, id: &DocumentId) -> Result<RefreshOutcome> {
        let instance = {
            let st = self.lock();
            if !st.online {
                return Err(SyncError::Offline);
            }
            let entry = st.registry.get(id)?;
            if entry.in_flight
                || matches!(entry.status(), SyncStatus::Local | SyncStatus::Conflict)
            {
                return Ok(RefreshOutcome::Skipped);
            }
            entry.instance
        };

        let Some(doc) = self.inner.remote.get_document(id).await? else {
            return Ok(RefreshOutcome::Unchanged);
        };

        let mut event = None;
        let outcome = {
            let mut st = self.lock();
            let EngineState {
                registry, queue, ..
            } = &mut *st;
            let Some(entry) = registry.get_instance_mut(id, instance) else {
                return Ok(RefreshOutcome::Skipped);
            };

            if entry.in_flight || entry.status() == SyncStatus::Conflict {
                RefreshOutcome::Skipped
            } else if entry.state.remote_etag.as_deref() == Some(doc.etag.as_str()) {
                RefreshOutcome::Unchanged
            } else if !entry.state.pending_changes || entry.content == doc.content {
                entry.content = doc.content.clone();
                entry.generation += 1;
                entry.state.local_etag = Some(doc.etag.clone());
                entry.state.pending_changes = false;
                entry.record_confirmed(&doc.content, doc.etag.clone());
                transition(entry, SyncStatus::Synced);
                queue.remove(id);
                info!(document_id = %id, etag = %doc.etag, "remote update applied");
                event = Some(SyncEvent::remote_update(doc.clone()));
                RefreshOutcome::Updated(doc)
            } else {
                event = Some(record_conflict(entry, doc.content, doc.etag));
                queue.remove(id);
                RefreshOutcome::Conflict
            }
        };

        if event.is_some() {
            self.inner.push_timers.cancel(id);
        }
        if let Some(event) = event {
            self.inner.events.publish(&event);
        }
        Ok(outcome)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Observation
    // ─────────────────────────────────────────────────────────────────────────

    /// Snapshot of one document's state.
    pub fn state(&self, id: &DocumentId) -> Result<SyncState> {
        Ok(self.lock().registry.get(id)?.state.clone())
    }

    /// Snapshot of every document's state, ordered by ID.
    pub fn states(&self) -> Vec<SyncState> {
        self.lock().registry.states()
    }

    /// Current local content of a document.
    pub fn content(&self, id: &DocumentId) -> Result<String> {
        Ok(self.lock().registry.get(id)?.content.clone())
    }

    /// The unresolved conflict of a document, if any.
    pub fn conflict(&self, id: &DocumentId) -> Result<Option<ConflictInfo>> {
        Ok(self.lock().registry.get(id)?.conflict.clone())
    }

    pub fn queue_snapshot(&self) -> Vec<SyncQueueItem> {
        self.lock().queue.items().to_vec()
    }

    pub fn is_registered(&self, id: &DocumentId) -> bool {
        self.lock().registry.contains(id)
    }

    pub fn is_online(&self) -> bool {
        self.lock().online
    }

    /// Observe a document's status.
    pub fn subscribe_status(&self, id: &DocumentId) -> Result<StatusSubscription> {
        Ok(self.lock().registry.get(id)?.subscribe())
    }

    /// Receive every sync event.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe(callback)
    }

    /// Receive sync events of one document.
    pub fn subscribe_document<F>(&self, id: DocumentId, callback: F) -> SubscriptionId
    where
        F: Fn(&SyncEvent) + Send + Sync + 'static,
    {
        self.inner.events.subscribe_document(id, callback)
    }

    pub fn unsubscribe(&self, subscription: SubscriptionId) -> bool {
        self.inner.events.unsubscribe(subscription)
    }

    pub fn remote(&self) -> &C {
        &self.inner.remote
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner.state.lock()
    }

    async fn push_now(&self, id: &DocumentId) -> Result<PushOutcome> {
        self.inner.push_timers.cancel(id);
        self.run_push(id, PushSource::Manual).await
    }

    async fn run_push(&self, id: &DocumentId, source: PushSource) -> Result<PushOutcome> {
        let ticket = match self.begin_push(id, source)? {
            Begin::Push(ticket) => ticket,
            Begin::Done(outcome) => {
                debug!(document_id = %id, ?outcome, ?source, "push not started");
                return Ok(outcome);
            }
        };

        self.inner.events.publish(&SyncEvent::start(id.clone()));
        debug!(document_id = %id, etag = %ticket.etag, ?source, "push started");

        let result = self
            .inner
            .remote
            .sync_document(id, &ticket.content, &ticket.etag)
            .await;
        Ok(self.complete_push(ticket, result))
    }

    fn begin_push(&self, id: &DocumentId, source: PushSource) -> Result<Begin> {
        let max_retries = self.inner.config.retry.max_retries;
        let mut st = self.lock();
        let EngineState {
            registry,
            queue,
            online,
            ..
        } = &mut *st;

        let Ok(entry) = registry.get_mut(id) else {
            if source == PushSource::Drain {
                queue.remove(id);
            }
            return Ok(Begin::Done(PushOutcome::Discarded));
        };

        if entry.status() == SyncStatus::Conflict {
            if source == PushSource::Drain {
                queue.remove(id);
            }
            return Ok(Begin::Done(PushOutcome::Blocked));
        }
        if entry.in_flight {
            entry.follow_up = true;
            return Ok(Begin::Done(PushOutcome::Deferred));
        }
        if !*online {
            if source != PushSource::Drain {
                queue.add(id.clone(), entry.content.clone(), max_retries);
            }
            entry.set_status(SyncStatus::Offline)?;
            return Ok(Begin::Done(PushOutcome::Queued));
        }

        let content = match source {
            PushSource::Drain => match queue.get(id) {
                Some(item) => item.content.clone(),
                None => return Ok(Begin::Done(PushOutcome::Discarded)),
            },
            PushSource::Scheduled | PushSource::Manual => entry.content.clone(),
        };

        entry.set_status(SyncStatus::Syncing)?;
        entry.in_flight = true;
        entry.follow_up = false;

        Ok(Begin::Push(Ticket {
            id: id.clone(),
            instance: entry.instance,
            generation: entry.generation,
            content,
            etag: entry.state.remote_etag.clone().unwrap_or_default(),
            source,
        }))
    }

    fn complete_push(
        &self,
        ticket: Ticket,
        result: std::result::Result<SyncOutcome, RemoteError>,
    ) -> PushOutcome {
        let mut events = Vec::new();
        let mut reschedule = None;
        let mut drain = false;
        let mut cancel_timer = false;

        let outcome = {
            let mut st = self.lock();
            let EngineState {
                registry,
                queue,
                online,
                ..
            } = &mut *st;
            let online = *online;

            let Some(entry) = registry.get_instance_mut(&ticket.id, ticket.instance) else {
                debug!(document_id = %ticket.id, "push result discarded");
                return PushOutcome::Discarded;
            };
            entry.in_flight = false;
            let follow_up = std::mem::take(&mut entry.follow_up);
            let fresh = entry.generation == ticket.generation && entry.content == ticket.content;

            match result {
                Ok(SyncOutcome::Accepted(doc)) => {
                    entry.record_confirmed(&ticket.content, doc.etag.clone());
                    queue.remove_if_content(&ticket.id, &ticket.content);

                    let next = if !online {
                        SyncStatus::Offline
                    } else if fresh {
                        SyncStatus::Synced
                    } else {
                        SyncStatus::Pending
                    };
                    if fresh {
                        entry.state.local_etag = Some(doc.etag.clone());
                        entry.state.pending_changes = false;
                    } else {
                        // The local content moved on while this push was out.
                        entry.state.pending_changes = true;
                        reschedule = if !online {
                            None
                        } else if follow_up {
                            Some(Duration::ZERO)
                        } else if self.inner.config.auto_sync {
                            Some(self.inner.config.push_delay())
                        } else {
                            None
                        };
                    }
                    transition(entry, next);

                    info!(document_id = %ticket.id, etag = %doc.etag, fresh, "push accepted");
                    events.push(SyncEvent::complete(doc));
                    PushOutcome::Synced
                }
                Ok(SyncOutcome::Conflict {
                    server_content,
                    server_etag,
                }) => {
                    events.push(record_conflict(entry, server_content, server_etag));
                    queue.remove(&ticket.id);
                    cancel_timer = true;
                    PushOutcome::Conflict
                }
                Err(err) => {
                    let message = err.to_string();
                    entry.state.error = Some(message.clone());
                    let next = if online {
                        SyncStatus::Pending
                    } else {
                        SyncStatus::Offline
                    };
                    transition(entry, next);
                    warn!(
                        document_id = %ticket.id,
                        error = %err,
                        retryable = err.is_retryable(),
                        "push failed"
                    );

                    if ticket.source == PushSource::Drain {
                        match queue.record_failure(&ticket.id) {
                            Some(RetryDecision::Exhausted { retry_count }) => {
                                let message =
                                    format!("gave up after {} retries: {}", retry_count, err);
                                entry.state.error = Some(message.clone());
                                warn!(
                                    document_id = %ticket.id,
                                    retry_count,
                                    "retry limit reached, queued push dropped"
                                );
                                events.push(SyncEvent::error(ticket.id.clone(), message, true));
                            }
                            Some(RetryDecision::Requeued { retry_count }) => {
                                debug!(document_id = %ticket.id, retry_count, "push requeued");
                                events.push(SyncEvent::error(ticket.id.clone(), message, false));
                            }
                            None => {
                                events.push(SyncEvent::error(ticket.id.clone(), message, false))
                            }
                        }
                    } else {
                        queue.add(
                            ticket.id.clone(),
                            entry.content.clone(),
                            self.inner.config.retry.max_retries,
                        );
                        drain = online;
                        events.push(SyncEvent::error(ticket.id.clone(), message, false));
                    }
                    PushOutcome::Failed
                }
            }
        };

        if cancel_timer {
            self.inner.push_timers.cancel(&ticket.id);
        }
        if let Some(delay) = reschedule {
            self.schedule_follow_up(&ticket.id, delay);
        }
        if drain {
            self.arm_drain();
        }
        self.publish_all(&events);
        outcome
    }

    fn schedule_push(&self, id: DocumentId, delay: Duration) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.push_timers.schedule(id.clone(), delay, move || async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let engine = SyncEngine { inner };
            if let Err(err) = engine.run_push(&id, PushSource::Scheduled).await {
                warn!(document_id = %id, error = %err, "scheduled push not started");
            }
        });
    }

    /// Schedule a push that follows a completed one, unless an edit has
    /// already armed a timer. That timer carries the newest content and its
    /// own quiet window.
    fn schedule_follow_up(&self, id: &DocumentId, delay: Duration) {
        if self.inner.push_timers.is_scheduled(id) {
            debug!(document_id = %id, "follow-up left to armed timer");
            return;
        }
        self.schedule_push(id.clone(), delay);
    }

    /// Schedule the next drain pass unless one is already armed or running.
    fn arm_drain(&self) {
        let delay = {
            let st = self.lock();
            if !st.online || st.draining || st.queue.is_empty() {
                return;
            }
            self.inner.config.retry.delay_for_pass(st.drain_passes)
        };
        if self.inner.drain_timer.is_scheduled(&()) {
            return;
        }

        debug!(?delay, "drain scheduled");
        let weak = Arc::downgrade(&self.inner);
        self.inner.drain_timer.schedule((), delay, move || async move {
            if let Some(inner) = weak.upgrade() {
                SyncEngine { inner }.process_queue().await;
            }
        });
    }

    fn publish_all(&self, events: &[SyncEvent]) {
        for event in events {
            self.inner.events.publish(event);
        }
    }
}

/// Resets the draining flag even if a drain pass is dropped midway.
struct DrainGuard<'a> {
    state: &'a Mutex<EngineState>,
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.state.lock().draining = false;
    }
}

/// Apply a local edit to an entry. Returns true if a push should be
/// scheduled.
fn apply_edit(
    entry: &mut DocumentEntry,
    queue: &mut OfflineQueue,
    online: bool,
    content: String,
    max_retries: u32,
) -> Result<bool> {
    entry.record_edit(content);
    let id = entry.state.document_id.clone();

    match entry.status() {
        SyncStatus::Conflict => {
            let changed_at = entry.state.last_local_change;
            if let Some(conflict) = entry.conflict.as_mut() {
                conflict.local_content = entry.content.clone();
                if let Some(at) = changed_at {
                    conflict.local_timestamp = at;
                }
            }
            Ok(false)
        }
        _ if !online => {
            entry.set_status(SyncStatus::Offline)?;
            queue.add(id, entry.content.clone(), max_retries);
            Ok(false)
        }
        status => {
            // An in-flight push keeps `syncing`; the edit is picked up when
            // it completes.
            if status != SyncStatus::Syncing {
                entry.set_status(SyncStatus::Pending)?;
            }
            if queue.contains(&id) {
                queue.add(id, entry.content.clone(), max_retries);
            }
            Ok(true)
        }
    }
}

/// Record a conflict between the entry's content and the remote copy.
fn record_conflict(
    entry: &mut DocumentEntry,
    remote_content: String,
    remote_etag: String,
) -> SyncEvent {
    let now = now_millis();
    let id = entry.state.document_id.clone();

    entry.state.remote_etag = Some(remote_etag.clone());
    entry.state.pending_changes = true;
    entry.conflict = Some(ConflictInfo {
        document_id: id.clone(),
        local_content: entry.content.clone(),
        remote_content: remote_content.clone(),
        local_timestamp: entry.state.last_local_change.unwrap_or(now),
        remote_timestamp: now,
        base_content: entry.base_content.clone(),
    });
    transition(entry, SyncStatus::Conflict);

    warn!(document_id = %id, remote_etag = %remote_etag, "conflict detected");
    SyncEvent::conflict(id, entry.content.clone(), remote_content, remote_etag)
}

fn transition(entry: &mut DocumentEntry, to: SyncStatus) {
    if let Err(err) = entry.set_status(to) {
        warn!(error = %err, "transition rejected");
    }
}
