//! Test fixtures and helpers.
//!
//! Common setup code for engine and integration tests.

use std::sync::Arc;

use docsync_core::{DocumentId, SyncStatus};
use docsync_engine::{Result, StatusSubscription, SyncConfig, SyncEngine, SyncEvent, SyncEventKind};
use docsync_remote::{MemoryRemote, RemoteClient};
use parking_lot::Mutex;

/// Install a test log subscriber. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Records every event an engine publishes.
#[derive(Debug, Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<SyncEvent>>>,
}

impl EventRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe the recorder to all events of `engine`.
    pub fn attach<C: RemoteClient + 'static>(&self, engine: &SyncEngine<C>) {
        let events = self.events.clone();
        engine.subscribe(move |event| events.lock().push(event.clone()));
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().clone()
    }

    /// Event kinds in publication order.
    pub fn kinds(&self) -> Vec<SyncEventKind> {
        self.events.lock().iter().map(|e| e.kind).collect()
    }

    /// Event kinds of one document in publication order.
    pub fn kinds_for(&self, id: &DocumentId) -> Vec<SyncEventKind> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.document_id == *id)
            .map(|e| e.kind)
            .collect()
    }

    pub fn count(&self, kind: SyncEventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    /// The most recent event of `kind`.
    pub fn last(&self, kind: SyncEventKind) -> Option<SyncEvent> {
        self.events.lock().iter().rev().find(|e| e.kind == kind).cloned()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// An engine wired to a scriptable in-memory remote.
pub struct EngineFixture {
    pub engine: SyncEngine<Arc<MemoryRemote>>,
    pub remote: Arc<MemoryRemote>,
    pub events: EventRecorder,
}

impl EngineFixture {
    /// Create a fixture with the default config.
    pub fn new() -> Self {
        Self::with_remote(MemoryRemote::new(), SyncConfig::default())
    }

    /// Create a fixture with a custom config.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails validation.
    pub fn with_config(config: SyncConfig) -> Self {
        Self::with_remote(MemoryRemote::new(), config)
    }

    /// Create a fixture around a prepared remote.
    ///
    /// # Panics
    ///
    /// Panics if `config` fails validation.
    pub fn with_remote(remote: MemoryRemote, config: SyncConfig) -> Self {
        let remote = Arc::new(remote);
        let engine = match SyncEngine::new(remote.clone(), config) {
            Ok(engine) => engine,
            Err(err) => panic!("invalid fixture config: {err}"),
        };
        let events = EventRecorder::new();
        events.attach(&engine);
        Self {
            engine,
            remote,
            events,
        }
    }

    /// Register a document the way an editor opens it: from the remote copy
    /// if there is one, otherwise as a local document.
    pub async fn open(&self, id: impl Into<DocumentId>) -> Result<StatusSubscription> {
        let id = id.into();
        match self.engine.remote().get_document(&id).await? {
            Some(doc) => self.engine.register(id, doc.content, Some(doc.etag)),
            None => self.engine.register(id, String::new(), None),
        }
    }

    /// Put `content` on the remote and register the document as synced.
    pub fn seed(&self, id: &str, content: &str) -> Result<StatusSubscription> {
        let doc = self.remote.put_remote(id, content);
        self.engine.register(id, doc.content, Some(doc.etag))
    }

    /// Current status of a document.
    ///
    /// # Panics
    ///
    /// Panics if the document is not registered.
    pub fn status(&self, id: &str) -> SyncStatus {
        match self.engine.state(&DocumentId::from(id)) {
            Ok(state) => state.status,
            Err(err) => panic!("{err}"),
        }
    }
}

impl Default for EngineFixture {
    fn default() -> Self {
        Self::new()
    }
}
