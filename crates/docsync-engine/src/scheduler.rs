//! Per-key timer table.
//!
//! Each key has at most one armed timer. Scheduling a key again aborts its
//! armed timer and replaces it, which gives trailing-edge debounce when the
//! same key is scheduled on every edit. Keys are independent.
//!
//! A timer leaves the table the moment it fires, before its callback runs,
//! so a callback in progress is never aborted by a later `schedule` or
//! `cancel` for the same key.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

struct Armed {
    token: u64,
    handle: JoinHandle<()>,
}

struct Timers<K> {
    next_token: u64,
    armed: HashMap<K, Armed>,
}

/// Table of cancellable one-shot timers.
///
/// Must be used from within a Tokio runtime.
pub struct TimerTable<K> {
    inner: Arc<Mutex<Timers<K>>>,
}

impl<K> TimerTable<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Timers {
                next_token: 0,
                armed: HashMap::new(),
            })),
        }
    }

    /// Run `fire` after `delay`, replacing any timer armed for `key`.
    pub fn schedule<F, Fut>(&self, key: K, delay: Duration, fire: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        // The lock is held across spawn and insert so the new task cannot
        // look itself up before it is registered.
        let mut timers = self.inner.lock();
        timers.next_token += 1;
        let token = timers.next_token;

        let table = self.inner.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !disarm(&table, &task_key, token) {
                return;
            }
            fire().await;
        });

        if let Some(previous) = timers.armed.insert(key, Armed { token, handle }) {
            previous.handle.abort();
        }
    }

    /// Disarm the timer for `key`. Returns true if one was armed.
    pub fn cancel(&self, key: &K) -> bool {
        match self.inner.lock().armed.remove(key) {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Disarm every timer.
    pub fn cancel_all(&self) {
        for (_, armed) in self.inner.lock().armed.drain() {
            armed.handle.abort();
        }
    }

    pub fn is_scheduled(&self, key: &K) -> bool {
        self.inner.lock().armed.contains_key(key)
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.inner.lock().armed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K> Default for TimerTable<K>
where
    K: Eq + Hash + Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Drop for TimerTable<K> {
    fn drop(&mut self) {
        for (_, armed) in self.inner.lock().armed.drain() {
            armed.handle.abort();
        }
    }
}

/// Remove the entry for `key` if it still belongs to `token`.
fn disarm<K: Eq + Hash>(table: &Mutex<Timers<K>>, key: &K, token: u64) -> bool {
    let mut timers = table.lock();
    match timers.armed.get(key) {
        Some(armed) if armed.token == token => {
            timers.armed.remove(key);
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn bump(count: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> + Send + 'static {
        let count = count.clone();
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_fires_after_delay() {
        let table = TimerTable::new();
        let count = counter();

        table.schedule("a", Duration::from_millis(100), bump(&count));
        assert!(table.is_scheduled(&"a"));

        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!table.is_scheduled(&"a"));
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_reschedule_replaces_timer() {
        let table = TimerTable::new();
        let count = counter();

        for _ in 0..5 {
            table.schedule("a", Duration::from_millis(100), bump(&count));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_keys_are_independent() {
        let table = TimerTable::new();
        let count = counter();

        table.schedule("a", Duration::from_millis(100), bump(&count));
        table.schedule("b", Duration::from_millis(100), bump(&count));
        assert_eq!(table.len(), 2);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(table.is_empty());
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_cancel() {
        let table = TimerTable::new();
        let count = counter();

        table.schedule("a", Duration::from_millis(100), bump(&count));
        assert!(table.cancel(&"a"));
        assert!(!table.cancel(&"a"));

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "current_thread", start_paused = true)]
    async fn test_running_callback_survives_reschedule() {
        let table = Arc::new(TimerTable::new());
        let count = counter();

        let done = count.clone();
        table.schedule("a", Duration::from_millis(10), move || async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            done.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        // Callback is sleeping; a new timer for the same key must not abort it.
        table.schedule("a", Duration::from_millis(1000), bump(&count));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
