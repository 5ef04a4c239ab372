//! Configuration for the sync engine.

use std::time::Duration;

use rand::Rng;

use crate::error::{Result, SyncError};

/// Configuration for a [`SyncEngine`](crate::SyncEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Schedule a push automatically after each local edit.
    pub auto_sync: bool,
    /// Quiet window after the last edit before the push interval starts.
    pub debounce: Duration,
    /// Interval between the debounce window closing and the push.
    pub sync_interval: Duration,
    /// Offline queue retry behavior.
    pub retry: RetryPolicy,
}

impl SyncConfig {
    /// Creates a configuration with the default timings.
    pub fn new() -> Self {
        Self {
            auto_sync: true,
            debounce: Duration::from_millis(500),
            sync_interval: Duration::from_millis(2000),
            retry: RetryPolicy::default(),
        }
    }

    /// Enables or disables automatic pushes after edits.
    pub fn with_auto_sync(mut self, auto_sync: bool) -> Self {
        self.auto_sync = auto_sync;
        self
    }

    /// Sets the debounce window.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Sets the sync interval.
    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    /// Sets the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Total delay between the last edit and the scheduled push.
    pub fn push_delay(&self) -> Duration {
        self.debounce + self.sync_interval
    }

    /// Reject configurations the engine cannot honor.
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_retries == 0 {
            return Err(SyncError::InvalidConfig(
                "max_retries must be at least 1".into(),
            ));
        }
        if let Backoff::Exponential { max_delay } = self.retry.backoff {
            if max_delay < self.retry.retry_delay {
                return Err(SyncError::InvalidConfig(
                    "max_delay must not be shorter than retry_delay".into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// How the delay between drain passes grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Every pass waits `retry_delay`.
    Fixed,
    /// Pass `n` waits `retry_delay * 2^n`, capped at `max_delay`, plus up to
    /// 25% jitter.
    Exponential { max_delay: Duration },
}

/// Retry behavior of the offline queue.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Failed drain attempts after which an item is dropped.
    pub max_retries: u32,
    /// Delay before the next drain pass while items remain.
    pub retry_delay: Duration,
    /// Growth of the delay across consecutive passes.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Creates a fixed-delay policy.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            retry_delay: Duration::from_millis(5000),
            backoff: Backoff::Fixed,
        }
    }

    /// Sets the base delay between passes.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Switches to capped exponential backoff.
    pub fn with_exponential_backoff(mut self, max_delay: Duration) -> Self {
        self.backoff = Backoff::Exponential { max_delay };
        self
    }

    /// Delay before drain pass `pass` (0-indexed, counted since the queue
    /// was last empty).
    pub fn delay_for_pass(&self, pass: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.retry_delay,
            Backoff::Exponential { max_delay } => {
                let factor = 2f64.powi(pass.min(31) as i32);
                let base = (self.retry_delay.as_secs_f64() * factor).min(max_delay.as_secs_f64());
                let jitter = base * 0.25 * rand::thread_rng().gen::<f64>();
                Duration::from_secs_f64(base + jitter)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}
