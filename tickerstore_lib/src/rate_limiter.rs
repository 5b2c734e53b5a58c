//! Request pacing and retry logic for chart requests.
//!
//! [`Pacer`] spaces request starts across every worker in a run, so raising
//! concurrency never raises the request rate above what the delay strategy
//! allows. [`with_retry`] wraps a single symbol fetch with exponential backoff
//! for transient failures.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};

use crate::fetch::FetchError;

/// Pause inserted between consecutive request starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayStrategy {
    None,
    Fixed(Duration),
    /// Uniformly random delay in `[min, max]`.
    Jittered { min: Duration, max: Duration },
}

impl Default for DelayStrategy {
    fn default() -> Self {
        DelayStrategy::Fixed(Duration::from_millis(500))
    }
}

impl DelayStrategy {
    /// Fixed `base` delay, or `base..=base+jitter` when `jitter` is non-zero.
    pub fn from_millis(base_ms: u64, jitter_ms: u64) -> Self {
        match (base_ms, jitter_ms) {
            (0, 0) => DelayStrategy::None,
            (base, 0) => DelayStrategy::Fixed(Duration::from_millis(base)),
            (base, jitter) => DelayStrategy::Jittered {
                min: Duration::from_millis(base),
                max: Duration::from_millis(base.saturating_add(jitter)),
            },
        }
    }

    pub fn next_delay(&self) -> Duration {
        match *self {
            DelayStrategy::None => Duration::ZERO,
            DelayStrategy::Fixed(d) => d,
            DelayStrategy::Jittered { min, max } if max > min => {
                let ms = rand::thread_rng().gen_range(min.as_millis()..=max.as_millis());
                Duration::from_millis(ms as u64)
            }
            DelayStrategy::Jittered { min, .. } => min,
        }
    }
}

/// Run-wide pacing of request starts.
///
/// Each `acquire()` reserves the next start slot under the lock, then sleeps
/// outside it, so waiters are released in arrival order.
pub struct Pacer {
    next_slot: Mutex<Option<Instant>>,
    strategy: DelayStrategy,
    tracker: RequestTracker,
}

impl Pacer {
    pub fn new(strategy: DelayStrategy) -> Self {
        Self {
            next_slot: Mutex::new(None),
            strategy,
            tracker: RequestTracker::new(),
        }
    }

    /// Wait until this caller may start a request.
    pub async fn acquire(&self) {
        let start = {
            let mut slot = self.next_slot.lock().await;
            let now = Instant::now();
            let start = match *slot {
                Some(t) if t > now => t,
                _ => now,
            };
            *slot = Some(start + self.strategy.next_delay());
            start
        };
        sleep_until(start).await;
    }

    pub fn strategy(&self) -> DelayStrategy {
        self.strategy
    }

    /// Access the request tracker for recording outcomes.
    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::new(DelayStrategy::default())
    }
}

/// Bounded exponential backoff for transient fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// `base * 2^(attempt-1)`, capped at `max_delay`, scaled by 0.8-1.2 jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(30);
        let exp = 1u64 << shift;
        let base_ms = self.base_delay.as_millis() as u64;
        let capped = base_ms
            .saturating_mul(exp)
            .min(self.max_delay.as_millis() as u64);
        let jitter = rand::thread_rng().gen_range(0.8..1.2);
        Duration::from_millis((capped as f64 * jitter) as u64)
    }
}

/// Atomic counters tracking chart request outcomes.
pub struct RequestTracker {
    requests_made: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_rate_limited: AtomicU64,
    requests_failed: AtomicU64,
    retries: AtomicU64,
    /// Cumulative backoff time in milliseconds.
    total_backoff_ms: AtomicU64,
}

impl RequestTracker {
    fn new() -> Self {
        Self {
            requests_made: AtomicU64::new(0),
            requests_succeeded: AtomicU64::new(0),
            requests_rate_limited: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            total_backoff_ms: AtomicU64::new(0),
        }
    }

    pub fn record_success(&self) {
        self.requests_made.fetch_add(1, Ordering::Relaxed);
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.requests_made.fetch_add(1, Ordering::Relaxed);
        self.requests_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.requests_made.fetch_add(1, Ordering::Relaxed);
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_backoff(&self, duration: Duration) {
        self.retries.fetch_add(1, Ordering::Relaxed);
        self.total_backoff_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
    }

    /// Snapshot the current counters.
    pub fn summary(&self) -> TrackerSummary {
        TrackerSummary {
            requests_made: self.requests_made.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_rate_limited: self.requests_rate_limited.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            total_backoff_secs: self.total_backoff_ms.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

/// Immutable snapshot of tracker counters for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackerSummary {
    pub requests_made: u64,
    pub requests_succeeded: u64,
    pub requests_rate_limited: u64,
    pub requests_failed: u64,
    pub retries: u64,
    pub total_backoff_secs: f64,
}

/// Execute a fetch with pacing and exponential backoff on retryable errors.
///
/// - Calls `pacer.acquire()` before each attempt.
/// - Retries [`FetchError::is_retryable`] errors up to `policy.max_retries`
///   times, sleeping `policy.delay_for_attempt(n)` in between.
/// - Returns any other error immediately.
pub async fn with_retry<F, Fut, T>(
    pacer: &Pacer,
    policy: &RetryPolicy,
    label: &str,
    operation: F,
) -> Result<T, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let tracker = pacer.tracker();
    let mut attempt: u32 = 0;

    loop {
        pacer.acquire().await;

        match operation().await {
            Ok(val) => {
                tracker.record_success();
                return Ok(val);
            }
            Err(err) => {
                if matches!(err, FetchError::RateLimited) {
                    tracker.record_rate_limited();
                } else {
                    tracker.record_failure();
                }

                if !err.is_retryable() || attempt >= policy.max_retries {
                    return Err(err);
                }

                attempt += 1;
                let wait = policy.delay_for_attempt(attempt);
                tracing::warn!(
                    "{}: {} (retry {}/{} in {}ms)",
                    label,
                    err,
                    attempt,
                    policy.max_retries,
                    wait.as_millis()
                );
                tracker.record_backoff(wait);
                sleep(wait).await;
            }
        }
    }
}
