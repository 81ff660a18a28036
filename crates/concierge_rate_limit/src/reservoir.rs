//! Hot-path reservoir limiter.
//!
//! Availability lookups are issued far more often than anything else during
//! an interactive conversation. They get their own throttle so they cannot
//! drain the general budget:
//! - a reservoir of units, refilled to a fixed amount on a fixed interval
//! - a concurrency cap enforced with a Tokio `Semaphore`
//! - a minimum spacing between consecutive starts
//!
//! Work is released in arrival order once all three allow it.

use crate::ReservoirConfig;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, instrument};

#[derive(Debug)]
struct ReservoirState {
    remaining: u32,
    next_refill: Instant,
    last_start: Option<Instant>,
}

impl ReservoirState {
    fn refill(&mut self, now: Instant, amount: u32, interval: Duration) {
        if now < self.next_refill {
            return;
        }

        // Skip whole periods that elapsed while idle
        let behind = now.duration_since(self.next_refill).as_nanos();
        let rem = behind % interval.as_nanos().max(1);
        self.next_refill = now + interval - Duration::from_nanos(rem as u64);
        self.remaining = amount;
        debug!(amount, "Reservoir refilled");
    }
}

/// Throttle for the single highest-frequency read operation.
///
/// # Example
///
/// ```rust,ignore
/// use concierge_rate_limit::{ReservoirConfig, ReservoirLimiter};
///
/// let limiter = ReservoirLimiter::new(&ReservoirConfig::default());
/// let slots = limiter.schedule(|| async { fetch_slots().await }).await;
/// ```
#[derive(Debug)]
pub struct ReservoirLimiter {
    amount: u32,
    refill_interval: Duration,
    min_spacing: Duration,
    max_concurrent: u32,
    slots: Arc<Semaphore>,
    state: Mutex<ReservoirState>,
}

impl ReservoirLimiter {
    /// Create a full reservoir from configuration.
    pub fn new(config: &ReservoirConfig) -> Self {
        let max_concurrent = (*config.max_concurrent()).max(1);
        debug!(
            amount = config.amount(),
            refill_interval_secs = config.refill_interval_secs(),
            max_concurrent,
            "Creating reservoir limiter"
        );
        Self {
            amount: *config.amount(),
            refill_interval: config.refill_interval(),
            min_spacing: config.min_spacing(),
            max_concurrent,
            slots: Arc::new(Semaphore::new(max_concurrent as usize)),
            state: Mutex::new(ReservoirState {
                remaining: *config.amount(),
                next_refill: Instant::now() + config.refill_interval(),
                last_start: None,
            }),
        }
    }

    /// Wait for a concurrency slot, a reservoir unit and the spacing gap.
    ///
    /// Returns a permit that holds the concurrency slot until dropped. A unit
    /// is only taken from the reservoir once every condition is met, so
    /// dropping this future early costs nothing.
    #[instrument(skip(self), fields(max_concurrent = self.max_concurrent))]
    pub async fn acquire(&self) -> ReservoirPermit {
        let started = Instant::now();
        let mut state = self.state.lock().await;

        // Hold the slot while waiting on budget and spacing so release order stays FIFO
        let permit = self
            .slots
            .clone()
            .acquire_owned()
            .await
            .expect("reservoir semaphore is never closed");

        loop {
            let now = Instant::now();
            state.refill(now, self.amount, self.refill_interval);

            if state.remaining == 0 {
                debug!(
                    refill_in_ms = state.next_refill.duration_since(now).as_millis() as u64,
                    "Reservoir exhausted, waiting for refill"
                );
                sleep_until(state.next_refill).await;
                continue;
            }

            if let Some(last) = state.last_start {
                let since = now.duration_since(last);
                if since < self.min_spacing {
                    sleep(self.min_spacing - since).await;
                    continue;
                }
            }

            state.remaining -= 1;
            state.last_start = Some(now);
            return ReservoirPermit {
                _permit: permit,
                waited: now.duration_since(started),
            };
        }
    }

    /// Run `operation` once admitted and return its result.
    pub async fn schedule<F, Fut, T>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _permit = self.acquire().await;
        operation().await
    }

    /// Operations currently holding a concurrency slot.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent as usize - self.slots.available_permits()
    }

    /// Units left before the next refill.
    pub async fn remaining(&self) -> u32 {
        let mut state = self.state.lock().await;
        state.refill(Instant::now(), self.amount, self.refill_interval);
        state.remaining
    }

    /// Configured concurrency cap.
    pub fn max_concurrent(&self) -> u32 {
        self.max_concurrent
    }
}

/// RAII guard for the reservoir.
///
/// Releases the concurrency slot when dropped, whether the operation
/// succeeded, failed, or was cancelled.
#[derive(Debug)]
pub struct ReservoirPermit {
    _permit: OwnedSemaphorePermit,
    waited: Duration,
}

impl ReservoirPermit {
    /// Time spent queued before admission.
    pub fn waited(&self) -> Duration {
        self.waited
    }
}
