//! General sliding-window limiter.
//!
//! This module provides the `SlidingWindowLimiter`, which enforces two rules
//! for every non-hot-path dispatch:
//! - at most `budget` dispatches inside any trailing `window`
//! - at least `min_spacing` between two consecutive dispatches
//!
//! Dispatch timestamps are kept in a queue and pruned on every admission, so
//! the count is exact rather than an approximation. Callers queue on a fair
//! async mutex and are admitted in arrival order.

use crate::{Priority, WindowConfig};
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument, trace};

/// Outcome of a successful admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    /// Time spent queued before the dispatch was recorded
    pub waited: Duration,
    /// Dispatches in the window, including this one
    pub in_window: usize,
}

#[derive(Debug, Default)]
struct WindowState {
    dispatched: VecDeque<Instant>,
    last_dispatch: Option<Instant>,
}

impl WindowState {
    fn prune(&mut self, now: Instant, window: Duration) {
        while let Some(oldest) = self.dispatched.front() {
            if now.duration_since(*oldest) >= window {
                self.dispatched.pop_front();
            } else {
                break;
            }
        }
    }

    /// Time until a dispatch would be allowed, or `None` if allowed now.
    fn wait_time(
        &self,
        now: Instant,
        budget: usize,
        window: Duration,
        min_spacing: Duration,
    ) -> Option<Duration> {
        if self.dispatched.len() >= budget
            && let Some(oldest) = self.dispatched.front()
        {
            return Some(window.saturating_sub(now.duration_since(*oldest)));
        }

        if let Some(last) = self.last_dispatch {
            let since = now.duration_since(last);
            if since < min_spacing {
                return Some(min_spacing - since);
            }
        }

        None
    }

    fn record(&mut self, now: Instant) {
        self.dispatched.push_back(now);
        self.last_dispatch = Some(now);
    }
}

/// Sliding-window limiter guarding the aggregate request budget.
///
/// # Example
///
/// ```rust,ignore
/// use concierge_rate_limit::{Priority, SlidingWindowLimiter, WindowConfig};
///
/// let limiter = SlidingWindowLimiter::new(&WindowConfig::default());
/// let admission = limiter.admit(Priority::Normal).await;
/// // dispatch the request...
/// ```
#[derive(Debug)]
pub struct SlidingWindowLimiter {
    budget: usize,
    window: Duration,
    min_spacing: Duration,
    state: Mutex<WindowState>,
}

impl SlidingWindowLimiter {
    /// Create a limiter from configuration.
    ///
    /// A zero budget is treated as one; `WindowConfig::validate` rejects it
    /// before it gets here in normal use.
    pub fn new(config: &WindowConfig) -> Self {
        debug!(
            budget = config.budget(),
            window_secs = config.window_secs(),
            min_spacing_ms = config.min_spacing_ms(),
            "Creating sliding window limiter"
        );
        Self {
            budget: (*config.budget()).max(1) as usize,
            window: config.window(),
            min_spacing: config.min_spacing(),
            state: Mutex::new(WindowState::default()),
        }
    }

    /// Wait until a dispatch is allowed, then record it.
    ///
    /// Dropping the returned future before it completes records nothing.
    #[instrument(skip(self), fields(budget = self.budget))]
    pub async fn admit(&self, priority: Priority) -> Admission {
        let started = Instant::now();
        let mut state = self.state.lock().await;

        loop {
            let now = Instant::now();
            state.prune(now, self.window);

            match state.wait_time(now, self.budget, self.window, self.min_spacing) {
                Some(wait) => {
                    debug!(
                        wait_ms = wait.as_millis() as u64,
                        in_window = state.dispatched.len(),
                        "Waiting for rate limit window"
                    );
                    sleep(wait).await;
                }
                None => {
                    state.record(now);
                    let admission = Admission {
                        waited: now.duration_since(started),
                        in_window: state.dispatched.len(),
                    };
                    trace!(in_window = admission.in_window, "Admitted");
                    return admission;
                }
            }
        }
    }

    /// Admit without waiting.
    ///
    /// Returns `None` if the budget or spacing would block, or if other
    /// callers are already queued.
    pub fn try_admit(&self) -> Option<Admission> {
        let mut state = self.state.try_lock().ok()?;
        let now = Instant::now();
        state.prune(now, self.window);

        if state
            .wait_time(now, self.budget, self.window, self.min_spacing)
            .is_some()
        {
            return None;
        }

        state.record(now);
        Some(Admission {
            waited: Duration::ZERO,
            in_window: state.dispatched.len(),
        })
    }

    /// Dispatches currently counted against the window.
    pub async fn in_window(&self) -> usize {
        let mut state = self.state.lock().await;
        state.prune(Instant::now(), self.window);
        state.dispatched.len()
    }

    /// Dispatches still available in the current window.
    pub async fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.in_window().await)
    }

    /// Configured budget.
    pub fn budget(&self) -> usize {
        self.budget
    }
}
