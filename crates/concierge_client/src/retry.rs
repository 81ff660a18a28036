//! Bounded retry with exponential backoff.
//!
//! The per-request lifecycle is:
//!
//! ```text
//! PENDING -> RATE_LIMIT_WAIT -> DISPATCHED -> SUCCESS
//!                  ^                      \-> TERMINAL_FAILURE
//!                  \---- RETRYABLE_FAILURE <-/
//! ```
//!
//! Rate-limit admission happens inside the attempt closure, so every retry
//! re-enters the limiter.

use crate::RetryConfig;
use concierge_error::RetryableError;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use tracing::{debug, instrument, warn};

/// Delays between attempts.
///
/// `delay(n) = min(base * 2^n + jitter, cap)` where jitter is uniform in
/// `[0, ratio * base * 2^n]`. Yields `max_retries` values, so the caller
/// makes at most `max_retries + 1` attempts.
///
/// # Example
///
/// ```
/// use concierge_client::{BackoffSchedule, RetryConfig};
/// use std::time::Duration;
///
/// let delays: Vec<Duration> = BackoffSchedule::new(&RetryConfig::default())
///     .without_jitter()
///     .collect();
/// assert_eq!(
///     delays,
///     vec![
///         Duration::from_millis(1000),
///         Duration::from_millis(2000),
///         Duration::from_millis(4000),
///     ]
/// );
/// ```
#[derive(Debug, Clone)]
pub struct BackoffSchedule {
    base: Duration,
    cap: Duration,
    jitter_ratio: f64,
    attempt: u32,
    max_retries: u32,
}

impl BackoffSchedule {
    /// Schedule for `config`.
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            base: config.base_delay(),
            cap: config.max_delay(),
            jitter_ratio: config.jitter_ratio().clamp(0.0, 1.0),
            attempt: 0,
            max_retries: *config.max_retries(),
        }
    }

    /// Same schedule with jitter disabled.
    pub fn without_jitter(mut self) -> Self {
        self.jitter_ratio = 0.0;
        self
    }

    /// Delay before retry number `attempt` (zero-based), without jitter.
    pub fn base_delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

impl Iterator for BackoffSchedule {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.attempt >= self.max_retries {
            return None;
        }

        let delay = self.base_delay_for(self.attempt);
        self.attempt += 1;

        if delay >= self.cap || self.jitter_ratio == 0.0 {
            return Some(delay);
        }

        let max_jitter = delay.mul_f64(self.jitter_ratio);
        let jitter = max_jitter.mul_f64(rand::thread_rng().gen_range(0.0..=1.0));
        Some((delay + jitter).min(self.cap))
    }
}

/// Final result of a retried operation.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Last attempt's result
    pub result: Result<T, E>,
    /// Attempts made, including the first
    pub attempts: u32,
}

impl<T, E> RetryOutcome<T, E> {
    /// Retries made after the first attempt.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

/// Runs an attempt function until it succeeds, fails terminally, or runs out
/// of retries.
#[derive(Debug, Clone)]
pub struct RetryEngine {
    config: RetryConfig,
}

impl RetryEngine {
    /// Create an engine from retry settings.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Retry settings in use.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Delay schedule for one request.
    pub fn schedule(&self) -> BackoffSchedule {
        BackoffSchedule::new(&self.config)
    }

    /// Run `attempt_fn` with retries and return only the final result.
    pub async fn execute<F, Fut, T, E>(&self, attempt_fn: F) -> Result<T, E>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + Display,
    {
        self.execute_counted(attempt_fn).await.result
    }

    /// Run `attempt_fn` with retries, reporting how many attempts were made.
    ///
    /// `attempt_fn` receives the one-based attempt number. Retryable errors
    /// are retried after the next backoff delay, or after the error's
    /// `Retry-After` hint (clamped to the cap) when that is enabled.
    #[instrument(skip(self, attempt_fn), fields(max_retries = self.config.max_retries()))]
    pub async fn execute_counted<F, Fut, T, E>(&self, attempt_fn: F) -> RetryOutcome<T, E>
    where
        F: Fn(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + Display,
    {
        let attempts = AtomicU32::new(0);
        let attempts_ref = &attempts;
        let attempt_fn = &attempt_fn;
        let honor_retry_after = *self.config.honor_retry_after();
        let cap = self.config.max_delay();
        let max_attempts = self.config.max_retries().saturating_add(1);

        let result = Retry::spawn(self.schedule(), move || async move {
            let attempt = attempts_ref.fetch_add(1, Ordering::Relaxed) + 1;

            match attempt_fn(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "Succeeded after retry");
                    }
                    Ok(value)
                }
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let retry_after = e
                        .retry_after()
                        .filter(|_| honor_retry_after)
                        .map(|hint| hint.min(cap));
                    warn!(attempt, ?retry_after, "Transient error, will retry: {}", e);
                    Err(RetryError::Transient {
                        err: e,
                        retry_after,
                    })
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!(attempt, "Retries exhausted: {}", e);
                    } else {
                        debug!(attempt, "Permanent error, failing immediately: {}", e);
                    }
                    Err(RetryError::Permanent(e))
                }
            }
        })
        .await;

        RetryOutcome {
            result,
            attempts: attempts.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_length_matches_max_retries() {
        let config = RetryConfig::default().with_max_retries(5);
        assert_eq!(BackoffSchedule::new(&config).count(), 5);
    }

    #[test]
    fn test_base_delay_saturates_at_cap() {
        let schedule = BackoffSchedule::new(&RetryConfig::default());
        assert_eq!(schedule.base_delay_for(10), Duration::from_secs(30));
        assert_eq!(schedule.base_delay_for(40), Duration::from_secs(30));
    }
}
