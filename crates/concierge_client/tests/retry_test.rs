//! Backoff schedule and retry engine behaviour.

use concierge_client::{BackoffSchedule, RetryConfig, RetryEngine, RetryableError};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, PartialEq, derive_more::Display)]
enum FakeError {
    #[display("transient")]
    Transient,
    #[display("permanent")]
    Permanent,
    #[display("throttled")]
    Throttled(Duration),
}

impl RetryableError for FakeError {
    fn is_retryable(&self) -> bool {
        !matches!(self, FakeError::Permanent)
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            FakeError::Throttled(after) => Some(*after),
            _ => None,
        }
    }
}

#[test]
fn test_delays_non_decreasing_and_capped() {
    let configs = [
        RetryConfig::default(),
        RetryConfig::default().with_max_retries(12),
        RetryConfig::default()
            .with_base_delay_ms(250)
            .with_max_delay_ms(5_000)
            .with_max_retries(10),
        RetryConfig::default().with_jitter_ratio(0.0).with_max_retries(8),
    ];

    for config in configs {
        for _ in 0..50 {
            let delays: Vec<Duration> = BackoffSchedule::new(&config).collect();
            assert_eq!(delays.len(), *config.max_retries() as usize);

            for pair in delays.windows(2) {
                assert!(pair[0] <= pair[1], "{:?} then {:?}", pair[0], pair[1]);
            }
            for delay in &delays {
                assert!(*delay <= config.max_delay(), "{:?} above cap", delay);
            }
        }
    }
}

#[test]
fn test_jitter_stays_within_ten_percent() {
    let config = RetryConfig::default();
    let schedule = BackoffSchedule::new(&config);

    for _ in 0..100 {
        for (attempt, delay) in schedule.clone().enumerate() {
            let base = schedule.base_delay_for(attempt as u32);
            assert!(delay >= base);
            assert!(delay <= base + base.mul_f64(0.1));
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_permanent_error_is_single_attempt() {
    let engine = RetryEngine::new(RetryConfig::default());

    let outcome = engine
        .execute_counted(|_| async { Err::<(), _>(FakeError::Permanent) })
        .await;

    assert_eq!(outcome.result, Err(FakeError::Permanent));
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.retries(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_transient_error_then_success() {
    let engine = RetryEngine::new(RetryConfig::default());
    let calls = AtomicU32::new(0);

    let started = Instant::now();
    let result = engine
        .execute(|attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(FakeError::Transient)
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

    assert_eq!(result, Ok(3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    // 1 s + 2 s of backoff, plus at most 10% jitter each
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(3));
    assert!(elapsed <= Duration::from_millis(3300));
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_returns_last_error() {
    let engine = RetryEngine::new(RetryConfig::default().with_max_retries(2));

    let outcome = engine
        .execute_counted(|_| async { Err::<(), _>(FakeError::Transient) })
        .await;

    assert_eq!(outcome.result, Err(FakeError::Transient));
    assert_eq!(outcome.attempts, 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_is_clamped_to_cap() {
    let engine = RetryEngine::new(
        RetryConfig::default()
            .with_max_retries(1)
            .with_max_delay_ms(2_000),
    );

    let started = Instant::now();
    let outcome = engine
        .execute_counted(|attempt| async move {
            if attempt == 1 {
                Err(FakeError::Throttled(Duration::from_secs(600)))
            } else {
                Ok(())
            }
        })
        .await;

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.attempts, 2);
    assert!(started.elapsed() <= Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_means_one_attempt() {
    let engine = RetryEngine::new(RetryConfig::default().with_max_retries(0));

    let outcome = engine
        .execute_counted(|_| async { Err::<(), _>(FakeError::Transient) })
        .await;

    assert_eq!(outcome.attempts, 1);
}
