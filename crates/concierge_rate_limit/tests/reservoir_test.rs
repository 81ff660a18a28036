//! Tests for the hot-path reservoir limiter.

use concierge_rate_limit::{ReservoirConfig, ReservoirLimiter};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::{Instant, sleep};

fn limiter(amount: u32, refill_secs: u64, max_concurrent: u32, spacing_ms: u64) -> ReservoirLimiter {
    let config = ReservoirConfig::default()
        .with_amount(amount)
        .with_refill_interval_secs(refill_secs)
        .with_max_concurrent(max_concurrent)
        .with_min_spacing_ms(spacing_ms);
    ReservoirLimiter::new(&config)
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_cap_under_burst() {
    let limiter = Arc::new(limiter(100, 3600, 5, 0));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let mut handles = Vec::new();
    for _ in 0..20 {
        let limiter = limiter.clone();
        let in_flight = in_flight.clone();
        let peak = peak.clone();
        handles.push(tokio::spawn(async move {
            limiter
                .schedule(|| async {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(250)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                })
                .await;
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(peak.load(Ordering::SeqCst), 5);
    assert_eq!(limiter.in_flight(), 0);
    assert_eq!(limiter.remaining().await, 80);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_reservoir_waits_for_refill() {
    let limiter = limiter(3, 60, 5, 0);
    let start = Instant::now();

    for _ in 0..3 {
        let _permit = limiter.acquire().await;
    }
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(limiter.remaining().await, 0);

    let permit = limiter.acquire().await;
    assert!(permit.waited() >= Duration::from_secs(60));
    assert_eq!(limiter.remaining().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_spacing_between_starts() {
    let limiter = limiter(10, 3600, 5, 100);
    let start = Instant::now();

    for _ in 0..3 {
        let _permit = limiter.acquire().await;
    }

    assert_eq!(start.elapsed(), Duration::from_millis(200));
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_acquire_releases_slot_and_budget() {
    let limiter = limiter(1, 60, 2, 0);
    let held = limiter.acquire().await;
    assert_eq!(limiter.in_flight(), 1);

    // Reservoir is empty: this waiter holds a slot until it is dropped
    let waiting = tokio::time::timeout(Duration::from_secs(5), limiter.acquire()).await;
    assert!(waiting.is_err());
    assert_eq!(limiter.in_flight(), 1);

    drop(held);
    assert_eq!(limiter.in_flight(), 0);
    assert_eq!(limiter.remaining().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_refill_after_idle_periods() {
    let limiter = limiter(2, 10, 2, 0);
    let _a = limiter.acquire().await;
    let _b = limiter.acquire().await;
    drop((_a, _b));

    tokio::time::advance(Duration::from_secs(35)).await;
    assert_eq!(limiter.remaining().await, 2);
}
