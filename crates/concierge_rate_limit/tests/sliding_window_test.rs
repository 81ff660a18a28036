//! Tests for the sliding-window limiter.

use concierge_rate_limit::{Priority, SlidingWindowLimiter, WindowConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

fn limiter(budget: u32, window_secs: u64, min_spacing_ms: u64) -> SlidingWindowLimiter {
    let config = WindowConfig::default()
        .with_budget(budget)
        .with_window_secs(window_secs)
        .with_min_spacing_ms(min_spacing_ms);
    SlidingWindowLimiter::new(&config)
}

#[tokio::test(start_paused = true)]
async fn test_admits_immediately_with_headroom() {
    let limiter = limiter(10, 60, 0);

    let admission = limiter.admit(Priority::Normal).await;
    assert_eq!(admission.waited, Duration::ZERO);
    assert_eq!(admission.in_window, 1);
    assert_eq!(limiter.remaining().await, 9);
}

#[tokio::test(start_paused = true)]
async fn test_min_spacing_between_dispatches() {
    let limiter = limiter(100, 3600, 100);
    let start = Instant::now();

    for _ in 0..5 {
        limiter.admit(Priority::Normal).await;
    }

    // First is immediate, the other four are spaced 100 ms apart
    assert_eq!(start.elapsed(), Duration::from_millis(400));
}

#[tokio::test(start_paused = true)]
async fn test_budget_never_exceeded_in_trailing_window() {
    let window = Duration::from_secs(10);
    let limiter = limiter(5, 10, 0);
    let mut stamps = Vec::new();

    for _ in 0..23 {
        limiter.admit(Priority::Normal).await;
        stamps.push(Instant::now());
    }

    for (j, t_j) in stamps.iter().enumerate() {
        let in_window = stamps[..=j]
            .iter()
            .filter(|t_k| t_j.duration_since(**t_k) < window)
            .count();
        assert!(in_window <= 5, "dispatch {j} saw {in_window} in window");
    }
}

#[tokio::test(start_paused = true)]
async fn test_dispatch_after_budget_waits_for_window() {
    // 450/hour with 100 ms spacing: the 451st call must wait for the first to expire
    let limiter = limiter(450, 3600, 100);
    let start = Instant::now();

    for _ in 0..450 {
        limiter.admit(Priority::High).await;
    }
    let before_last = Instant::now();
    let last = limiter.admit(Priority::High).await;

    assert!(last.waited > Duration::ZERO);
    assert!(before_last.elapsed() > Duration::ZERO);
    assert!(start.elapsed() >= Duration::from_secs(3600));
}

#[tokio::test(start_paused = true)]
async fn test_try_admit_refuses_when_exhausted() {
    let limiter = limiter(2, 60, 0);

    assert!(limiter.try_admit().is_some());
    assert!(limiter.try_admit().is_some());
    assert!(limiter.try_admit().is_none());

    tokio::time::advance(Duration::from_secs(60)).await;
    assert!(limiter.try_admit().is_some());
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_wait_records_nothing() {
    let limiter = limiter(1, 60, 0);
    limiter.admit(Priority::Normal).await;

    let waiting = tokio::time::timeout(Duration::from_secs(5), limiter.admit(Priority::Normal)).await;
    assert!(waiting.is_err());
    assert_eq!(limiter.in_window().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_admitted_in_order() {
    let limiter = Arc::new(limiter(100, 3600, 100));
    let order = Arc::new(arrival::Order::default());

    let mut handles = Vec::new();
    for i in 0..5 {
        let limiter = limiter.clone();
        let order = order.clone();
        handles.push(tokio::spawn(async move {
            limiter.admit(Priority::Normal).await;
            order.push(i);
        }));
        // Make arrival order deterministic
        tokio::task::yield_now().await;
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(order.take(), vec![0, 1, 2, 3, 4]);
}

mod arrival {
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct Order(Mutex<Vec<usize>>);

    impl Order {
        pub fn push(&self, i: usize) {
            self.0.lock().unwrap().push(i);
        }

        pub fn take(&self) -> Vec<usize> {
            std::mem::take(&mut *self.0.lock().unwrap())
        }
    }
}
