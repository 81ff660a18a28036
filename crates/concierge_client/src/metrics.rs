//! Client metrics.
//!
//! Counters are process-lifetime and lock-free; latencies are kept as an
//! incremental average plus a bounded sample of recent values for
//! percentiles. Everything is mirrored into OpenTelemetry instruments on the
//! global meter, which are no-ops unless an exporter is installed.
//!
//! Metrics are observability only. Nothing here feeds back into dispatch.

use crate::MetricsConfig;
use derive_getters::Getters;
use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

static INSTRUMENTS: OnceLock<ClientInstruments> = OnceLock::new();

/// OpenTelemetry instruments for booking-service calls.
#[derive(Clone)]
struct ClientInstruments {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    requests: Counter<u64>,
    failures: Counter<u64>,
    retries: Counter<u64>,
    cache_hits: Counter<u64>,
    duration: Histogram<f64>,
}

impl ClientInstruments {
    fn init() -> Self {
        let meter = global::meter("concierge_client");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("booking.requests")
                .with_description("Completed booking-service dispatches")
                .build(),
            failures: meter
                .u64_counter("booking.failures")
                .with_description("Failed booking-service dispatches")
                .build(),
            retries: meter
                .u64_counter("booking.retries")
                .with_description("Retries after a transient failure")
                .build(),
            cache_hits: meter
                .u64_counter("booking.cache_hits")
                .with_description("Reads served from the response cache")
                .build(),
            duration: meter
                .f64_histogram("booking.duration")
                .with_unit("seconds")
                .with_description("Dispatch latency including retries")
                .build(),
        }
    }

    fn get() -> &'static Self {
        INSTRUMENTS.get_or_init(Self::init)
    }
}

#[derive(Debug)]
struct LatencyStats {
    count: u64,
    average_ms: f64,
    recent: VecDeque<f64>,
    capacity: usize,
}

impl LatencyStats {
    fn new(capacity: usize) -> Self {
        Self {
            count: 0,
            average_ms: 0.0,
            recent: VecDeque::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
        }
    }

    fn record(&mut self, latency_ms: f64) {
        self.count += 1;
        self.average_ms += (latency_ms - self.average_ms) / self.count as f64;

        if self.recent.len() == self.capacity {
            self.recent.pop_front();
        }
        self.recent.push_back(latency_ms);
    }

    /// Nearest-rank percentiles over the recent sample.
    fn percentiles(&self, quantiles: &[f64]) -> Vec<f64> {
        if self.recent.is_empty() {
            return vec![0.0; quantiles.len()];
        }

        let mut sorted: Vec<f64> = self.recent.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);

        quantiles
            .iter()
            .map(|q| {
                let rank = (q * sorted.len() as f64).ceil() as usize;
                sorted[rank.clamp(1, sorted.len()) - 1]
            })
            .collect()
    }
}

#[derive(Debug)]
struct MetricsInner {
    config: MetricsConfig,
    total: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    retries: AtomicU64,
    cache_hits: AtomicU64,
    latency: Mutex<LatencyStats>,
    errors_by_kind: Mutex<BTreeMap<&'static str, u64>>,
}

/// Point-in-time view of the client's counters.
#[derive(Debug, Clone, PartialEq, Serialize, Getters)]
pub struct ClientStats {
    /// Completed non-cached dispatches
    total_requests: u64,
    /// Dispatches that ended in success
    successes: u64,
    /// Dispatches that ended in failure
    failures: u64,
    /// Retries across all dispatches
    retries: u64,
    /// Reads answered from the cache
    cache_hits: u64,
    /// Mean latency over the process lifetime (milliseconds)
    average_latency_ms: f64,
    /// Median of the recent sample (milliseconds)
    p50_latency_ms: f64,
    /// 95th percentile of the recent sample (milliseconds)
    p95_latency_ms: f64,
    /// 99th percentile of the recent sample (milliseconds)
    p99_latency_ms: f64,
    /// `successes / total_requests`, or 1.0 before any request
    success_rate: f64,
    /// `cache_hits / (cache_hits + total_requests)`
    cache_hit_rate: f64,
    /// Failure counts keyed by error label
    errors_by_kind: BTreeMap<&'static str, u64>,
}

/// Threshold breach found by [`MetricsCollector::evaluate`].
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum Alarm {
    /// Too many failures
    #[display("success rate {:.1}% below {:.1}%", rate * 100.0, threshold * 100.0)]
    LowSuccessRate {
        /// Observed success rate
        rate: f64,
        /// Configured minimum
        threshold: f64,
    },
    /// Calls are too slow
    #[display("average latency {:.0} ms above {} ms", average_ms, threshold_ms)]
    HighLatency {
        /// Observed average latency
        average_ms: f64,
        /// Configured maximum
        threshold_ms: u64,
    },
}

/// Collects outcome counters and latencies for the client.
///
/// Cheap to clone; clones share the same counters.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<MetricsInner>,
}

impl MetricsCollector {
    /// Create a collector with the given thresholds.
    pub fn new(config: MetricsConfig) -> Self {
        let sample = *config.latency_sample_size();
        Self {
            inner: Arc::new(MetricsInner {
                config,
                total: AtomicU64::new(0),
                successes: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                retries: AtomicU64::new(0),
                cache_hits: AtomicU64::new(0),
                latency: Mutex::new(LatencyStats::new(sample)),
                errors_by_kind: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// Record a completed dispatch.
    pub fn record_outcome(&self, success: bool, latency: Duration) {
        self.inner.total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.inner.successes.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.failures.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.latency.lock().record(latency.as_secs_f64() * 1000.0);

        let instruments = ClientInstruments::get();
        let labels = &[KeyValue::new("success", success)];
        instruments.requests.add(1, labels);
        instruments.duration.record(latency.as_secs_f64(), labels);
    }

    /// Record a completed dispatch tagged with its operation.
    pub fn record_operation(
        &self,
        operation: &'static str,
        error_kind: Option<&'static str>,
        latency: Duration,
    ) {
        self.record_outcome(error_kind.is_none(), latency);

        if let Some(kind) = error_kind {
            *self.inner.errors_by_kind.lock().entry(kind).or_insert(0) += 1;
            ClientInstruments::get().failures.add(
                1,
                &[
                    KeyValue::new("operation", operation),
                    KeyValue::new("error_type", kind),
                ],
            );
        }
    }

    /// Record retries made by one dispatch.
    pub fn record_retries(&self, retries: u32) {
        if retries == 0 {
            return;
        }
        self.inner.retries.fetch_add(u64::from(retries), Ordering::Relaxed);
        ClientInstruments::get().retries.add(u64::from(retries), &[]);
    }

    /// Record a read served from cache.
    pub fn record_cache_hit(&self) {
        self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
        ClientInstruments::get().cache_hits.add(1, &[]);
    }

    /// Current counters.
    pub fn snapshot(&self) -> ClientStats {
        let total = self.inner.total.load(Ordering::Relaxed);
        let successes = self.inner.successes.load(Ordering::Relaxed);
        let cache_hits = self.inner.cache_hits.load(Ordering::Relaxed);

        let (average_latency_ms, percentiles) = {
            let latency = self.inner.latency.lock();
            (latency.average_ms, latency.percentiles(&[0.50, 0.95, 0.99]))
        };

        let lookups = total + cache_hits;
        ClientStats {
            total_requests: total,
            successes,
            failures: self.inner.failures.load(Ordering::Relaxed),
            retries: self.inner.retries.load(Ordering::Relaxed),
            cache_hits,
            average_latency_ms,
            p50_latency_ms: percentiles[0],
            p95_latency_ms: percentiles[1],
            p99_latency_ms: percentiles[2],
            success_rate: if total == 0 {
                1.0
            } else {
                successes as f64 / total as f64
            },
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                cache_hits as f64 / lookups as f64
            },
            errors_by_kind: self.inner.errors_by_kind.lock().clone(),
        }
    }

    /// Thresholds breached by `stats`.
    ///
    /// Nothing is reported before the first completed dispatch.
    pub fn evaluate(stats: &ClientStats, config: &MetricsConfig) -> Vec<Alarm> {
        let mut alarms = Vec::new();
        if stats.total_requests == 0 {
            return alarms;
        }

        if stats.success_rate < *config.min_success_rate() {
            alarms.push(Alarm::LowSuccessRate {
                rate: stats.success_rate,
                threshold: *config.min_success_rate(),
            });
        }
        if stats.average_latency_ms > *config.max_avg_latency_ms() as f64 {
            alarms.push(Alarm::HighLatency {
                average_ms: stats.average_latency_ms,
                threshold_ms: *config.max_avg_latency_ms(),
            });
        }
        alarms
    }

    /// Log a summary now and return any alarms raised.
    pub fn report(&self) -> Vec<Alarm> {
        let stats = self.snapshot();
        info!(
            total_requests = stats.total_requests,
            success_rate = format!("{:.3}", stats.success_rate),
            average_latency_ms = format!("{:.1}", stats.average_latency_ms),
            p95_latency_ms = format!("{:.1}", stats.p95_latency_ms),
            retries = stats.retries,
            cache_hit_rate = format!("{:.3}", stats.cache_hit_rate),
            "Booking client summary"
        );

        let alarms = Self::evaluate(&stats, &self.inner.config);
        for alarm in &alarms {
            warn!(%alarm, "Booking client health alarm");
        }
        alarms
    }

    /// Emit a summary every reporting interval until `shutdown` fires.
    pub fn spawn_reporter(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        let collector = self.clone();
        let period = self.inner.config.report_interval().max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        collector.report();
                    }
                }
            }
        })
    }

    /// Thresholds in use.
    pub fn config(&self) -> &MetricsConfig {
        &self.inner.config
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new(MetricsConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles_nearest_rank() {
        let mut stats = LatencyStats::new(100);
        for ms in 1..=100 {
            stats.record(ms as f64);
        }
        assert_eq!(stats.percentiles(&[0.50, 0.95, 0.99]), vec![50.0, 95.0, 99.0]);
        assert!((stats.average_ms - 50.5).abs() < 1e-9);
    }

    #[test]
    fn test_sample_is_bounded() {
        let mut stats = LatencyStats::new(3);
        for ms in [1.0, 2.0, 3.0, 1000.0] {
            stats.record(ms);
        }
        assert_eq!(stats.recent.len(), 3);
        assert_eq!(stats.percentiles(&[0.0]), vec![2.0]);
    }
}
