//! The booking client and its dispatch pipeline.
//!
//! Every call goes through the same steps:
//! 1. Cacheable reads are answered from the response cache when possible
//! 2. Admission: the reservoir for the hot path, the sliding window otherwise
//! 3. The network attempt, classified into data or a typed failure
//! 4. Retryable failures go back to step 2 until the retry bound
//! 5. Successful reads are cached; successful mutations invalidate the
//!    entries they make stale
//! 6. Metrics are updated and the envelope returned
//!
//! The pipeline runs under a panic boundary, the request deadline and an
//! optional cancellation token. Dropping it mid-flight releases any held
//! concurrency slot and stops further attempts.

use crate::{
    ApiResponse, ClientConfig, HttpTransport, MetricsCollector, Operation, RequestDescriptor,
    Method, RetryEngine, Transport, classify,
};
use concierge_cache::{CacheKey, Lookup, SharedResponseCache};
use concierge_error::{ConciergeResult, ConfigError, UpstreamError, UpstreamErrorKind};
use concierge_rate_limit::{ReservoirLimiter, SlidingWindowLimiter};
use futures::FutureExt;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info_span, instrument, warn};

/// Shape check run on fetched data before it is cached or reported.
pub(crate) type PayloadCheck<'a> = &'a (dyn Fn(&JsonValue) -> Result<(), UpstreamError> + Send + Sync);

fn accept_any(_: &JsonValue) -> Result<(), UpstreamError> {
    Ok(())
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    window: SlidingWindowLimiter,
    reservoir: ReservoirLimiter,
    retry: RetryEngine,
    cache: SharedResponseCache,
    metrics: MetricsCollector,
}

/// Mediating client for the booking service.
///
/// One instance is shared by every caller in the process. Cloning is cheap
/// and clones share limiters, cache and metrics.
///
/// # Example
///
/// ```no_run
/// use concierge_client::{BookingClient, ClientConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = BookingClient::new(ClientConfig::load()?)?;
/// let services = client.services().await;
/// if *services.success() {
///     println!("{:?}", services.data());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BookingClient {
    inner: Arc<ClientInner>,
}

impl std::fmt::Debug for BookingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingClient")
            .field("config", &self.inner.config)
            .field("cached_entries", &self.inner.cache.len())
            .finish_non_exhaustive()
    }
}

impl BookingClient {
    /// Create a client that talks HTTP to the configured service.
    ///
    /// Periodic metric summaries are not emitted until
    /// [`spawn_reporter`](Self::spawn_reporter) is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: ClientConfig) -> ConciergeResult<Self> {
        let transport = HttpTransport::new(config.upstream())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a client on top of any transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    #[instrument(skip_all)]
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> ConciergeResult<Self> {
        config.validate()?;
        if *config.upstream().company_id() == 0 {
            return Err(ConfigError::new("upstream.company_id is required").into());
        }

        debug!(config = ?config, "Creating booking client");
        Ok(Self {
            inner: Arc::new(ClientInner {
                window: SlidingWindowLimiter::new(config.rate_limit()),
                reservoir: ReservoirLimiter::new(config.reservoir()),
                retry: RetryEngine::new(config.retry().clone()),
                cache: SharedResponseCache::new(config.cache().clone()),
                metrics: MetricsCollector::new(config.metrics().clone()),
                transport,
                config,
            }),
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Company identifier used in endpoint paths.
    pub fn company_id(&self) -> u64 {
        *self.inner.config.upstream().company_id()
    }

    /// Metrics collector shared by all clones.
    pub fn metrics(&self) -> &MetricsCollector {
        &self.inner.metrics
    }

    /// Response cache shared by all clones.
    pub fn cache(&self) -> &SharedResponseCache {
        &self.inner.cache
    }

    /// General sliding-window limiter.
    pub fn window_limiter(&self) -> &SlidingWindowLimiter {
        &self.inner.window
    }

    /// Hot-path reservoir limiter.
    pub fn reservoir(&self) -> &ReservoirLimiter {
        &self.inner.reservoir
    }

    /// Start logging a metrics summary and health alarms every
    /// `metrics.report_interval_secs`, until `shutdown` fires.
    pub fn spawn_reporter(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.inner.metrics.spawn_reporter(shutdown)
    }

    /// Dispatch `request` and wrap the outcome in the uniform envelope.
    pub async fn dispatch(&self, request: RequestDescriptor) -> ApiResponse<JsonValue> {
        self.dispatch_with_cancel(request, CancellationToken::new())
            .await
    }

    /// Dispatch `request`, giving up when `cancel` fires.
    ///
    /// A cancelled or expired call returns a `Cancelled` or
    /// `DeadlineExceeded` failure. Work already dispatched upstream is not
    /// undone.
    pub async fn dispatch_with_cancel(
        &self,
        request: RequestDescriptor,
        cancel: CancellationToken,
    ) -> ApiResponse<JsonValue> {
        self.dispatch_checked(request, cancel, &accept_any).await
    }

    /// Dispatch with a payload check.
    ///
    /// Data rejected by `check` is never cached and counts as a failure.
    pub(crate) async fn dispatch_checked(
        &self,
        request: RequestDescriptor,
        cancel: CancellationToken,
        check: PayloadCheck<'_>,
    ) -> ApiResponse<JsonValue> {
        let operation = *request.operation();
        let span = info_span!(
            "dispatch",
            %operation,
            method = %request.method(),
            endpoint = %request.endpoint(),
            priority = %request.priority(),
        );

        async move {
            let started = Instant::now();
            let attempts = AtomicU32::new(0);
            let deadline = *request.deadline();

            let pipeline = AssertUnwindSafe(self.run(&request, &attempts, check)).catch_unwind();
            let guarded = async {
                pipeline.await.unwrap_or_else(|panic| {
                    let message = panic_message(panic);
                    warn!(%message, "Dispatch panicked");
                    ApiResponse::failure(UpstreamError::new(UpstreamErrorKind::Internal(message)))
                })
            };
            let bounded = async {
                match deadline {
                    Some(deadline) => tokio::time::timeout_at(deadline, guarded)
                        .await
                        .unwrap_or_else(|_| {
                            debug!("Deadline passed");
                            ApiResponse::failure(UpstreamError::new(
                                UpstreamErrorKind::DeadlineExceeded,
                            ))
                        }),
                    None => guarded.await,
                }
            };

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!("Dispatch cancelled");
                    ApiResponse::failure(UpstreamError::new(UpstreamErrorKind::Cancelled))
                }
                response = bounded => response,
            };

            self.record(
                operation,
                &response,
                attempts.load(Ordering::Relaxed),
                started.elapsed(),
            );
            response
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        request: &RequestDescriptor,
        attempts: &AtomicU32,
        check: PayloadCheck<'_>,
    ) -> ApiResponse<JsonValue> {
        let operation = *request.operation();

        let Some(ttl) = self.cache_ttl(request) else {
            let fetched = self.fetch(request, attempts).await;
            if fetched.is_ok() {
                self.invalidate_after(operation);
            }
            return match fetched.and_then(|(data, status)| check(&data).map(|()| (data, status))) {
                Ok((data, status)) => ApiResponse::ok(data, status),
                Err(e) => ApiResponse::failure(e),
            };
        };

        let key = cache_key(request);
        let status = AtomicU16::new(200);
        let status_ref = &status;
        let lookup = self
            .inner
            .cache
            .get_or_fetch(&key, ttl, move || async move {
                let (data, received) = self.fetch(request, attempts).await?;
                check(&data)?;
                status_ref.store(received, Ordering::Relaxed);
                Ok::<_, UpstreamError>(data)
            })
            .await;

        match lookup {
            Ok(Lookup::Hit(data)) => {
                debug!(%key, "Served from cache");
                ApiResponse::from_cache(data)
            }
            Ok(Lookup::Fetched(data)) => ApiResponse::ok(data, status.load(Ordering::Relaxed)),
            Err(e) => ApiResponse::failure(e),
        }
    }

    /// Network attempts with retry. Each attempt re-enters admission.
    async fn fetch(
        &self,
        request: &RequestDescriptor,
        attempts: &AtomicU32,
    ) -> Result<(JsonValue, u16), UpstreamError> {
        self.inner
            .retry
            .execute(|attempt| async move {
                attempts.store(attempt, Ordering::Relaxed);
                self.attempt(request, attempt).await
            })
            .await
    }

    async fn attempt(
        &self,
        request: &RequestDescriptor,
        attempt: u32,
    ) -> Result<(JsonValue, u16), UpstreamError> {
        let outcome = if request.operation().is_hot_path() {
            let permit = self.inner.reservoir.acquire().await;
            debug!(
                attempt,
                waited_ms = permit.waited().as_millis() as u64,
                in_flight = self.inner.reservoir.in_flight(),
                "Reservoir admitted"
            );
            self.inner.transport.send(request).await
        } else {
            let admission = self.inner.window.admit(*request.priority()).await;
            debug!(
                attempt,
                waited_ms = admission.waited.as_millis() as u64,
                in_window = admission.in_window,
                "Window admitted"
            );
            self.inner.transport.send(request).await
        };

        classify(outcome)
    }

    /// Cache lifetime for `request`, or `None` if it bypasses the cache.
    fn cache_ttl(&self, request: &RequestDescriptor) -> Option<Duration> {
        if request.operation().is_mutation() || *request.method() != Method::Get {
            return None;
        }
        request
            .ttl_override()
            .or_else(|| self.inner.config.ttl().ttl_for(*request.operation()))
            .filter(|ttl| !ttl.is_zero())
    }

    /// Drop cached reads a successful mutation has made stale.
    fn invalidate_after(&self, operation: Operation) {
        let prefixes: &[&str] = match operation {
            Operation::CreateBooking => &["/book_times", "/book_dates", "/records"],
            Operation::CreateClient => &["/clients"],
            _ => return,
        };

        let removed = self
            .inner
            .cache
            .invalidate(|key| prefixes.iter().any(|p| key.endpoint().starts_with(p)));
        debug!(%operation, removed, "Invalidated stale cache entries");
    }

    fn record(
        &self,
        operation: Operation,
        response: &ApiResponse<JsonValue>,
        attempts: u32,
        latency: Duration,
    ) {
        let metrics = &self.inner.metrics;
        if *response.cached() {
            metrics.record_cache_hit();
            return;
        }

        let error_kind = response.error().as_ref().map(|e| e.kind().label());
        metrics.record_operation(operation.into(), error_kind, latency);
        metrics.record_retries(attempts.saturating_sub(1));

        if let Some(error) = response.error() {
            warn!(%operation, attempts, error = %error.message(), "Dispatch failed");
        } else {
            debug!(
                %operation,
                attempts,
                latency_ms = latency.as_millis() as u64,
                "Dispatch succeeded"
            );
        }
    }
}

/// Cache key for a request: method, endpoint and sorted query parameters.
pub fn cache_key(request: &RequestDescriptor) -> CacheKey {
    CacheKey::new(
        request.method().as_str(),
        request.endpoint(),
        request.query().as_slice(),
    )
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
