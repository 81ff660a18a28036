//! Mediating client for a quota-bound booking REST service.
//!
//! [`BookingClient`] sits between a chat assistant and the booking service.
//! Every call is:
//! - answered from a TTL cache when it is a repeatable read
//! - admitted by one of two throttles: a reservoir for time-slot lookups and
//!   a sliding window for everything else
//! - retried with exponential backoff on transient failures
//! - classified into a typed [`UpstreamError`] on failure
//! - returned as an [`ApiResponse`] envelope
//!
//! # Example
//!
//! ```no_run
//! use concierge_client::{BookingClient, ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BookingClient::new(ClientConfig::load()?)?;
//!
//! let slots = client.available_times(7, "2024-05-01", None).await;
//! match slots.error() {
//!     None => println!("{} slots", slots.data().as_ref().map_or(0, Vec::len)),
//!     Some(e) => eprintln!("lookup failed: {}", e.message()),
//! }
//!
//! println!("{:#?}", client.metrics().snapshot());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod classify;
mod config;
mod dispatcher;
mod endpoints;
mod metrics;
pub mod models;
mod request;
mod response;
mod retry;
mod transport;

pub use classify::{
    classify, classify_no_response, classify_status, extract_message, extract_sub_code,
    unwrap_envelope,
};
pub use config::{ClientConfig, MetricsConfig, RetryConfig, TtlTable, UpstreamConfig};
pub use dispatcher::{BookingClient, cache_key};
pub use endpoints::requests;
pub use metrics::{Alarm, ClientStats, MetricsCollector};
pub use request::{Method, Operation, RequestDescriptor, RequestDescriptorBuilder};
pub use response::ApiResponse;
pub use retry::{BackoffSchedule, RetryEngine, RetryOutcome};
pub use transport::{
    HttpTransport, NoResponse, RawResponse, Transport, TransportOutcome, parse_retry_after,
};

pub use concierge_cache::{CacheConfig, CacheKey, SharedResponseCache};
pub use concierge_error::{
    ConciergeError, ConciergeResult, RetryableError, UpstreamError, UpstreamErrorKind,
    ValidationReason,
};
pub use concierge_rate_limit::{Priority, ReservoirConfig, WindowConfig};
pub use tokio_util::sync::CancellationToken;
