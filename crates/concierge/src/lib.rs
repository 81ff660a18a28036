//! Concierge - mediating client for a quota-bound booking REST service
//!
//! Concierge sits between a chat assistant and a multi-tenant booking service
//! that enforces a strict hourly request quota. It keeps the assistant inside
//! that quota while keeping interactive latency low.
//!
//! # Features
//!
//! - **Two throttles**: an exact sliding window for the hourly budget and a
//!   reservoir with a concurrency cap for time-slot lookups
//! - **Retry**: exponential backoff with jitter, honouring `Retry-After`
//! - **Caching**: per-operation TTLs with bounded, insertion-ordered eviction
//! - **Typed failures**: business-rule rejections mapped to [`ValidationReason`]
//! - **Metrics**: rolling latency percentiles, success and cache-hit rates
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use concierge::{BookingClient, ClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = BookingClient::new(ClientConfig::load()?)?;
//!
//!     let slots = client.available_times(7, "2024-05-01", None).await;
//!     println!("{}", serde_json::to_string_pretty(&slots)?);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! Concierge is organized as a workspace with focused crates:
//!
//! - `concierge_error` - Error types and the validation sub-code catalog
//! - `concierge_rate_limit` - Sliding-window and reservoir limiters
//! - `concierge_cache` - TTL response cache
//! - `concierge_client` - Transport, retry, metrics and the dispatcher
//!
//! This crate (`concierge`) re-exports everything for convenience and ships
//! the `concierge` command-line tool.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod observability;

pub use concierge_cache::*;
pub use concierge_client::*;
pub use concierge_error::*;
pub use concierge_rate_limit::*;
pub use observability::{ObservabilityConfig, init_observability, init_observability_with_config};
