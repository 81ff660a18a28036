//! Request throttling for the booking service.
//!
//! The upstream enforces a hard hourly request quota. Two independent
//! limiters protect it:
//!
//! - [`SlidingWindowLimiter`] counts every general dispatch inside a trailing
//!   window and spaces consecutive dispatches apart.
//! - [`ReservoirLimiter`] throttles the availability hot path with its own
//!   refilling budget, spacing and concurrency cap.
//!
//! They are kept separate on purpose: one protects the aggregate ceiling,
//! the other bounds bursts of a single operation. Neither knows about the
//! other, and there is no fairness between their queues.

#![warn(missing_docs)]

mod config;
mod error;
mod priority;
mod reservoir;
mod window;

pub use config::{ReservoirConfig, ReservoirConfigBuilder, WindowConfig, WindowConfigBuilder};
pub use error::{RateLimitError, RateLimitErrorKind};
pub use priority::Priority;
pub use reservoir::{ReservoirLimiter, ReservoirPermit};
pub use window::{Admission, SlidingWindowLimiter};
