//! Error types for the Concierge booking API client.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! [`UpstreamError`] is the one callers see most: it is the failure half of
//! every operation envelope and carries the HTTP status, the business-rule
//! sub-code for 422 responses and whether the failure was retryable.
//!
//! # Examples
//!
//! ```
//! use concierge_error::{ConciergeResult, ConfigError};
//!
//! fn load() -> ConciergeResult<String> {
//!     Err(ConfigError::new("base_url is empty"))?
//! }
//!
//! match load() {
//!     Ok(url) => println!("Using {}", url),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod json;
mod upstream;
mod validation;

pub use config::ConfigError;
pub use error::{ConciergeError, ConciergeErrorKind, ConciergeResult};
pub use http::HttpError;
pub use json::JsonError;
pub use upstream::{RetryableError, UpstreamError, UpstreamErrorKind};
pub use validation::ValidationReason;
