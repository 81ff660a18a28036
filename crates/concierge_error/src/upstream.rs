//! Upstream call failures and retry classification.
//!
//! Every outcome of a call to the booking service that is not a success is
//! expressed as an [`UpstreamError`]. The kind says what went wrong; the
//! wrapper records where the error was created.
//!
//! Rate-limit waits are deliberately absent: they surface as latency, never
//! as an error.

use crate::ValidationReason;
use serde::{Serialize, Serializer};
use std::time::Duration;

/// Upstream failure conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum UpstreamErrorKind {
    /// No response was received (connect failure, reset, timeout)
    #[display("No response from upstream: {}", message)]
    Network {
        /// Transport error description
        message: String,
        /// Whether the per-request timeout fired
        timed_out: bool,
    },
    /// Response received with a non-2xx status
    #[display("HTTP {} error: {}", status, message)]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Upstream error message (or raw body)
        message: String,
        /// Server-supplied `Retry-After` hint
        retry_after: Option<Duration>,
    },
    /// HTTP 422 with a business-rule sub-code
    #[display("Validation failed: {} ({})", reason, message)]
    Validation {
        /// Upstream sub-code, when the body carried one
        sub_code: Option<u32>,
        /// Catalog entry for the sub-code
        reason: ValidationReason,
        /// Upstream message
        message: String,
    },
    /// Response body could not be decoded
    #[display("Failed to decode upstream response: {}", _0)]
    Decode(String),
    /// Caller deadline passed before the call completed
    #[display("Deadline exceeded")]
    DeadlineExceeded,
    /// Caller cancelled the call
    #[display("Request cancelled")]
    Cancelled,
    /// Fault inside the client itself
    #[display("Internal client error: {}", _0)]
    Internal(String),
}

impl UpstreamErrorKind {
    /// Check if this error type should be retried.
    ///
    /// No response at all, request timeout, throttling and gateway/server
    /// failures are transient. Every other status, including 422, is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            UpstreamErrorKind::Network { .. } => true,
            UpstreamErrorKind::Upstream { status, .. } => {
                matches!(*status, 408 | 429 | 500 | 502 | 503 | 504)
            }
            _ => false,
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamErrorKind::Upstream { status, .. } => Some(*status),
            UpstreamErrorKind::Validation { .. } => Some(422),
            _ => None,
        }
    }

    /// Short label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            UpstreamErrorKind::Network { timed_out: true, .. } => "timeout",
            UpstreamErrorKind::Network { .. } => "network",
            UpstreamErrorKind::Upstream { status: 429, .. } => "rate_limit",
            UpstreamErrorKind::Upstream { status: 401 | 403, .. } => "auth",
            UpstreamErrorKind::Upstream { status, .. } if *status >= 500 => "server",
            UpstreamErrorKind::Upstream { .. } => "client",
            UpstreamErrorKind::Validation { .. } => "validation",
            UpstreamErrorKind::Decode(_) => "decode",
            UpstreamErrorKind::DeadlineExceeded => "deadline",
            UpstreamErrorKind::Cancelled => "cancelled",
            UpstreamErrorKind::Internal(_) => "internal",
        }
    }
}

/// Upstream error with source location tracking.
///
/// # Examples
///
/// ```
/// use concierge_error::{RetryableError, UpstreamError, UpstreamErrorKind};
///
/// let err = UpstreamError::new(UpstreamErrorKind::Upstream {
///     status: 503,
///     message: "Service unavailable".to_string(),
///     retry_after: None,
/// });
/// assert!(err.is_retryable());
/// assert_eq!(err.status(), Some(503));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Upstream Error: {} at line {} in {}", kind, line, file)]
pub struct UpstreamError {
    /// The kind of error that occurred
    pub kind: UpstreamErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl UpstreamError {
    /// Create a new UpstreamError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: UpstreamErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &UpstreamErrorKind {
        &self.kind
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        self.kind.status()
    }

    /// Business-rule sub-code for validation failures.
    pub fn sub_code(&self) -> Option<u32> {
        match &self.kind {
            UpstreamErrorKind::Validation { sub_code, .. } => *sub_code,
            _ => None,
        }
    }

    /// Catalog entry for validation failures.
    pub fn validation_reason(&self) -> Option<ValidationReason> {
        match &self.kind {
            UpstreamErrorKind::Validation { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// Server-supplied retry hint.
    pub fn retry_after(&self) -> Option<Duration> {
        match &self.kind {
            UpstreamErrorKind::Upstream { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Human-readable description without the source location.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl Serialize for UpstreamError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire<'a> {
            kind: &'static str,
            message: String,
            #[serde(skip_serializing_if = "Option::is_none")]
            status: Option<u16>,
            #[serde(skip_serializing_if = "Option::is_none")]
            sub_code: Option<u32>,
            #[serde(skip_serializing_if = "Option::is_none")]
            reason: Option<&'a ValidationReason>,
            retryable: bool,
        }

        let reason = match &self.kind {
            UpstreamErrorKind::Validation { reason, .. } => Some(reason),
            _ => None,
        };
        Wire {
            kind: self.kind.label(),
            message: self.message(),
            status: self.status(),
            sub_code: self.sub_code(),
            reason,
            retryable: self.is_retryable(),
        }
        .serialize(serializer)
    }
}

/// Trait for errors that support retry logic.
///
/// # Examples
///
/// ```
/// use concierge_error::{RetryableError, UpstreamError, UpstreamErrorKind};
///
/// let err = UpstreamError::new(UpstreamErrorKind::Upstream {
///     status: 404,
///     message: "Not found".to_string(),
///     retry_after: None,
/// });
/// assert!(!err.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;

    /// Server-requested delay before the next attempt, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl RetryableError for UpstreamError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn retry_after(&self) -> Option<Duration> {
        UpstreamError::retry_after(self)
    }
}
