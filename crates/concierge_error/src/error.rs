//! Top-level error wrapper types.

use crate::{ConfigError, HttpError, JsonError, UpstreamError};

/// Every error the Concierge crates can produce.
///
/// # Examples
///
/// ```
/// use concierge_error::{ConciergeError, ConfigError};
///
/// let config_err = ConfigError::new("missing company_id");
/// let err: ConciergeError = config_err.into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum ConciergeErrorKind {
    /// HTTP client construction error
    #[from(HttpError)]
    Http(HttpError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Failed upstream call
    #[from(UpstreamError)]
    Upstream(UpstreamError),
}

/// Concierge error with kind discrimination.
///
/// # Examples
///
/// ```
/// use concierge_error::{ConciergeResult, ConfigError};
///
/// fn might_fail() -> ConciergeResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// assert!(might_fail().is_err());
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Concierge Error: {}", _0)]
pub struct ConciergeError(Box<ConciergeErrorKind>);

impl ConciergeError {
    /// Create a new error from a kind.
    pub fn new(kind: ConciergeErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &ConciergeErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to ConciergeErrorKind
impl<T> From<T> for ConciergeError
where
    T: Into<ConciergeErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Concierge operations.
pub type ConciergeResult<T> = std::result::Result<T, ConciergeError>;
