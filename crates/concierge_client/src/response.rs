//! Uniform result envelope.

use concierge_error::UpstreamError;
use derive_getters::Getters;
use serde::Serialize;

/// Result of every client operation.
///
/// Normal failures are reported here rather than as a Rust error, so callers
/// always get a value they can branch on or forward as JSON.
#[derive(Debug, Clone, Serialize, Getters)]
pub struct ApiResponse<T> {
    /// Whether the operation succeeded
    success: bool,
    /// Payload on success
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    /// Failure on error
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<UpstreamError>,
    /// Upstream HTTP status, when one was received
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<u16>,
    /// Whether `data` came from the response cache
    cached: bool,
}

impl<T> ApiResponse<T> {
    /// Successful, freshly fetched response.
    pub fn ok(data: T, status: u16) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: Some(status),
            cached: false,
        }
    }

    /// Successful response served from cache.
    pub fn from_cache(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            status: None,
            cached: true,
        }
    }

    /// Failed response.
    pub fn failure(error: UpstreamError) -> Self {
        Self {
            success: false,
            data: None,
            status: error.status(),
            error: Some(error),
            cached: false,
        }
    }

    /// Convert into a `Result`, dropping the envelope metadata.
    pub fn into_result(self) -> Result<T, UpstreamError> {
        match (self.data, self.error) {
            (Some(data), None) => Ok(data),
            (_, Some(error)) => Err(error),
            (None, None) => Err(UpstreamError::new(
                concierge_error::UpstreamErrorKind::Internal(
                    "response carried neither data nor error".to_string(),
                ),
            )),
        }
    }

    /// Transform the payload, keeping the envelope.
    pub fn map<U, F>(self, f: F) -> ApiResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            status: self.status,
            cached: self.cached,
        }
    }

    /// Transform the payload with a fallible conversion.
    ///
    /// A failed conversion turns the envelope into a failure.
    pub fn and_then<U, F>(self, f: F) -> ApiResponse<U>
    where
        F: FnOnce(T) -> Result<U, UpstreamError>,
    {
        let (status, cached) = (self.status, self.cached);
        match self.into_result().and_then(f) {
            Ok(data) => ApiResponse {
                success: true,
                data: Some(data),
                error: None,
                status,
                cached,
            },
            Err(error) => ApiResponse::failure(error),
        }
    }
}
