//! HTTP client construction errors.

/// HTTP error wrapping reqwest client failures with source location.
///
/// Request-level failures are classified into [`UpstreamError`](crate::UpstreamError);
/// this type covers problems building the client itself.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("HTTP Error: {} at line {} in {}", message, line, file)]
pub struct HttpError {
    /// The underlying error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl HttpError {
    /// Create a new HttpError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use concierge_error::HttpError;
    ///
    /// let err = HttpError::new("invalid header value");
    /// assert!(err.message.contains("invalid header"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
