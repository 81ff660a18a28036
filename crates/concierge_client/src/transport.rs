//! Network seam between the dispatcher and the booking service.
//!
//! The dispatcher only sees the [`Transport`] trait. Production code uses
//! [`HttpTransport`] on `reqwest`; tests substitute scripted transports.

use crate::{RequestDescriptor, UpstreamConfig};
use async_trait::async_trait;
use concierge_error::{ConciergeResult, ConfigError, HttpError};
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, RETRY_AFTER};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Response as received, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw body text
    pub body: String,
    /// Parsed `Retry-After` header
    pub retry_after: Option<Duration>,
}

impl RawResponse {
    /// Response with no `Retry-After` hint.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            retry_after: None,
        }
    }

    /// Attach a `Retry-After` hint.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

/// No response was received.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display)]
#[display("{}", message)]
pub struct NoResponse {
    /// What went wrong
    pub message: String,
    /// Whether the per-request timeout fired
    pub timed_out: bool,
}

impl NoResponse {
    /// Connection-level failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: false,
        }
    }

    /// Per-request timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timed_out: true,
        }
    }
}

/// Outcome of a single network attempt.
pub type TransportOutcome = Result<RawResponse, NoResponse>;

/// Sends one request and reports what came back.
///
/// Implementations never retry and never interpret the status; both are the
/// dispatcher's job.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single attempt.
    async fn send(&self, request: &RequestDescriptor) -> TransportOutcome;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    authorization: String,
    accept: String,
}

impl HttpTransport {
    /// Build a transport from connection settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the partner token is missing or the HTTP client
    /// cannot be constructed.
    #[instrument(skip(config), fields(base_url = %config.base_url()))]
    pub fn new(config: &UpstreamConfig) -> ConciergeResult<Self> {
        if config.partner_token().is_empty() {
            return Err(ConfigError::new("upstream.partner_token is required").into());
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .build()
            .map_err(|e| HttpError::new(format!("Failed to build HTTP client: {}", e)))?;

        debug!("Created HTTP transport");
        Ok(Self {
            client,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            authorization: config.authorization(),
            accept: config.accept().clone(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(
        skip(self, request),
        fields(method = %request.method(), endpoint = %request.endpoint())
    )]
    async fn send(&self, request: &RequestDescriptor) -> TransportOutcome {
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|e| NoResponse::network(format!("Invalid method: {}", e)))?;

        let mut builder = self
            .client
            .request(method, self.url(request.endpoint()))
            .header(AUTHORIZATION, &self.authorization)
            .header(ACCEPT, &self.accept);

        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(error = %e, "Request failed without a response");
            if e.is_timeout() {
                NoResponse::timeout(e.to_string())
            } else {
                NoResponse::network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                NoResponse::timeout(format!("Timed out reading body: {}", e))
            } else {
                NoResponse::network(format!("Failed to read body: {}", e))
            }
        })?;

        debug!(status, body_len = body.len(), "Received response");
        Ok(RawResponse {
            status,
            body,
            retry_after,
        })
    }
}

/// Read a `Retry-After` header given in seconds.
///
/// HTTP-date values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_parse_retry_after_ignores_dates() {
        let mut headers = HeaderMap::new();
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_url_join() {
        let config = UpstreamConfig::default()
            .with_base_url("https://example.test/api/v1/")
            .with_partner_token("p");
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.url("/company/1"),
            "https://example.test/api/v1/company/1"
        );
    }

    #[test]
    fn test_missing_token_rejected() {
        assert!(HttpTransport::new(&UpstreamConfig::default()).is_err());
    }
}
