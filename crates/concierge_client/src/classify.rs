//! Turning raw transport outcomes into data or a typed failure.
//!
//! A successful body of the form `{"success": true, "data": ...}` is unwrapped
//! to its `data`. Everything else becomes an [`UpstreamError`]:
//! - no response: `Network` (retryable)
//! - 422: `Validation`, with the business-rule sub-code looked up in
//!   [`ValidationReason`]
//! - any other non-2xx: `Upstream` with the status, message and any
//!   `Retry-After` hint
//! - a 2xx body that is not JSON: `Decode`

use crate::transport::{NoResponse, RawResponse, TransportOutcome};
use concierge_error::{UpstreamError, UpstreamErrorKind, ValidationReason};
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

/// Longest raw body quoted in an error message.
const MAX_QUOTED_BODY: usize = 200;

/// Classify one attempt.
///
/// Returns the unwrapped payload and status on success.
#[instrument(skip(outcome), level = "debug")]
pub fn classify(outcome: TransportOutcome) -> Result<(JsonValue, u16), UpstreamError> {
    match outcome {
        Err(no_response) => Err(classify_no_response(no_response)),
        Ok(response) if (200..300).contains(&response.status) => {
            let status = response.status;
            decode_success(response).map(|data| (data, status))
        }
        Ok(response) => Err(classify_status(response)),
    }
}

/// Failure without a response.
pub fn classify_no_response(no_response: NoResponse) -> UpstreamError {
    UpstreamError::new(UpstreamErrorKind::Network {
        message: no_response.message,
        timed_out: no_response.timed_out,
    })
}

/// Failure with a non-2xx response.
pub fn classify_status(response: RawResponse) -> UpstreamError {
    let body = serde_json::from_str::<JsonValue>(&response.body).ok();
    let message = body
        .as_ref()
        .and_then(extract_message)
        .unwrap_or_else(|| quote_body(&response.body));

    if response.status == 422 {
        let sub_code = body.as_ref().and_then(extract_sub_code);
        let reason = sub_code
            .map(ValidationReason::from_code)
            .unwrap_or(ValidationReason::Unrecognized);
        debug!(?sub_code, reason = reason.name(), "Classified validation failure");
        return UpstreamError::new(UpstreamErrorKind::Validation {
            sub_code,
            reason,
            message,
        });
    }

    debug!(status = response.status, "Classified error status");
    UpstreamError::new(UpstreamErrorKind::Upstream {
        status: response.status,
        message,
        retry_after: response.retry_after,
    })
}

fn decode_success(response: RawResponse) -> Result<JsonValue, UpstreamError> {
    if response.body.trim().is_empty() {
        return Ok(JsonValue::Null);
    }

    let body: JsonValue = serde_json::from_str(&response.body).map_err(|e| {
        UpstreamError::new(UpstreamErrorKind::Decode(format!(
            "{} (body: {})",
            e,
            quote_body(&response.body)
        )))
    })?;

    unwrap_envelope(body, response.status)
}

/// Strip the upstream `{"success": ..., "data": ...}` wrapper.
///
/// A 2xx body that reports `success: false` is treated as a terminal failure
/// with the received status.
pub fn unwrap_envelope(body: JsonValue, status: u16) -> Result<JsonValue, UpstreamError> {
    let JsonValue::Object(mut map) = body else {
        return Ok(body);
    };

    match map.get("success").and_then(JsonValue::as_bool) {
        Some(true) => Ok(map.remove("data").unwrap_or(JsonValue::Null)),
        Some(false) => {
            let body = JsonValue::Object(map);
            let message = extract_message(&body)
                .unwrap_or_else(|| "upstream reported success: false".to_string());
            Err(UpstreamError::new(UpstreamErrorKind::Upstream {
                status,
                message,
                retry_after: None,
            }))
        }
        None => Ok(JsonValue::Object(map)),
    }
}

/// Business-rule sub-code from `errors.code`, `meta.code` or `code`.
///
/// `errors` may be an object or a list; codes may be numbers or numeric
/// strings.
pub fn extract_sub_code(body: &JsonValue) -> Option<u32> {
    let errors = match body.get("errors") {
        Some(JsonValue::Array(list)) => list.first(),
        other => other,
    };

    [
        errors.and_then(|e| e.get("code")),
        body.get("meta").and_then(|m| m.get("code")),
        body.get("code"),
    ]
    .into_iter()
    .flatten()
    .find_map(code_value)
}

fn code_value(value: &JsonValue) -> Option<u32> {
    match value {
        JsonValue::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Upstream error message, if the body carries one.
pub fn extract_message(body: &JsonValue) -> Option<String> {
    let errors = match body.get("errors") {
        Some(JsonValue::Array(list)) => list.first(),
        other => other,
    };

    [
        body.get("meta").and_then(|m| m.get("message")),
        errors.and_then(|e| e.get("message")),
        body.get("message"),
        body.get("error"),
    ]
    .into_iter()
    .flatten()
    .find_map(|v| v.as_str().filter(|s| !s.is_empty()).map(str::to_string))
}

fn quote_body(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "empty body".to_string();
    }
    match body.char_indices().nth(MAX_QUOTED_BODY) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_success_envelope_is_unwrapped() {
        let body = json!({"success": true, "data": [{"id": 1}], "meta": []}).to_string();
        let (data, status) = classify(Ok(RawResponse::new(200, body))).unwrap();
        assert_eq!(status, 200);
        assert_eq!(data, json!([{"id": 1}]));
    }

    #[test]
    fn test_bare_body_passes_through() {
        let (data, _) = classify(Ok(RawResponse::new(201, r#"{"id": 9}"#))).unwrap();
        assert_eq!(data, json!({"id": 9}));
    }

    #[test]
    fn test_empty_success_body_is_null() {
        let (data, status) = classify(Ok(RawResponse::new(204, ""))).unwrap();
        assert_eq!(status, 204);
        assert!(data.is_null());
    }

    #[test]
    fn test_unreadable_success_body_is_decode_error() {
        let err = classify(Ok(RawResponse::new(200, "<html>"))).unwrap_err();
        assert!(matches!(err.kind(), UpstreamErrorKind::Decode(_)));
        assert!(!err.kind().is_retryable());
    }

    #[test]
    fn test_success_false_is_terminal() {
        let body = json!({"success": false, "meta": {"message": "Company not found"}});
        let err = classify(Ok(RawResponse::new(200, body.to_string()))).unwrap_err();
        assert_eq!(err.status(), Some(200));
        assert!(err.message().contains("Company not found"));
    }

    #[test]
    fn test_no_response_is_retryable_network() {
        let err = classify(Err(NoResponse::timeout("deadline elapsed"))).unwrap_err();
        assert_eq!(err.kind().label(), "timeout");
        assert!(err.kind().is_retryable());
    }

    #[test]
    fn test_422_sub_code_locations() {
        let bodies = [
            json!({"errors": {"code": 433, "message": "slot taken"}}),
            json!({"errors": [{"code": "433"}]}),
            json!({"meta": {"code": 433}}),
            json!({"code": 433}),
        ];
        for body in bodies {
            let err = classify_status(RawResponse::new(422, body.to_string()));
            assert_eq!(err.sub_code(), Some(433), "body: {body}");
            assert_eq!(err.validation_reason(), Some(ValidationReason::SlotUnavailable));
        }
    }

    #[test]
    fn test_422_unknown_code_keeps_number() {
        let err = classify_status(RawResponse::new(422, json!({"code": 999}).to_string()));
        assert_eq!(err.sub_code(), Some(999));
        assert_eq!(err.validation_reason(), Some(ValidationReason::Unrecognized));
    }

    #[test]
    fn test_422_without_body() {
        let err = classify_status(RawResponse::new(422, "Unprocessable"));
        assert_eq!(err.sub_code(), None);
        assert_eq!(err.status(), Some(422));
        assert!(err.message().contains("Unprocessable"));
    }

    #[test]
    fn test_retry_after_is_kept() {
        let response =
            RawResponse::new(429, "slow down").with_retry_after(Duration::from_secs(5));
        let err = classify_status(response);
        assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
        assert!(err.kind().is_retryable());
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let err = classify_status(RawResponse::new(500, "x".repeat(1000)));
        assert!(err.message().len() < 300);
    }
}
