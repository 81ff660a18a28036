//! Request descriptors.
//!
//! A [`RequestDescriptor`] is built once per logical call and describes
//! everything the dispatcher needs: which operation it is (this selects the
//! cache lifetime and the limiter), how to reach the endpoint, and the
//! caller's priority and deadline.

use concierge_rate_limit::Priority;
use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::time::Instant;

/// Logical operations exposed by the booking service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Operation {
    /// Company profile
    CompanyProfile,
    /// Service catalog
    Services,
    /// Staff roster
    Staff,
    /// Bookable dates
    AvailableDates,
    /// Bookable time slots for one staff member on one date (hot path)
    AvailableTimes,
    /// Dry-run booking check
    ValidateBooking,
    /// Booking creation
    CreateBooking,
    /// Booking listing
    ListBookings,
    /// Client search
    SearchClients,
    /// Client creation
    CreateClient,
    /// Any other endpoint
    Custom,
}

impl Operation {
    /// Whether this operation goes through the reservoir limiter.
    pub fn is_hot_path(self) -> bool {
        matches!(self, Operation::AvailableTimes)
    }

    /// Whether this operation changes upstream state.
    pub fn is_mutation(self) -> bool {
        matches!(
            self,
            Operation::ValidateBooking | Operation::CreateBooking | Operation::CreateClient
        )
    }
}

/// HTTP method of a request.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Method {
    /// GET
    #[default]
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl Method {
    /// Method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// One logical call to the booking service.
///
/// # Example
///
/// ```
/// use concierge_client::{Method, Operation, RequestDescriptor};
///
/// let request = RequestDescriptor::builder()
///     .operation(Operation::ListBookings)
///     .endpoint("/records/42")
///     .query(vec![("start_date".to_string(), "2024-05-01".to_string())])
///     .build()
///     .unwrap();
/// assert_eq!(*request.method(), Method::Get);
/// ```
#[derive(Debug, Clone, Builder, Getters)]
#[builder(setter(into))]
pub struct RequestDescriptor {
    /// Logical operation
    operation: Operation,
    /// HTTP method
    #[builder(default)]
    method: Method,
    /// Path relative to the API root, e.g. `/company/42`
    endpoint: String,
    /// Query parameters
    #[builder(default)]
    query: Vec<(String, String)>,
    /// JSON body for mutations
    #[builder(default, setter(strip_option))]
    body: Option<JsonValue>,
    /// Caller priority (logged only)
    #[builder(default)]
    priority: Priority,
    /// Cache lifetime replacing the operation's default
    #[builder(default, setter(strip_option))]
    ttl_override: Option<Duration>,
    /// Instant after which the call gives up
    #[builder(default, setter(strip_option))]
    deadline: Option<Instant>,
}

impl RequestDescriptor {
    /// Creates a new builder for `RequestDescriptor`.
    pub fn builder() -> RequestDescriptorBuilder {
        RequestDescriptorBuilder::default()
    }

    /// Shorthand for a GET without parameters.
    pub fn get(operation: Operation, endpoint: impl Into<String>) -> Self {
        Self {
            operation,
            method: Method::Get,
            endpoint: endpoint.into(),
            query: Vec::new(),
            body: None,
            priority: Priority::default(),
            ttl_override: None,
            deadline: None,
        }
    }

    /// Shorthand for a POST carrying `body`.
    pub fn post(operation: Operation, endpoint: impl Into<String>, body: JsonValue) -> Self {
        Self {
            method: Method::Post,
            body: Some(body),
            ..Self::get(operation, endpoint)
        }
    }

    /// Append a query parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Set the caller priority.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Override the cache lifetime for this call.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_override = Some(ttl);
        self
    }

    /// Give up at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Give up `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_only_time_slots_are_hot_path() {
        let hot: Vec<_> = Operation::iter().filter(|op| op.is_hot_path()).collect();
        assert_eq!(hot, vec![Operation::AvailableTimes]);
    }

    #[test]
    fn test_mutations_are_not_hot_path() {
        for op in Operation::iter().filter(|op| op.is_mutation()) {
            assert!(!op.is_hot_path(), "{op} should not be hot path");
        }
    }

    #[test]
    fn test_post_shorthand() {
        let request = RequestDescriptor::post(
            Operation::CreateClient,
            "/clients/1",
            serde_json::json!({"name": "Ada"}),
        )
        .with_param("notify", true);

        assert_eq!(*request.method(), Method::Post);
        assert_eq!(request.method().as_str(), "POST");
        assert_eq!(request.query(), &vec![("notify".to_string(), "true".to_string())]);
        assert!(request.body().is_some());
    }
}
