//! Booking service records.
//!
//! Only the fields the assistant uses are typed. Unknown fields are ignored
//! and missing ones fall back to their defaults, so upstream additions do not
//! break decoding.

use derive_builder::Builder;
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Company (tenant) profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct Company {
    /// Company identifier
    id: u64,
    /// Display name
    title: String,
    /// Street address
    address: Option<String>,
    /// Contact phone
    phone: Option<String>,
    /// IANA timezone name
    timezone_name: Option<String>,
}

/// Bookable service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct Service {
    /// Service identifier
    id: u64,
    /// Display name
    title: String,
    /// Category identifier
    category_id: Option<u64>,
    /// Lowest price
    price_min: Option<f64>,
    /// Highest price
    price_max: Option<f64>,
    /// Duration (seconds)
    seance_length: Option<u64>,
}

/// Staff member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct StaffMember {
    /// Staff identifier
    id: u64,
    /// Display name
    name: String,
    /// Role or specialization
    specialization: Option<String>,
    /// Average rating
    rating: Option<f64>,
    /// Whether online booking is open for this person
    bookable: Option<bool>,
}

/// Dates with open slots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct AvailableDates {
    /// Dates (`YYYY-MM-DD`) with at least one bookable slot
    booking_dates: Vec<String>,
    /// Dates (`YYYY-MM-DD`) the company works
    working_dates: Vec<String>,
}

/// Bookable time slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct TimeSlot {
    /// Local time, e.g. `10:30`
    time: String,
    /// Slot length (seconds)
    seance_length: u64,
    /// ISO 8601 start
    datetime: String,
}

/// One appointment inside a booking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder, Getters)]
#[builder(setter(into))]
pub struct Appointment {
    /// Caller-chosen appointment number, echoed back by the service
    #[builder(default)]
    id: u64,
    /// Services to perform
    services: Vec<u64>,
    /// Staff member
    staff_id: u64,
    /// ISO 8601 start
    datetime: String,
}

impl Appointment {
    /// Creates a new builder for `Appointment`.
    pub fn builder() -> AppointmentBuilder {
        AppointmentBuilder::default()
    }
}

/// Booking to check or create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder, Getters)]
#[builder(setter(into))]
pub struct BookingRequest {
    /// Client phone
    phone: String,
    /// Client full name
    fullname: String,
    /// Client email
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    /// Free-text comment
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    /// Appointments to book
    appointments: Vec<Appointment>,
}

impl BookingRequest {
    /// Creates a new builder for `BookingRequest`.
    pub fn builder() -> BookingRequestBuilder {
        BookingRequestBuilder::default()
    }
}

/// Record created by a booking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct BookingConfirmation {
    /// Appointment number from the request
    id: u64,
    /// Created record identifier
    record_id: u64,
    /// Hash for client-side record links
    record_hash: String,
}

/// Existing booking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct Booking {
    /// Record identifier
    id: u64,
    /// Staff member
    staff_id: u64,
    /// ISO 8601 start
    datetime: String,
    /// Length (seconds)
    seance_length: u64,
    /// Free-text comment
    comment: Option<String>,
    /// Client, when the record carries one
    client: Option<Client>,
}

/// Filters for listing bookings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters, derive_setters::Setters)]
#[setters(prefix = "with_", strip_option)]
pub struct BookingQuery {
    /// First date (`YYYY-MM-DD`)
    #[setters(into)]
    start_date: Option<String>,
    /// Last date (`YYYY-MM-DD`)
    #[setters(into)]
    end_date: Option<String>,
    /// Staff member
    staff_id: Option<u64>,
    /// Client
    client_id: Option<u64>,
    /// Page number, starting at 1
    page: Option<u32>,
    /// Records per page
    count: Option<u32>,
}

impl BookingQuery {
    /// Query parameters for the listing endpoint.
    pub fn params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                params.push((key.to_string(), value));
            }
        };
        push("start_date", self.start_date.clone());
        push("end_date", self.end_date.clone());
        push("staff_id", self.staff_id.map(|v| v.to_string()));
        push("client_id", self.client_id.map(|v| v.to_string()));
        push("page", self.page.map(|v| v.to_string()));
        push("count", self.count.map(|v| v.to_string()));
        params
    }
}

/// Client (customer) record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct Client {
    /// Client identifier
    id: u64,
    /// Full name
    name: String,
    /// Phone
    phone: String,
    /// Email
    email: Option<String>,
}

/// Client to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder, Getters)]
#[builder(setter(into))]
pub struct NewClient {
    /// Full name
    name: String,
    /// Phone
    phone: String,
    /// Email
    #[builder(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl NewClient {
    /// Creates a new builder for `NewClient`.
    pub fn builder() -> NewClientBuilder {
        NewClientBuilder::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_fields_are_ignored() {
        let staff: StaffMember = serde_json::from_value(json!({
            "id": 7,
            "name": "Ada",
            "avatar": "https://example.test/a.png",
            "weight": 3
        }))
        .unwrap();
        assert_eq!(*staff.id(), 7);
        assert_eq!(staff.specialization(), &None);
    }

    #[test]
    fn test_booking_query_params_skip_unset() {
        let query = BookingQuery::default()
            .with_start_date("2024-05-01")
            .with_staff_id(3);
        assert_eq!(
            query.params(),
            vec![
                ("start_date".to_string(), "2024-05-01".to_string()),
                ("staff_id".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn test_booking_request_body_shape() {
        let request = BookingRequest::builder()
            .phone("+10000000000")
            .fullname("Ada Lovelace")
            .appointments(vec![
                Appointment::builder()
                    .services(vec![1u64])
                    .staff_id(2u64)
                    .datetime("2024-05-01T10:00:00")
                    .build()
                    .unwrap(),
            ])
            .build()
            .unwrap();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["appointments"][0]["staff_id"], 2);
        assert_eq!(body["appointments"][0]["id"], 0);
        assert!(body.get("email").is_none());
    }
}
