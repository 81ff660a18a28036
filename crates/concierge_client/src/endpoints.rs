//! Typed wrappers for the booking service endpoints.
//!
//! Each wrapper builds its [`RequestDescriptor`] with a function in
//! [`requests`], dispatches it and decodes the payload. Callers that need a
//! custom TTL, priority or deadline can build the descriptor themselves,
//! adjust it, and pass it to [`BookingClient::dispatch_as`].

use crate::models::{
    AvailableDates, Booking, BookingConfirmation, BookingQuery, BookingRequest, Client, Company,
    NewClient, Service, StaffMember, TimeSlot,
};
use crate::{ApiResponse, BookingClient, CancellationToken, RequestDescriptor};
use concierge_error::{UpstreamError, UpstreamErrorKind};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::instrument;

/// Descriptor constructors for every endpoint.
pub mod requests {
    use crate::models::{BookingQuery, BookingRequest, NewClient};
    use crate::{Operation, RequestDescriptor};
    use serde_json::json;

    /// `GET /company/{id}`
    pub fn company(company_id: u64) -> RequestDescriptor {
        RequestDescriptor::get(Operation::CompanyProfile, format!("/company/{company_id}"))
    }

    /// `GET /book_services/{id}`
    pub fn services(company_id: u64) -> RequestDescriptor {
        RequestDescriptor::get(Operation::Services, format!("/book_services/{company_id}"))
    }

    /// `GET /book_staff/{id}`, optionally limited to one service.
    pub fn staff(company_id: u64, service_id: Option<u64>) -> RequestDescriptor {
        let request = RequestDescriptor::get(Operation::Staff, format!("/book_staff/{company_id}"));
        match service_id {
            Some(id) => request.with_param("service_ids[]", id),
            None => request,
        }
    }

    /// `GET /book_dates/{id}`
    pub fn available_dates(
        company_id: u64,
        staff_id: Option<u64>,
        service_id: Option<u64>,
    ) -> RequestDescriptor {
        let mut request =
            RequestDescriptor::get(Operation::AvailableDates, format!("/book_dates/{company_id}"));
        if let Some(id) = staff_id {
            request = request.with_param("staff_id", id);
        }
        if let Some(id) = service_id {
            request = request.with_param("service_ids[]", id);
        }
        request
    }

    /// `GET /book_times/{id}/{staff}/{date}`
    ///
    /// `date` is percent-encoded, so it always stays one path segment.
    pub fn available_times(
        company_id: u64,
        staff_id: u64,
        date: &str,
        service_id: Option<u64>,
    ) -> RequestDescriptor {
        let request = RequestDescriptor::get(
            Operation::AvailableTimes,
            format!(
                "/book_times/{company_id}/{staff_id}/{}",
                urlencoding::encode(date)
            ),
        );
        match service_id {
            Some(id) => request.with_param("service_ids[]", id),
            None => request,
        }
    }

    /// `POST /book_check/{id}`
    pub fn validate_booking(company_id: u64, booking: &BookingRequest) -> RequestDescriptor {
        RequestDescriptor::post(
            Operation::ValidateBooking,
            format!("/book_check/{company_id}"),
            json!({ "appointments": booking.appointments() }),
        )
    }

    /// `POST /book_record/{id}`
    pub fn create_booking(company_id: u64, booking: &BookingRequest) -> RequestDescriptor {
        RequestDescriptor::post(
            Operation::CreateBooking,
            format!("/book_record/{company_id}"),
            json!(booking),
        )
    }

    /// `GET /records/{id}`
    pub fn list_bookings(company_id: u64, query: &BookingQuery) -> RequestDescriptor {
        query.params().into_iter().fold(
            RequestDescriptor::get(Operation::ListBookings, format!("/records/{company_id}")),
            |request, (key, value)| request.with_param(key, value),
        )
    }

    /// `GET /clients/{id}` filtered by phone or name.
    pub fn search_clients(company_id: u64, phone: Option<&str>, name: Option<&str>) -> RequestDescriptor {
        let mut request =
            RequestDescriptor::get(Operation::SearchClients, format!("/clients/{company_id}"));
        if let Some(phone) = phone {
            request = request.with_param("phone", phone);
        }
        if let Some(name) = name {
            request = request.with_param("fullname", name);
        }
        request
    }

    /// `POST /clients/{id}`
    pub fn create_client(company_id: u64, client: &NewClient) -> RequestDescriptor {
        RequestDescriptor::post(
            Operation::CreateClient,
            format!("/clients/{company_id}"),
            json!(client),
        )
    }
}

impl BookingClient {
    /// Dispatch `request` and decode the payload as `T`.
    ///
    /// A payload that does not decode is a `Decode` failure and is not
    /// cached.
    pub async fn dispatch_as<T>(&self, request: RequestDescriptor) -> ApiResponse<T>
    where
        T: DeserializeOwned,
    {
        self.dispatch_decoded(request, decode::<T>).await
    }

    async fn dispatch_decoded<T, F>(&self, request: RequestDescriptor, decoder: F) -> ApiResponse<T>
    where
        F: Fn(&JsonValue) -> Result<T, UpstreamError> + Send + Sync,
    {
        let check = |data: &JsonValue| decoder(data).map(|_| ());
        self.dispatch_checked(request, CancellationToken::new(), &check)
            .await
            .and_then(|data| decoder(&data))
    }

    /// Company profile.
    #[instrument(skip(self))]
    pub async fn company(&self) -> ApiResponse<Company> {
        self.dispatch_as(requests::company(self.company_id())).await
    }

    /// Service catalog.
    #[instrument(skip(self))]
    pub async fn services(&self) -> ApiResponse<Vec<Service>> {
        self.dispatch_decoded(requests::services(self.company_id()), |data| {
            decode(list_field(data, "services"))
        })
        .await
    }

    /// Staff roster, optionally limited to those performing `service_id`.
    #[instrument(skip(self))]
    pub async fn staff(&self, service_id: Option<u64>) -> ApiResponse<Vec<StaffMember>> {
        self.dispatch_as(requests::staff(self.company_id(), service_id))
            .await
    }

    /// Dates with open slots.
    #[instrument(skip(self))]
    pub async fn available_dates(
        &self,
        staff_id: Option<u64>,
        service_id: Option<u64>,
    ) -> ApiResponse<AvailableDates> {
        self.dispatch_as(requests::available_dates(
            self.company_id(),
            staff_id,
            service_id,
        ))
        .await
    }

    /// Open time slots for `staff_id` on `date` (`YYYY-MM-DD`).
    #[instrument(skip(self))]
    pub async fn available_times(
        &self,
        staff_id: u64,
        date: &str,
        service_id: Option<u64>,
    ) -> ApiResponse<Vec<TimeSlot>> {
        self.dispatch_as(requests::available_times(
            self.company_id(),
            staff_id,
            date,
            service_id,
        ))
        .await
    }

    /// Check that a booking would be accepted, without creating it.
    ///
    /// Business-rule rejections come back as a `Validation` failure.
    #[instrument(skip(self, booking))]
    pub async fn validate_booking(&self, booking: &BookingRequest) -> ApiResponse<JsonValue> {
        self.dispatch(requests::validate_booking(self.company_id(), booking))
            .await
    }

    /// Create a booking.
    #[instrument(skip(self, booking))]
    pub async fn create_booking(
        &self,
        booking: &BookingRequest,
    ) -> ApiResponse<Vec<BookingConfirmation>> {
        self.dispatch_as(requests::create_booking(self.company_id(), booking))
            .await
    }

    /// Existing bookings matching `query`.
    #[instrument(skip(self))]
    pub async fn list_bookings(&self, query: &BookingQuery) -> ApiResponse<Vec<Booking>> {
        self.dispatch_as(requests::list_bookings(self.company_id(), query))
            .await
    }

    /// Clients matching a phone number or name.
    #[instrument(skip(self))]
    pub async fn search_clients(
        &self,
        phone: Option<&str>,
        name: Option<&str>,
    ) -> ApiResponse<Vec<Client>> {
        self.dispatch_as(requests::search_clients(self.company_id(), phone, name))
            .await
    }

    /// Create a client record.
    #[instrument(skip(self, client))]
    pub async fn create_client(&self, client: &NewClient) -> ApiResponse<Client> {
        self.dispatch_as(requests::create_client(self.company_id(), client))
            .await
    }
}

fn decode<T: DeserializeOwned>(data: &JsonValue) -> Result<T, UpstreamError> {
    T::deserialize(data).map_err(|e| {
        UpstreamError::new(UpstreamErrorKind::Decode(format!(
            "Unexpected payload shape: {}",
            e
        )))
    })
}

/// Some listings arrive as `{"<field>": [...], ...}` rather than a bare list.
fn list_field<'a>(data: &'a JsonValue, field: &str) -> &'a JsonValue {
    data.get(field).unwrap_or(data)
}
