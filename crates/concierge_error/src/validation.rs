//! Catalog of upstream business-rule violations reported with HTTP 422.
//!
//! The booking service attaches a numeric sub-code to validation failures.
//! [`ValidationReason::from_code`] maps the codes we know about to a
//! business-meaningful reason; anything else is kept as [`ValidationReason::Unrecognized`]
//! so callers still see the raw number.

use serde::{Deserialize, Serialize};

/// Business-rule violation reported by the booking service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ValidationReason {
    /// The client is on the company's restricted list
    #[display("client is on a restricted list")]
    ClientBlacklisted,
    /// Someone else booked the slot first
    #[display("requested time slot is no longer available")]
    SlotUnavailable,
    /// The client already has an overlapping appointment
    #[display("scheduling conflict with an existing appointment")]
    SchedulingConflict,
    /// Staff member does not work at the requested time
    #[display("staff member is not available at the requested time")]
    StaffUnavailable,
    /// Staff member does not provide the requested service
    #[display("service is not provided by the selected staff member")]
    ServiceNotProvided,
    /// Requested time is outside the company's working hours
    #[display("requested time is outside working hours")]
    OutsideWorkingHours,
    /// Booking is too soon or too far ahead
    #[display("requested time is outside the online booking window")]
    BookingWindowClosed,
    /// Phone number rejected by the upstream
    #[display("client phone number is invalid")]
    InvalidPhone,
    /// Booking limit per client reached
    #[display("client has reached the booking limit")]
    BookingLimitReached,
    /// Sub-code missing from the catalog
    #[display("unrecognized validation failure")]
    Unrecognized,
}

impl ValidationReason {
    /// Map an upstream sub-code to a reason.
    ///
    /// # Examples
    ///
    /// ```
    /// use concierge_error::ValidationReason;
    ///
    /// assert_eq!(ValidationReason::from_code(433), ValidationReason::SlotUnavailable);
    /// assert_eq!(ValidationReason::from_code(9999), ValidationReason::Unrecognized);
    /// ```
    pub fn from_code(code: u32) -> Self {
        match code {
            432 => ValidationReason::ClientBlacklisted,
            433 => ValidationReason::SlotUnavailable,
            434 => ValidationReason::SchedulingConflict,
            435 => ValidationReason::StaffUnavailable,
            436 => ValidationReason::ServiceNotProvided,
            437 => ValidationReason::OutsideWorkingHours,
            438 => ValidationReason::BookingWindowClosed,
            439 => ValidationReason::InvalidPhone,
            440 => ValidationReason::BookingLimitReached,
            _ => ValidationReason::Unrecognized,
        }
    }

    /// The upstream sub-code for this reason, if it has one.
    pub fn code(&self) -> Option<u32> {
        match self {
            ValidationReason::ClientBlacklisted => Some(432),
            ValidationReason::SlotUnavailable => Some(433),
            ValidationReason::SchedulingConflict => Some(434),
            ValidationReason::StaffUnavailable => Some(435),
            ValidationReason::ServiceNotProvided => Some(436),
            ValidationReason::OutsideWorkingHours => Some(437),
            ValidationReason::BookingWindowClosed => Some(438),
            ValidationReason::InvalidPhone => Some(439),
            ValidationReason::BookingLimitReached => Some(440),
            ValidationReason::Unrecognized => None,
        }
    }

    /// Stable snake_case name, used as a metrics label.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_codes_round_trip_through_catalog() {
        for reason in ValidationReason::iter() {
            if let Some(code) = reason.code() {
                assert_eq!(ValidationReason::from_code(code), reason);
            }
        }
    }

    #[test]
    fn test_name_is_snake_case() {
        assert_eq!(ValidationReason::SlotUnavailable.name(), "slot_unavailable");
    }
}
