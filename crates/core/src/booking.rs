//! Passenger, flight and booking records.
//!
//! These are replaced wholesale on every successful retrieval; nothing
//! here is patched in place except through a full replacement in the
//! [`AppStore`](crate::store::AppStore).

use std::fmt;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;
use crate::types::LocalTimestamp;

/// Length of a booking reference.
pub const PNR_LENGTH: usize = 6;

/// A passenger name record (booking reference).
///
/// Always six ASCII alphanumeric characters, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pnr(String);

impl Pnr {
    /// Trim, uppercase and validate a raw booking reference.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let normalized = raw.trim().to_ascii_uppercase();
        if !is_valid_pnr(&normalized) {
            return Err(CoreError::InvalidPnr(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Wrap a reference fixed at compile time, such as a demo constant.
    ///
    /// Skips the runtime check; debug builds still assert the format.
    pub fn from_static(code: &'static str) -> Self {
        debug_assert!(is_valid_pnr(code), "malformed static PNR {code:?}");
        Self(code.to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid_pnr(code: &str) -> bool {
    code.len() == PNR_LENGTH && code.chars().all(|c| c.is_ascii_alphanumeric())
}

impl fmt::Display for Pnr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Pnr {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Pnr::parse(&value)
    }
}

impl From<Pnr> for String {
    fn from(pnr: Pnr) -> Self {
        pnr.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Passenger {
    /// Opaque identifier issued by the booking service.
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub loyalty_points: u64,
}

/// IATA-style airport reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airport {
    pub code: String,
    pub city: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flight {
    pub id: String,
    pub flight_number: String,
    pub origin: Airport,
    pub destination: Airport,
    pub departure_time: LocalTimestamp,
    pub arrival_time: LocalTimestamp,
    /// The only live field in this model; pushed changes arrive over
    /// the notification channel.
    #[serde(default)]
    pub boarding_gate: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
    Flown,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub pnr: Pnr,
    pub status: BookingStatus,
    pub flight: Flight,
}

/// Input to a booking retrieval, normalised and validated before any
/// network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct RetrieveBookingRequest {
    #[validate(custom(function = "validate_pnr"))]
    pub pnr: String,
    #[validate(length(min = 1, message = "last name is required"))]
    pub last_name: String,
}

impl RetrieveBookingRequest {
    /// Trim both fields, uppercase the PNR, then validate.
    pub fn new(pnr: &str, last_name: &str) -> Result<Self, CoreError> {
        let request = Self {
            pnr: pnr.trim().to_ascii_uppercase(),
            last_name: last_name.trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }
}

fn validate_pnr(value: &str) -> Result<(), ValidationError> {
    Pnr::parse(value).map(|_| ()).map_err(|_| {
        let mut err = ValidationError::new("pnr");
        err.message = Some("booking reference must be 6 letters or digits".into());
        err
    })
}
