//! In-process booking service fake.
//!
//! Serves one demo passenger and booking. The boarding gate is mutable
//! so a pushed gate change is visible to the next retrieval, which is
//! how the notification pipeline's refresh step is exercised without a
//! backend.

use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use gatewatch_core::booking::{Airport, Booking, BookingStatus, Flight, Passenger, Pnr};
use gatewatch_core::types::LocalTimestamp;

use crate::service::{
    BookingService, BookingServiceError, ChannelSession, CreateSessionRequest, RetrievedBooking,
};

pub const DEMO_PASSENGER_ID: &str = "6e6e6cf1-9e50-4a4e-9d8b-3aa8b4c4e3a1";
pub const DEMO_PNR: &str = "AB12CD";
pub const DEMO_LAST_NAME: &str = "Nightingale";
pub const DEMO_FLIGHT_ID: &str = "2f3d2e21-9b6f-4a8a-88d2-24d8704fe2b0";
pub const DEMO_FLIGHT_NUMBER: &str = "VA801";
pub const DEMO_INITIAL_GATE: &str = "12";

const DEMO_SESSION_ID: &str = "00000000-0000-0000-0000-000000000001";
const DEMO_HEARTBEAT_SECS: u64 = 25;

/// Melbourne daylight time, UTC+11.
const DEMO_UTC_OFFSET_SECS: i32 = 11 * 3600;
/// 2026-01-21 09:15 and 10:40 Melbourne time.
const DEMO_DEPARTURE_UNIX: i64 = 1_768_947_300;
const DEMO_ARRIVAL_UNIX: i64 = 1_768_952_400;

/// Nothing listens here: the channel fails to connect and degrades to
/// the simulated event.
const DEMO_CHANNEL_URL: &str =
    "ws://localhost:0/ws/v1/notifications?sessionId=00000000-0000-0000-0000-000000000001";

pub struct FixtureBookingService {
    gate: RwLock<String>,
    channel_url: String,
}

impl FixtureBookingService {
    pub fn new() -> Self {
        Self {
            gate: RwLock::new(DEMO_INITIAL_GATE.to_string()),
            channel_url: DEMO_CHANNEL_URL.to_string(),
        }
    }

    /// Point issued session descriptors at a different channel URL.
    pub fn with_channel_url(mut self, channel_url: impl Into<String>) -> Self {
        self.channel_url = channel_url.into();
        self
    }

    pub fn with_gate(self, gate: &str) -> Self {
        self.set_gate(gate);
        self
    }

    pub fn gate(&self) -> String {
        self.gate
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_gate(&self, gate: &str) {
        *self
            .gate
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = gate.to_string();
    }

    pub fn passenger(&self) -> Passenger {
        Passenger {
            id: DEMO_PASSENGER_ID.to_string(),
            first_name: "Joe".to_string(),
            last_name: DEMO_LAST_NAME.to_string(),
            loyalty_points: 48_399,
        }
    }

    /// The demo booking as it currently stands, gate included.
    pub fn booking(&self) -> Booking {
        Booking {
            pnr: Pnr::from_static(DEMO_PNR),
            status: BookingStatus::Confirmed,
            flight: Flight {
                id: DEMO_FLIGHT_ID.to_string(),
                flight_number: DEMO_FLIGHT_NUMBER.to_string(),
                origin: Airport {
                    code: "MEL".to_string(),
                    city: "Melbourne".to_string(),
                    country: "Australia".to_string(),
                },
                destination: Airport {
                    code: "SYD".to_string(),
                    city: "Sydney".to_string(),
                    country: "Australia".to_string(),
                },
                departure_time: melbourne_time(DEMO_DEPARTURE_UNIX),
                arrival_time: melbourne_time(DEMO_ARRIVAL_UNIX),
                boarding_gate: Some(self.gate()),
            },
        }
    }

    /// Match a retrieval against the demo booking.
    pub fn lookup(&self, pnr: &str, last_name: &str) -> Result<RetrievedBooking, BookingServiceError> {
        let matches = pnr.trim().eq_ignore_ascii_case(DEMO_PNR)
            && last_name.trim().eq_ignore_ascii_case(DEMO_LAST_NAME);
        if !matches {
            return Err(BookingServiceError::NotFound(format!(
                "Booking not found. Try {DEMO_PNR} + {DEMO_LAST_NAME}."
            )));
        }
        Ok(RetrievedBooking {
            passenger: self.passenger(),
            booking: self.booking(),
        })
    }

    pub fn session(&self) -> ChannelSession {
        ChannelSession {
            session_id: DEMO_SESSION_ID.to_string(),
            channel_url: self.channel_url.clone(),
            expires_at: Utc::now() + Duration::hours(1),
            heartbeat_interval_sec: DEMO_HEARTBEAT_SECS,
        }
    }
}

impl Default for FixtureBookingService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingService for FixtureBookingService {
    async fn retrieve_booking(
        &self,
        pnr: &str,
        last_name: &str,
    ) -> Result<RetrievedBooking, BookingServiceError> {
        self.lookup(pnr, last_name)
    }

    async fn current_passenger(&self) -> Passenger {
        self.passenger()
    }

    async fn create_channel_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<ChannelSession, BookingServiceError> {
        tracing::debug!(
            passenger_id = %request.passenger_id,
            pnr = %request.booking_pnr,
            "Issuing fixture channel session",
        );
        Ok(self.session())
    }

    async fn close_channel_session(&self, session_id: &str) -> Result<(), BookingServiceError> {
        tracing::debug!(session_id, "Fixture channel session closed");
        Ok(())
    }

    fn apply_gate_change(&self, new_gate: &str) {
        self.set_gate(new_gate);
    }
}

fn melbourne_time(unix_secs: i64) -> LocalTimestamp {
    let offset = FixedOffset::east_opt(DEMO_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix());
    DateTime::from_timestamp(unix_secs, 0)
        .unwrap_or_default()
        .with_timezone(&offset)
}
