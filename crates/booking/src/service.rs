//! The booking service seam.
//!
//! [`BookingService`] is the contract the notification pipeline talks
//! to. [`HttpBookingService`](crate::api::HttpBookingService) is the real
//! implementation; [`FixtureBookingService`](crate::fixture::FixtureBookingService)
//! is the in-process fake that also backs the HTTP client's offline
//! fallback.

use async_trait::async_trait;
use gatewatch_core::booking::{Booking, Passenger};
use gatewatch_core::error::CoreError;
use gatewatch_core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Result of a successful booking retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievedBooking {
    pub passenger: Passenger,
    pub booking: Booking,
}

/// Client device metadata sent with session requests and hello envelopes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub passenger_id: String,
    pub booking_pnr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
}

/// Descriptor for one notification channel session.
///
/// Consumed once to open a connection; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSession {
    pub session_id: String,
    #[serde(rename = "wsUrl", alias = "channelUrl")]
    pub channel_url: String,
    pub expires_at: Timestamp,
    pub heartbeat_interval_sec: u64,
}

/// Errors from the booking service layer.
#[derive(Debug, thiserror::Error)]
pub enum BookingServiceError {
    /// No booking matched the reference and last name.
    #[error("{0}")]
    NotFound(String),

    /// The request inputs were rejected before any call was made.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// The HTTP request itself failed (network, DNS, TLS, decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The configured base URL cannot address the endpoint.
    #[error("Invalid booking service URL: {0}")]
    InvalidUrl(String),

    /// The service returned a non-2xx status code.
    #[error("Booking service error ({status}): {body}")]
    Api { status: u16, body: String },
}

#[async_trait]
pub trait BookingService: Send + Sync {
    /// Look up a booking by reference and passenger last name.
    async fn retrieve_booking(
        &self,
        pnr: &str,
        last_name: &str,
    ) -> Result<RetrievedBooking, BookingServiceError>;

    /// The signed-in passenger. Best-effort: implementations fall back
    /// to a fixed demo passenger rather than failing.
    async fn current_passenger(&self) -> Passenger;

    async fn create_channel_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<ChannelSession, BookingServiceError>;

    async fn close_channel_session(&self, session_id: &str) -> Result<(), BookingServiceError>;

    /// Record a boarding gate pushed over the notification channel so
    /// the next retrieval reflects it. Real backends already hold the
    /// authoritative record, so the default does nothing.
    fn apply_gate_change(&self, _new_gate: &str) {}
}
