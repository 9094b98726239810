//! Notification channel envelope types and parser.
//!
//! Every frame on the channel is a JSON object tagged with a `"type"`
//! field. Outbound we only ever frame the `hello` envelope; free-form
//! messages are forwarded untouched. Inbound parsing is lenient: every
//! field is optional and gate values may arrive as strings or numbers.

use gatewatch_booking::DeviceInfo;
use gatewatch_core::booking::{Booking, Passenger};
use gatewatch_core::notification::EVENT_FLIGHT_CHANGED;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};

pub const TYPE_HELLO: &str = "hello";
pub const TYPE_NOTIFICATION: &str = "notification";

/// Sent once, best-effort, right after the transport opens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelloEnvelope {
    r#type: &'static str,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passenger_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_pnr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceInfo>,
}

impl HelloEnvelope {
    pub fn new(
        session_id: impl Into<String>,
        passenger: Option<&Passenger>,
        booking: Option<&Booking>,
        device: Option<DeviceInfo>,
    ) -> Self {
        Self {
            r#type: TYPE_HELLO,
            session_id: session_id.into(),
            passenger_id: passenger.map(|p| p.id.clone()),
            booking_pnr: booking.map(|b| b.pnr.to_string()),
            device,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// An inbound envelope as received; nothing is guaranteed present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundEnvelope {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub event_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub occurred_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub correlation_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub payload: Option<InboundPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub passenger_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub booking_pnr: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub flight_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub flight_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub change: Option<InboundChange>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundChange {
    #[serde(default, deserialize_with = "lenient_string")]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub old_value: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub new_value: Option<String>,
}

impl InboundEnvelope {
    /// Whether this is a `notification` carrying a `flight.changed` event.
    pub fn is_flight_change(&self) -> bool {
        self.kind.as_deref() == Some(TYPE_NOTIFICATION)
            && self.event_type.as_deref() == Some(EVENT_FLIGHT_CHANGED)
    }

    pub fn change(&self) -> Option<&InboundChange> {
        self.payload.as_ref().and_then(|p| p.change.as_ref())
    }
}

/// Parse a channel text frame.
///
/// Returns `Err` for anything that is not a JSON object (heartbeat
/// strings, bare literals, garbage). Callers drop those silently.
pub fn parse_envelope(text: &str) -> Result<InboundEnvelope, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    if !value.is_object() {
        return Err(serde_json::Error::custom("channel frame is not a JSON object"));
    }
    serde_json::from_value(value)
}

/// Accept strings and numbers; treat `null` and empty strings as absent.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        Some(serde_json::Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Decode a nested object, treating any other shape as absent.
fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .filter(serde_json::Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok()))
}
