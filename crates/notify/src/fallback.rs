//! The simulated gate change used when no live channel is available.
//!
//! The event toggles the boarding gate between 12 and 14 and is folded
//! through the same [`Reconciler`](crate::reconciler::Reconciler) path
//! as a real push.

use gatewatch_core::booking::{Booking, Passenger};
use gatewatch_core::notification::{EVENT_FLIGHT_CHANGED, FIELD_BOARDING_GATE};
use tokio_util::sync::CancellationToken;

use crate::messages::{InboundChange, InboundEnvelope, InboundPayload, TYPE_NOTIFICATION};

const GATE_A: &str = "12";
const GATE_B: &str = "14";

/// The pending simulated event. At most one exists per channel.
#[derive(Debug)]
pub(crate) struct FallbackTimer {
    pub id: u64,
    pub cancel: CancellationToken,
}

impl FallbackTimer {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
        }
    }
}

/// Old and new gate for the next simulated change.
///
/// A missing gate counts as 12. Gate 14 flips back to 12; anything else
/// moves to 14.
pub fn next_gate(current: Option<&str>) -> (String, String) {
    let old = current
        .filter(|g| !g.is_empty())
        .unwrap_or(GATE_A)
        .to_string();
    let new = if old == GATE_B { GATE_A } else { GATE_B };
    (old, new.to_string())
}

/// Build the simulated envelope from the passenger and booking in view.
pub fn simulated_envelope(passenger: &Passenger, booking: &Booking) -> InboundEnvelope {
    let (old_gate, new_gate) = next_gate(booking.flight.boarding_gate.as_deref());
    let flight_number = booking.flight.flight_number.clone();
    let message = format!(
        "Hi {}, your gate for {} has changed from {} to {}. Head to Gate {} when you're ready.",
        passenger.first_name, flight_number, old_gate, new_gate, new_gate
    );

    InboundEnvelope {
        kind: Some(TYPE_NOTIFICATION.to_string()),
        event_type: Some(EVENT_FLIGHT_CHANGED.to_string()),
        occurred_at: None,
        correlation_id: None,
        message: None,
        payload: Some(InboundPayload {
            passenger_id: Some(passenger.id.clone()),
            booking_pnr: Some(booking.pnr.to_string()),
            flight_id: Some(booking.flight.id.clone()),
            flight_number: Some(flight_number),
            message: Some(message),
            change: Some(InboundChange {
                field: Some(FIELD_BOARDING_GATE.to_string()),
                old_value: Some(old_gate),
                new_value: Some(new_gate),
            }),
        }),
    }
}

#[cfg(test)]
mod tests {
    use gatewatch_booking::FixtureBookingService;

    use super::*;

    #[test]
    fn gate_toggles_between_twelve_and_fourteen() {
        assert_eq!(next_gate(Some("12")), ("12".into(), "14".into()));
        assert_eq!(next_gate(Some("14")), ("14".into(), "12".into()));
        assert_eq!(next_gate(Some("3")), ("3".into(), "14".into()));
    }

    #[test]
    fn missing_gate_counts_as_twelve() {
        assert_eq!(next_gate(None), ("12".into(), "14".into()));
        assert_eq!(next_gate(Some("")), ("12".into(), "14".into()));
    }

    #[test]
    fn envelope_is_a_personalised_flight_change() {
        let fixture = FixtureBookingService::new().with_gate("14");
        let env = simulated_envelope(&fixture.passenger(), &fixture.booking());

        assert!(env.is_flight_change());
        let payload = env.payload.as_ref().unwrap();
        assert_eq!(payload.booking_pnr.as_deref(), Some("AB12CD"));
        assert_eq!(
            payload.message.as_deref(),
            Some("Hi Joe, your gate for VA801 has changed from 14 to 12. Head to Gate 12 when you're ready.")
        );
        let change = env.change().unwrap();
        assert_eq!(change.field.as_deref(), Some("boardingGate"));
        assert_eq!(change.new_value.as_deref(), Some("12"));
    }
}
