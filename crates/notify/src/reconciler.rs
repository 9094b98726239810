//! Folds inbound flight-change envelopes into application state.
//!
//! One call to [`Reconciler::handle`] interprets one frame: it adds a
//! notification to the feed, pushes the new gate to the booking service
//! and refreshes the stored booking. The refresh is best-effort and is
//! discarded if the booking changed while it was in flight.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gatewatch_booking::BookingService;
use gatewatch_core::booking::{Booking, Passenger};
use gatewatch_core::notification::{
    FieldChange, NotificationEventType, NotificationItem, NotificationPayload, FIELD_BOARDING_GATE,
};
use gatewatch_core::types::Timestamp;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::events::ChannelEvent;
use crate::messages::{parse_envelope, InboundEnvelope};
use crate::state::SharedStore;

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// Not a JSON object; dropped.
    Discarded,
    /// Valid JSON, but not a flight change.
    Ignored,
    /// A flight change arrived with no active booking to apply it to.
    NoActiveBooking,
    /// A notification was added to the feed.
    Applied {
        notification_id: Uuid,
        /// Whether the refreshed booking was written to the store.
        refreshed: bool,
    },
}

#[derive(Clone)]
pub struct Reconciler {
    service: Arc<dyn BookingService>,
    store: SharedStore,
    events: broadcast::Sender<ChannelEvent>,
}

impl Reconciler {
    pub fn new(
        service: Arc<dyn BookingService>,
        store: SharedStore,
        events: broadcast::Sender<ChannelEvent>,
    ) -> Self {
        Self {
            service,
            store,
            events,
        }
    }

    /// Interpret one raw frame against the given passenger and booking.
    pub async fn handle(
        &self,
        raw: &str,
        passenger: Option<&Passenger>,
        booking: Option<&Booking>,
    ) -> Reconciliation {
        let envelope = match parse_envelope(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::trace!(error = %e, "Dropping non-JSON channel frame");
                return Reconciliation::Discarded;
            }
        };

        if !envelope.is_flight_change() {
            tracing::debug!(
                kind = envelope.kind.as_deref().unwrap_or("<none>"),
                event_type = envelope.event_type.as_deref().unwrap_or("<none>"),
                "Ignoring channel envelope",
            );
            return Reconciliation::Ignored;
        }

        self.apply(envelope, passenger, booking).await
    }

    /// Apply an already-parsed flight change.
    ///
    /// Used directly by the simulated event, which builds its envelope
    /// locally.
    pub async fn apply(
        &self,
        envelope: InboundEnvelope,
        passenger: Option<&Passenger>,
        booking: Option<&Booking>,
    ) -> Reconciliation {
        let Some(booking) = booking else {
            tracing::debug!("Flight change received with no active booking");
            return Reconciliation::NoActiveBooking;
        };

        let item = build_notification(&envelope, passenger, booking);
        let notification_id = item.id;
        let new_gate = item.payload.change.new_value.clone();

        if !new_gate.is_empty() {
            self.service.apply_gate_change(&new_gate);
        }

        tracing::info!(
            pnr = %booking.pnr,
            correlation_id = item.correlation_id.as_deref().unwrap_or_default(),
            flight_number = %item.payload.flight_number,
            new_value = %new_gate,
            "Flight change applied",
        );

        let generation = {
            let mut store = self.store.write().await;
            store.add_notification(item.clone());
            store.booking_generation()
        };
        let _ = self.events.send(ChannelEvent::NotificationApplied { notification: item });

        let refreshed = match passenger {
            Some(passenger) => self.refresh(generation, booking, passenger).await,
            None => {
                tracing::warn!(pnr = %booking.pnr, "No passenger on record, skipping booking refresh");
                false
            }
        };

        Reconciliation::Applied {
            notification_id,
            refreshed,
        }
    }

    /// Re-fetch the booking and write it back if nothing else replaced
    /// it in the meantime.
    async fn refresh(&self, generation: u64, booking: &Booking, passenger: &Passenger) -> bool {
        match self
            .service
            .retrieve_booking(booking.pnr.as_str(), &passenger.last_name)
            .await
        {
            Ok(found) => {
                let applied = self
                    .store
                    .write()
                    .await
                    .apply_refresh(generation, found.passenger, found.booking);
                if !applied {
                    tracing::debug!(pnr = %booking.pnr, "Discarding stale booking refresh");
                }
                applied
            }
            Err(e) => {
                tracing::warn!(pnr = %booking.pnr, error = %e, "Booking refresh failed");
                false
            }
        }
    }
}

/// Build the feed entry, filling gaps from the current passenger and booking.
fn build_notification(
    envelope: &InboundEnvelope,
    passenger: Option<&Passenger>,
    booking: &Booking,
) -> NotificationItem {
    let payload = envelope.payload.clone().unwrap_or_default();
    let change = payload.change.clone().unwrap_or_default();

    let old_value = change.old_value.clone();
    let new_value = change.new_value.clone().unwrap_or_default();
    let flight_number = payload
        .flight_number
        .clone()
        .unwrap_or_else(|| booking.flight.flight_number.clone());

    let message = payload
        .message
        .clone()
        .or_else(|| envelope.message.clone())
        .unwrap_or_else(|| {
            format!(
                "Gate changed from {} to {}.",
                old_value.as_deref().unwrap_or_default(),
                new_value
            )
        });

    NotificationItem {
        id: Uuid::new_v4(),
        event_type: NotificationEventType::FlightChanged,
        title: format!("Gate change for {flight_number}"),
        message,
        occurred_at: occurred_at(envelope.occurred_at.as_deref()),
        correlation_id: Some(
            envelope
                .correlation_id
                .clone()
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        ),
        payload: NotificationPayload {
            passenger_id: payload
                .passenger_id
                .or_else(|| passenger.map(|p| p.id.clone()))
                .unwrap_or_default(),
            booking_pnr: payload
                .booking_pnr
                .unwrap_or_else(|| booking.pnr.to_string()),
            flight_id: payload
                .flight_id
                .unwrap_or_else(|| booking.flight.id.clone()),
            flight_number,
            change: FieldChange {
                field: change
                    .field
                    .unwrap_or_else(|| FIELD_BOARDING_GATE.to_string()),
                old_value,
                new_value,
            },
        },
    }
}

/// The server's timestamp if it parses, otherwise now.
fn occurred_at(raw: Option<&str>) -> Timestamp {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}
