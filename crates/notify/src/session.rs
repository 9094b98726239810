//! Booking retrieval tied to the notification channel.
//!
//! [`BookingSession`] is what a front end drives: retrieving a booking
//! writes it to the store and opens the channel for it, and a channel
//! that cannot get a session degrades to the simulated notification.

use std::sync::Arc;

use gatewatch_booking::{BookingService, BookingServiceError, RetrievedBooking};

use crate::channel::NotificationChannel;
use crate::config::ChannelConfig;
use crate::error::ChannelError;
use crate::state::SharedStore;

#[derive(Clone)]
pub struct BookingSession {
    service: Arc<dyn BookingService>,
    store: SharedStore,
    channel: NotificationChannel,
}

impl BookingSession {
    pub fn new(config: ChannelConfig, service: Arc<dyn BookingService>, store: SharedStore) -> Self {
        let channel = NotificationChannel::new(config, Arc::clone(&service), store.clone());
        Self {
            service,
            store,
            channel,
        }
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Load the signed-in passenger into the store.
    pub async fn load_passenger(&self) {
        let passenger = self.service.current_passenger().await;
        self.store.write().await.set_passenger(passenger);
    }

    /// Retrieve a booking, make it the active one and connect.
    ///
    /// A channel that is already open stays bound to its booking.
    pub async fn retrieve(
        &self,
        pnr: &str,
        last_name: &str,
    ) -> Result<RetrievedBooking, BookingServiceError> {
        let found = self.service.retrieve_booking(pnr, last_name).await?;
        tracing::info!(pnr = %found.booking.pnr, "Booking retrieved");

        {
            let mut store = self.store.write().await;
            store.replace_booking(found.passenger.clone(), found.booking.clone());
            store.close_retrieve_modal();
        }

        self.connect().await;
        Ok(found)
    }

    /// Open the channel for the booking in the store, if there is one.
    pub async fn connect(&self) {
        let (passenger, booking) = {
            let store = self.store.read().await;
            (store.passenger().cloned(), store.booking().cloned())
        };
        let (Some(passenger), Some(booking)) = (passenger, booking) else {
            tracing::debug!("No active booking, channel stays closed");
            return;
        };

        match self.channel.open(&passenger, &booking).await {
            Ok(()) => {}
            Err(ChannelError::SessionCreation(e)) => {
                tracing::warn!(error = %e, "Falling back to simulated notifications");
                self.channel
                    .schedule_simulated(self.channel.config().fallback_delay)
                    .await;
            }
            Err(e) => tracing::warn!(error = %e, "Failed to open notification channel"),
        }
    }

    /// Drop the active booking and close its channel.
    pub async fn clear_booking(&self) {
        self.channel.close().await;
        self.store.write().await.set_booking(None);
    }

    /// Tear down on exit: close the channel and cancel any pending timer.
    pub async fn teardown(&self) {
        self.channel.shutdown().await;
    }
}
