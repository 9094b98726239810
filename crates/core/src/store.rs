//! Application state store.
//!
//! [`AppStore`] is the single source of truth the UI surfaces read from.
//! It is an ordinary owned value; async components hold it behind a
//! lock and write results in after their own awaits complete. Every
//! setter replaces a whole slice, except the notification feed which
//! prepends-and-caps and removes by id.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::{Booking, Passenger};
use crate::channel_status::ChannelStatus;
use crate::notification::{NotificationFeed, NotificationItem};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Home,
    Trips,
    Book,
    Specials,
    More,
}

impl std::str::FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "home" => Ok(Tab::Home),
            "trips" => Ok(Tab::Trips),
            "book" => Ok(Tab::Book),
            "specials" => Ok(Tab::Specials),
            "more" => Ok(Tab::More),
            other => Err(format!("unknown tab '{other}'")),
        }
    }
}

/// Monotonic counter identifying which booking a refresh was issued against.
pub type BookingGeneration = u64;

#[derive(Debug, Clone, Default)]
pub struct AppStore {
    active_tab: Tab,
    passenger: Option<Passenger>,
    booking: Option<Booking>,
    booking_generation: BookingGeneration,
    retrieve_modal_open: bool,
    channel_status: ChannelStatus,
    notifications: NotificationFeed,
}

impl AppStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- reads ----

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    pub fn passenger(&self) -> Option<&Passenger> {
        self.passenger.as_ref()
    }

    pub fn booking(&self) -> Option<&Booking> {
        self.booking.as_ref()
    }

    /// Bumped on every booking replacement or clear.
    pub fn booking_generation(&self) -> BookingGeneration {
        self.booking_generation
    }

    pub fn retrieve_modal_open(&self) -> bool {
        self.retrieve_modal_open
    }

    pub fn channel_status(&self) -> ChannelStatus {
        self.channel_status
    }

    pub fn notifications(&self) -> &NotificationFeed {
        &self.notifications
    }

    // ---- writes ----

    pub fn set_active_tab(&mut self, tab: Tab) {
        self.active_tab = tab;
    }

    pub fn set_passenger(&mut self, passenger: Passenger) {
        self.passenger = Some(passenger);
    }

    /// Replace (or clear) the active booking.
    pub fn set_booking(&mut self, booking: Option<Booking>) {
        self.booking = booking;
        self.booking_generation += 1;
    }

    /// Replace passenger and booking together, as returned by one retrieval.
    pub fn replace_booking(&mut self, passenger: Passenger, booking: Booking) {
        self.set_passenger(passenger);
        self.set_booking(Some(booking));
    }

    /// Apply a refreshed passenger/booking only if no other booking
    /// change happened since `generation` was observed.
    ///
    /// Returns `false` when the result is stale and was discarded.
    pub fn apply_refresh(
        &mut self,
        generation: BookingGeneration,
        passenger: Passenger,
        booking: Booking,
    ) -> bool {
        if generation != self.booking_generation || self.booking.is_none() {
            return false;
        }
        self.replace_booking(passenger, booking);
        true
    }

    pub fn open_retrieve_modal(&mut self) {
        self.retrieve_modal_open = true;
    }

    pub fn close_retrieve_modal(&mut self) {
        self.retrieve_modal_open = false;
    }

    /// Reserved for the notification channel.
    pub fn set_channel_status(&mut self, status: ChannelStatus) {
        self.channel_status = status;
    }

    pub fn add_notification(&mut self, item: NotificationItem) {
        self.notifications.push(item);
    }

    pub fn dismiss_notification(&mut self, id: Uuid) -> bool {
        self.notifications.dismiss(id)
    }

    pub fn clear_notifications(&mut self) {
        self.notifications.clear();
    }
}
