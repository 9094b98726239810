//! Real-time flight notifications for the active booking.
//!
//! [`NotificationChannel`] keeps one WebSocket open per active booking
//! and feeds inbound envelopes to the [`Reconciler`], which turns
//! `flight.changed` events into feed entries and booking refreshes.
//! [`BookingSession`] ties booking retrieval to opening the channel.

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod fallback;
pub mod messages;
pub mod processor;
pub mod reconciler;
pub mod session;
pub mod state;

pub use channel::{ChannelPhase, NotificationChannel};
pub use config::ChannelConfig;
pub use error::ChannelError;
pub use events::ChannelEvent;
pub use reconciler::{Reconciler, Reconciliation};
pub use session::BookingSession;
pub use state::{new_shared_store, SharedStore};
