//! Domain model and client-side state for the gatewatch booking client.
//!
//! Everything in this crate is synchronous and free of network I/O. The
//! networking crates (`gatewatch-booking`, `gatewatch-notify`) read from
//! and write into the [`store::AppStore`] defined here.

pub mod booking;
pub mod channel_status;
pub mod config;
pub mod error;
pub mod notification;
pub mod store;
pub mod types;
