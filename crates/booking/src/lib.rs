//! Booking service client.
//!
//! Provides the [`BookingService`](service::BookingService) trait used by
//! the notification pipeline, an HTTP implementation over `reqwest`, and
//! the in-process fixture it falls back to when the service is
//! unreachable.

pub mod api;
pub mod config;
pub mod fixture;
pub mod service;

pub use api::HttpBookingService;
pub use fixture::FixtureBookingService;
pub use service::{
    BookingService, BookingServiceError, ChannelSession, CreateSessionRequest, DeviceInfo,
    RetrievedBooking,
};
