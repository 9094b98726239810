use gatewatch_booking::BookingServiceError;

/// Errors surfaced by the notification channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The booking service could not issue a channel session. Callers
    /// usually degrade to the simulated event rather than surfacing this.
    #[error("Failed to create channel session: {0}")]
    SessionCreation(#[source] BookingServiceError),

    /// `send` was called while the transport is not connected.
    #[error("Notification channel is not open")]
    NotOpen,

    /// The session task stopped accepting frames.
    #[error("Notification channel transport error: {0}")]
    Transport(String),
}
