//! Events emitted by the notification channel.
//!
//! These feed observers such as the lab console's debug log. Nothing in
//! the pipeline depends on anyone listening.

use gatewatch_core::channel_status::ChannelStatus;
use gatewatch_core::notification::NotificationItem;
use serde::Serialize;

/// Broadcast channel capacity for channel events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
pub enum ChannelEvent {
    /// The channel status in the store changed.
    StatusChanged { status: ChannelStatus },

    /// A text frame arrived, before any interpretation.
    MessageReceived { raw: String },

    /// A free-form message was queued for sending.
    MessageSent { raw: String },

    /// A flight change was folded into the notification feed.
    NotificationApplied { notification: NotificationItem },

    /// The simulated event was armed.
    FallbackScheduled { delay_ms: u64 },

    /// The simulated event fired with the given gate toggle.
    FallbackFired { old_gate: String, new_gate: String },

    /// The transport closed.
    Closed { reason: String },
}
