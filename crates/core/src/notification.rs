//! Notification items and the bounded in-memory feed.
//!
//! The feed keeps the [`NOTIFICATION_FEED_CAPACITY`] most recent items,
//! newest first. Insertion order is the only ordering guarantee and
//! duplicates (same correlation id) are kept.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// Maximum number of notifications retained in the feed.
pub const NOTIFICATION_FEED_CAPACITY: usize = 5;

/// Wire name of the flight change event.
pub const EVENT_FLIGHT_CHANGED: &str = "flight.changed";

/// Field name used for boarding gate changes.
pub const FIELD_BOARDING_GATE: &str = "boardingGate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationEventType {
    #[serde(rename = "flight.changed")]
    FlightChanged,
}

/// A single field change carried by a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    #[serde(default)]
    pub old_value: Option<String>,
    pub new_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub passenger_id: String,
    pub booking_pnr: String,
    pub flight_id: String,
    pub flight_number: String,
    pub change: FieldChange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub id: Uuid,
    pub event_type: NotificationEventType,
    pub title: String,
    pub message: String,
    pub occurred_at: Timestamp,
    /// Traces one event through the session; generated locally when
    /// the server omits it.
    pub correlation_id: Option<String>,
    pub payload: NotificationPayload,
}

/// Bounded, most-recent-first list of notifications.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationFeed {
    items: Vec<NotificationItem>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend an item, dropping the oldest beyond capacity.
    pub fn push(&mut self, item: NotificationItem) {
        self.items.insert(0, item);
        self.items.truncate(NOTIFICATION_FEED_CAPACITY);
    }

    /// Remove the item with the given id. Returns whether anything was removed.
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Most recent item, if any.
    pub fn latest(&self) -> Option<&NotificationItem> {
        self.items.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NotificationItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[NotificationItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
