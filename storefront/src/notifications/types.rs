//! Notification records and the reconciler's local view of them.

use crate::types::NotificationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Notification category
///
/// Unknown server values are kept verbatim in [`NotificationType::Other`]
/// instead of failing the whole list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum NotificationType {
    /// New order confirmation
    Order,
    /// Order moved to another status
    OrderStatus,
    /// Shipment update
    Shipping,
    /// Marketing message
    Promotion,
    /// Maintenance or account notice
    System,
    /// Anything else
    Other(String),
}

impl NotificationType {
    /// Wire name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Order => "order",
            Self::OrderStatus => "order_status",
            Self::Shipping => "shipping",
            Self::Promotion => "promotion",
            Self::System => "system",
            Self::Other(other) => other,
        }
    }
}

impl From<String> for NotificationType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "order" => Self::Order,
            "order_status" => Self::OrderStatus,
            "shipping" => Self::Shipping,
            "promotion" => Self::Promotion,
            "system" => Self::System,
            _ => Self::Other(value),
        }
    }
}

impl From<NotificationType> for String {
    fn from(value: NotificationType) -> Self {
        match value {
            NotificationType::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A server-side notification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// Server-assigned id
    pub id: NotificationId,
    /// Category
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Headline
    pub title: String,
    /// Body
    #[serde(default)]
    pub message: String,
    /// `None` while unread
    #[serde(default, alias = "read_at")]
    pub read_at: Option<DateTime<Utc>>,
    /// Creation time, newest first in server ordering
    #[serde(default, alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// True once `read_at` is set
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// Whether a user session is driving the reconciler
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    /// No authenticated user, nothing is fetched
    #[default]
    Idle,
    /// Fetching on entry, on every poll and on order-placed signals
    Active,
}

/// Undo information for an optimistic mark-all
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct PendingMarkAll {
    pub(crate) flipped: Vec<NotificationId>,
    pub(crate) previous_unread: u32,
}

/// Local view of the user's notifications
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NotificationState {
    /// Session status
    pub session: SessionStatus,
    /// Last fetched list, newest first
    pub notifications: Vec<NotificationRecord>,
    /// Unread counter shown on the badge
    pub unread_count: u32,
    /// When the last fetch result was applied
    pub last_synced_at: Option<DateTime<Utc>>,
    pub(crate) pending_mark_all: Option<PendingMarkAll>,
}

impl NotificationState {
    /// Record with the given id
    #[must_use]
    pub fn get(&self, id: NotificationId) -> Option<&NotificationRecord> {
        self.notifications.iter().find(|record| record.id == id)
    }

    /// True while a session is active
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.session == SessionStatus::Active
    }

    pub(crate) fn get_mut(&mut self, id: NotificationId) -> Option<&mut NotificationRecord> {
        self.notifications.iter_mut().find(|record| record.id == id)
    }
}
