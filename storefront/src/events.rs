//! Domain events published on the in-process bus, and the toasts derived from them.

use crate::notifications::NotificationType;
use crate::types::{Money, NotificationId, OrderId};
use std::sync::Arc;
use storefront_core::event_bus::EventBus;

/// Shared handle to the storefront event bus
pub type SharedEventBus = Arc<dyn EventBus<StorefrontEvent>>;

/// Facts announced by the storefront features
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorefrontEvent {
    /// The backend confirmed an order
    OrderPlaced {
        /// Order identifier returned by the backend
        order_id: OrderId,
    },

    /// The backend refused an order or could not be reached
    OrderFailed {
        /// Message for the customer
        message: String,
    },

    /// The cart was emptied
    CartCleared,

    /// The cart contents changed
    CartUpdated {
        /// Sum of all line quantities
        item_count: u32,
        /// Cart total after the change
        total: Money,
    },

    /// A poll found notifications that were not there before
    NewNotification {
        /// Newest notification
        id: NotificationId,
        /// Notification type
        kind: NotificationType,
        /// Title shown in the toast
        title: String,
        /// Message body
        message: String,
    },

    /// The backend confirmed that every notification is read
    NotificationsMarkedRead,
}

/// Toast severity
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ToastKind {
    /// Positive confirmation
    Success,
    /// Neutral information
    Info,
    /// Something needs attention
    Warning,
    /// An operation failed
    Error,
}

/// A transient message for the UI layer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Toast {
    /// Severity
    pub kind: ToastKind,
    /// Headline
    pub title: String,
    /// Body text
    pub message: String,
}

impl Toast {
    /// Creates a toast
    #[must_use]
    pub fn new(kind: ToastKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }
}

impl StorefrontEvent {
    /// The toast this event should raise, if any
    ///
    /// Cart changes are silent; the cart badge reflects them instead.
    #[must_use]
    pub fn toast(&self) -> Option<Toast> {
        match self {
            Self::OrderPlaced { order_id } => Some(Toast::new(
                ToastKind::Success,
                "Order placed",
                format!("Your order {order_id} has been placed."),
            )),
            Self::OrderFailed { message } => {
                Some(Toast::new(ToastKind::Error, "Order failed", message.clone()))
            },
            Self::NewNotification {
                kind, title, message, ..
            } => {
                let severity = match kind {
                    NotificationType::Promotion => ToastKind::Success,
                    NotificationType::System => ToastKind::Warning,
                    _ => ToastKind::Info,
                };
                Some(Toast::new(severity, title.clone(), message.clone()))
            },
            Self::NotificationsMarkedRead => Some(Toast::new(
                ToastKind::Success,
                "Notifications",
                "All notifications marked as read.",
            )),
            Self::CartCleared | Self::CartUpdated { .. } => None,
        }
    }
}
