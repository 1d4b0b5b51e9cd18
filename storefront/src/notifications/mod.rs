//! Notification sync.
//!
//! The reducer owns the local view and its transitions: session lifecycle,
//! fetch diffing ("one toast per poll tick"), and optimistic read state with
//! rollback when the backend refuses. The reconciler owns the timer and the
//! event-bus listener that feed it.

mod reconciler;
mod reducer;
mod types;

pub use reconciler::{
    DEFAULT_POLL_INTERVAL, NotificationReconciler, NotificationRuntime, PollingStrategy,
};
pub use reducer::{
    DEFAULT_ORDER_REFRESH_DELAY, NotificationAction, NotificationEnvironment, NotificationReducer,
};
pub use types::{NotificationRecord, NotificationState, NotificationType, SessionStatus};
