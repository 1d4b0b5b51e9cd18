//! Notification reducer: session lifecycle, fetch diffing and optimistic read state.

use super::types::{NotificationRecord, NotificationState, PendingMarkAll, SessionStatus};
use crate::api::NotificationApi;
use crate::events::{SharedEventBus, StorefrontEvent};
use crate::types::NotificationId;
use crate::validation::validate_notification;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::effect::Effect;
use storefront_core::environment::Clock;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, smallvec};

/// Default wait between an order confirmation and the follow-up refresh
pub const DEFAULT_ORDER_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Notification inputs
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationAction {
    /// A user authenticated; fetch immediately
    SessionStarted,
    /// The user logged out; drop everything
    SessionEnded,
    /// Fetch the list and unread count
    Refresh,
    /// Fetch result, already degraded to empty on failure
    Fetched {
        /// Current list, newest first
        notifications: Vec<NotificationRecord>,
        /// Current unread count
        unread_count: u32,
    },
    /// Mark one notification read
    MarkAsRead {
        /// Notification to mark
        id: NotificationId,
    },
    /// The backend confirmed a mark-read
    MarkAsReadConfirmed {
        /// Marked notification
        id: NotificationId,
    },
    /// The backend refused a mark-read; undo it if it was applied locally
    MarkAsReadFailed {
        /// Notification to restore
        id: NotificationId,
        /// True when `MarkAsRead` flipped the local record
        restore: bool,
        /// Error description
        reason: String,
    },
    /// Mark every notification read
    MarkAllAsRead,
    /// The backend confirmed mark-all
    AllMarkedAsRead,
    /// The backend refused mark-all; undo it
    MarkAllAsReadFailed {
        /// Error description
        reason: String,
    },
    /// Delete one notification
    Delete {
        /// Notification to delete
        id: NotificationId,
    },
    /// The backend confirmed a delete
    Deleted {
        /// Deleted notification
        id: NotificationId,
    },
    /// The backend refused a delete
    DeleteFailed {
        /// Notification that stays
        id: NotificationId,
        /// Error description
        reason: String,
    },
    /// An order was placed somewhere in the app
    OrderPlacedObserved,
}

/// Notification dependencies
#[derive(Clone)]
pub struct NotificationEnvironment {
    /// Backend endpoints
    pub api: Arc<dyn NotificationApi>,
    /// Receives `NewNotification` and `NotificationsMarkedRead`
    pub events: SharedEventBus,
    /// Source of read timestamps
    pub clock: Arc<dyn Clock>,
    /// Wait before refreshing after an order was placed
    pub order_refresh_delay: Duration,
}

impl NotificationEnvironment {
    /// Environment with the default order refresh delay
    #[must_use]
    pub fn new(api: Arc<dyn NotificationApi>, events: SharedEventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            api,
            events,
            clock,
            order_refresh_delay: DEFAULT_ORDER_REFRESH_DELAY,
        }
    }

    /// Override the order refresh delay
    #[must_use]
    pub const fn with_order_refresh_delay(mut self, delay: Duration) -> Self {
        self.order_refresh_delay = delay;
        self
    }
}

/// Reducer for [`NotificationState`]
#[derive(Clone, Debug, Default)]
pub struct NotificationReducer;

impl NotificationReducer {
    /// Creates a new notification reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// List and unread count, fetched concurrently
    ///
    /// Any failure degrades to an empty list and a zero count.
    fn fetch(env: &NotificationEnvironment) -> Effect<NotificationAction> {
        let api = Arc::clone(&env.api);
        Effect::Future(Box::pin(async move {
            let (list, count) = futures::join!(api.list(), api.unread_count());
            let action = match (list, count) {
                (Ok(notifications), Ok(unread_count)) => NotificationAction::Fetched {
                    notifications,
                    unread_count,
                },
                (Err(error), _) | (_, Err(error)) => {
                    tracing::warn!(%error, "Notification fetch failed, showing empty list");
                    NotificationAction::Fetched {
                        notifications: Vec::new(),
                        unread_count: 0,
                    }
                },
            };
            Some(action)
        }))
    }

    fn publish(env: &NotificationEnvironment, event: StorefrontEvent) -> Effect<NotificationAction> {
        let events = Arc::clone(&env.events);
        Effect::fire_and_forget(async move { events.publish(event) })
    }

    fn apply_fetch(
        state: &mut NotificationState,
        notifications: Vec<NotificationRecord>,
        unread_count: u32,
        env: &NotificationEnvironment,
    ) -> SmallVec<[Effect<NotificationAction>; 4]> {
        let notifications: Vec<_> = notifications
            .into_iter()
            .filter(|record| {
                let violations = validate_notification(record);
                for violation in &violations {
                    tracing::debug!(%violation, "Skipping malformed notification");
                }
                violations.is_empty()
            })
            .collect();

        let previous = state.notifications.len();
        let current = notifications.len();

        state.notifications = notifications;
        state.unread_count = unread_count;
        state.last_synced_at = Some(env.clock.now());
        state.pending_mark_all = None;

        // One toast per fetch, however many arrived
        if previous > 0 && current > previous {
            if let Some(newest) = state.notifications.first() {
                tracing::info!(
                    arrived = current - previous,
                    id = %newest.id,
                    "New notifications"
                );
                let event = StorefrontEvent::NewNotification {
                    id: newest.id,
                    kind: newest.kind.clone(),
                    title: newest.title.clone(),
                    message: newest.message.clone(),
                };
                return smallvec![Self::publish(env, event)];
            }
        }

        smallvec![Effect::None]
    }
}

impl Reducer for NotificationReducer {
    type State = NotificationState;
    type Action = NotificationAction;
    type Environment = NotificationEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per action
    fn reduce(
        &self,
        state: &mut NotificationState,
        action: NotificationAction,
        env: &NotificationEnvironment,
    ) -> SmallVec<[Effect<NotificationAction>; 4]> {
        // Late results from a previous session must not resurrect its data
        if !state.is_active() && !matches!(action, NotificationAction::SessionStarted) {
            tracing::trace!(?action, "Ignoring notification action while idle");
            return smallvec![Effect::None];
        }

        match action {
            NotificationAction::SessionStarted => {
                tracing::info!("Notification session started");
                state.session = SessionStatus::Active;
                smallvec![Self::fetch(env)]
            },

            NotificationAction::SessionEnded => {
                tracing::info!("Notification session ended");
                *state = NotificationState::default();
                smallvec![Effect::None]
            },

            NotificationAction::Refresh => smallvec![Self::fetch(env)],

            NotificationAction::Fetched {
                notifications,
                unread_count,
            } => Self::apply_fetch(state, notifications, unread_count, env),

            NotificationAction::MarkAsRead { id } => {
                let now = env.clock.now();
                let restore = match state.get_mut(id) {
                    Some(record) if !record.is_read() => {
                        record.read_at = Some(now);
                        state.unread_count = state.unread_count.saturating_sub(1);
                        true
                    },
                    Some(_) => false,
                    None => {
                        tracing::debug!(%id, "Mark read for notification not in the local list");
                        false
                    },
                };

                // The backend is told either way; only a local flip is rolled back
                let api = Arc::clone(&env.api);
                smallvec![Effect::Future(Box::pin(async move {
                    Some(match api.mark_read(id).await {
                        Ok(()) => NotificationAction::MarkAsReadConfirmed { id },
                        Err(error) => NotificationAction::MarkAsReadFailed {
                            id,
                            restore,
                            reason: error.to_string(),
                        },
                    })
                }))]
            },

            NotificationAction::MarkAsReadConfirmed { id } => {
                tracing::debug!(%id, "Notification marked read");
                smallvec![Effect::None]
            },

            NotificationAction::MarkAsReadFailed {
                id,
                restore,
                reason,
            } => {
                if !restore {
                    tracing::warn!(%id, %reason, "Mark read failed");
                    return smallvec![Effect::None];
                }
                tracing::warn!(%id, %reason, "Mark read failed, restoring unread");
                if let Some(record) = state.get_mut(id) {
                    if record.is_read() {
                        record.read_at = None;
                        state.unread_count = state.unread_count.saturating_add(1);
                    }
                }
                smallvec![Effect::None]
            },

            NotificationAction::MarkAllAsRead => {
                let now = env.clock.now();
                let mut pending = state.pending_mark_all.take().unwrap_or(PendingMarkAll {
                    flipped: Vec::new(),
                    previous_unread: state.unread_count,
                });
                for record in state.notifications.iter_mut().filter(|r| !r.is_read()) {
                    record.read_at = Some(now);
                    pending.flipped.push(record.id);
                }
                state.pending_mark_all = Some(pending);
                state.unread_count = 0;

                let api = Arc::clone(&env.api);
                smallvec![Effect::Future(Box::pin(async move {
                    Some(match api.mark_all_read().await {
                        Ok(()) => NotificationAction::AllMarkedAsRead,
                        Err(error) => NotificationAction::MarkAllAsReadFailed {
                            reason: error.to_string(),
                        },
                    })
                }))]
            },

            NotificationAction::AllMarkedAsRead => {
                state.pending_mark_all = None;
                smallvec![Self::publish(env, StorefrontEvent::NotificationsMarkedRead)]
            },

            NotificationAction::MarkAllAsReadFailed { reason } => {
                tracing::warn!(%reason, "Mark all read failed, restoring unread");
                if let Some(pending) = state.pending_mark_all.take() {
                    for id in pending.flipped {
                        if let Some(record) = state.get_mut(id) {
                            record.read_at = None;
                        }
                    }
                    state.unread_count = pending.previous_unread;
                }
                smallvec![Effect::None]
            },

            NotificationAction::Delete { id } => {
                let api = Arc::clone(&env.api);
                smallvec![Effect::Future(Box::pin(async move {
                    Some(match api.delete(id).await {
                        Ok(()) => NotificationAction::Deleted { id },
                        Err(error) => NotificationAction::DeleteFailed {
                            id,
                            reason: error.to_string(),
                        },
                    })
                }))]
            },

            NotificationAction::Deleted { id } => {
                if let Some(index) = state.notifications.iter().position(|r| r.id == id) {
                    let removed = state.notifications.remove(index);
                    if !removed.is_read() {
                        state.unread_count = state.unread_count.saturating_sub(1);
                    }
                }
                smallvec![Effect::None]
            },

            NotificationAction::DeleteFailed { id, reason } => {
                tracing::warn!(%id, %reason, "Notification delete failed");
                smallvec![Effect::None]
            },

            NotificationAction::OrderPlacedObserved => smallvec![Effect::Delay {
                duration: env.order_refresh_delay,
                action: Box::new(NotificationAction::Refresh),
            }],
        }
    }
}
