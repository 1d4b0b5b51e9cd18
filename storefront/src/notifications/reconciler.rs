//! [`NotificationReconciler`]: drives the notification store for one user session.
//!
//! ```text
//!            start()                      stop() / drop
//!   Idle ─────────────► Active ──────────────────────────► Idle
//!                         │  immediate fetch
//!                         │  every poll tick      ─► Refresh
//!                         │  OrderPlaced on bus   ─► OrderPlacedObserved ─(delay)─► Refresh
//!                         │  bus lag              ─► OrderPlacedObserved
//! ```

use super::reducer::{NotificationAction, NotificationEnvironment, NotificationReducer};
use super::types::NotificationState;
use crate::events::StorefrontEvent;
use crate::types::NotificationId;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use storefront_runtime::{EffectHandle, Store, StoreError};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Default poll cadence
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Runtime store type for notifications
pub type NotificationRuntime =
    Store<NotificationState, NotificationAction, NotificationEnvironment, NotificationReducer>;

/// When the reconciler refreshes on its own
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PollingStrategy {
    /// Refresh on a fixed cadence
    Interval(Duration),
    /// No timer; refresh only on [`NotificationReconciler::refresh`] and order signals
    ///
    /// Push-based transports drive the reconciler this way.
    Manual,
}

impl Default for PollingStrategy {
    fn default() -> Self {
        Self::Interval(DEFAULT_POLL_INTERVAL)
    }
}

/// Keeps the local notification view in sync with the backend
pub struct NotificationReconciler {
    store: NotificationRuntime,
    strategy: PollingStrategy,
    session: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationReconciler {
    /// Idle reconciler; call [`start`](Self::start) once a user is authenticated
    #[must_use]
    pub fn new(environment: NotificationEnvironment, strategy: PollingStrategy) -> Self {
        Self {
            store: Store::new(
                NotificationState::default(),
                NotificationReducer::new(),
                environment,
            ),
            strategy,
            session: Mutex::new(None),
        }
    }

    /// Enter the active state: fetch now, then poll and listen for orders
    ///
    /// The returned handle completes once the initial fetch has been applied.
    /// Command handles returned by this type also cover the events those
    /// commands publish.
    /// Starting an already active reconciler restarts its timer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn start(&self) -> Result<EffectHandle, StoreError> {
        self.abort_session();

        // Subscribe before the first fetch so no order signal slips through
        let orders = self.store.environment().events.subscribe();
        let handle = self
            .store
            .send_cascading(NotificationAction::SessionStarted)
            .await?;

        let task = tokio::spawn(run_session(self.store.clone(), orders, self.strategy));
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);

        tracing::info!(strategy = ?self.strategy, "Notification reconciler started");
        Ok(handle)
    }

    /// Leave the active state: stop polling and drop local data
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn stop(&self) -> Result<(), StoreError> {
        self.abort_session();
        self.store.send(NotificationAction::SessionEnded).await?;
        tracing::info!("Notification reconciler stopped");
        Ok(())
    }

    /// Fetch outside the regular cadence
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn refresh(&self) -> Result<EffectHandle, StoreError> {
        self.store.send_cascading(NotificationAction::Refresh).await
    }

    /// Mark one notification read, optimistically
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn mark_as_read(&self, id: NotificationId) -> Result<EffectHandle, StoreError> {
        self.store
            .send_cascading(NotificationAction::MarkAsRead { id })
            .await
    }

    /// Mark every notification read, optimistically
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn mark_all_as_read(&self) -> Result<EffectHandle, StoreError> {
        self.store
            .send_cascading(NotificationAction::MarkAllAsRead)
            .await
    }

    /// Delete one notification once the backend confirms
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownInProgress`] after [`shutdown`](Self::shutdown).
    pub async fn delete(&self, id: NotificationId) -> Result<EffectHandle, StoreError> {
        self.store
            .send_cascading(NotificationAction::Delete { id })
            .await
    }

    /// Current local view
    pub async fn snapshot(&self) -> NotificationState {
        self.store.state(NotificationState::clone).await
    }

    /// Current unread counter
    pub async fn unread_count(&self) -> u32 {
        self.store.state(|state| state.unread_count).await
    }

    /// True while a session task is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// The underlying runtime store
    #[must_use]
    pub const fn store(&self) -> &NotificationRuntime {
        &self.store
    }

    /// Stop polling and wait for in-flight requests
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if requests are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.abort_session();
        self.store.shutdown(timeout).await
    }

    fn abort_session(&self) {
        if let Some(task) = self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl Drop for NotificationReconciler {
    fn drop(&mut self) {
        self.abort_session();
    }
}

async fn run_session(
    store: NotificationRuntime,
    mut orders: broadcast::Receiver<StorefrontEvent>,
    strategy: PollingStrategy,
) {
    let mut ticker = match strategy {
        PollingStrategy::Interval(period) => {
            // The session start already fetched, so the first tick is one period out
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Some(ticker)
        },
        PollingStrategy::Manual => None,
    };
    let mut bus_open = true;

    loop {
        let action = tokio::select! {
            () = next_tick(&mut ticker) => NotificationAction::Refresh,
            event = orders.recv(), if bus_open => match event {
                Ok(StorefrontEvent::OrderPlaced { order_id }) => {
                    tracing::debug!(%order_id, "Order placed, scheduling notification refresh");
                    NotificationAction::OrderPlacedObserved
                },
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // A skipped event may have been an order confirmation
                    tracing::warn!(skipped, "Notification reconciler lagged behind the event bus");
                    NotificationAction::OrderPlacedObserved
                },
                Err(broadcast::error::RecvError::Closed) => {
                    bus_open = false;
                    continue;
                },
            },
        };

        if let Err(error) = store.send(action).await {
            tracing::debug!(%error, "Notification session ending");
            break;
        }
    }
}

async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        },
        None => std::future::pending().await,
    }
}
