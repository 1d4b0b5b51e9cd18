//! Event bus abstraction for decoupling domain events from their consumers.
//!
//! Reducers announce facts ("order placed", "cart cleared", "new notification")
//! by publishing typed events. Consumers such as the toast layer or the
//! notification reconciler subscribe without the publisher knowing about them.
//!
//! ```text
//! ┌──────────────┐   publish    ┌──────────────┐   subscribe   ┌──────────────┐
//! │ Cart/Checkout│ ───────────► │   EventBus   │ ────────────► │ Toast layer  │
//! │   reducers   │              │  (in-memory) │ ────────────► │ Reconciler   │
//! └──────────────┘              └──────────────┘               └──────────────┘
//! ```
//!
//! # Key Principles
//!
//! - **In-process only**: events never cross the wire
//! - **Fire and forget**: publishing with no subscriber is not an error
//! - **Lossy under lag**: a subscriber that falls behind the channel capacity
//!   skips the oldest events instead of blocking publishers
//!
//! # Example
//!
//! ```
//! use storefront_core::event_bus::{BroadcastEventBus, EventBus};
//!
//! # tokio_test::block_on(async {
//! let bus = BroadcastEventBus::<String>::new(16);
//! let mut rx = bus.subscribe();
//!
//! bus.publish("order placed".to_string());
//! assert_eq!(rx.recv().await.ok().as_deref(), Some("order placed"));
//! # });
//! ```

use tokio::sync::broadcast;

/// Default number of buffered events per subscriber
pub const DEFAULT_CAPACITY: usize = 64;

/// Trait for in-process event bus implementations.
///
/// Object safe so environments can hold `Arc<dyn EventBus<E>>`.
pub trait EventBus<E>: Send + Sync {
    /// Publish an event to every current subscriber.
    fn publish(&self, event: E);

    /// Subscribe to events published from now on.
    fn subscribe(&self) -> broadcast::Receiver<E>;
}

/// [`EventBus`] backed by a tokio broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastEventBus<E> {
    sender: broadcast::Sender<E>,
}

impl<E: Clone> BroadcastEventBus<E> {
    /// Create a bus that buffers up to `capacity` events per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl<E: Clone> Default for BroadcastEventBus<E> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<E> EventBus<E> for BroadcastEventBus<E>
where
    E: Clone + Send + Sync + std::fmt::Debug + 'static,
{
    fn publish(&self, event: E) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Event published with no active subscribers");
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<E> {
        self.sender.subscribe()
    }
}
