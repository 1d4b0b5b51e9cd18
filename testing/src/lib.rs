//! # Storefront Testing
//!
//! Testing utilities and helpers for storefront reducers and stores.
//!
//! This crate provides:
//! - [`FixedClock`] and [`test_clock`] for deterministic timestamps
//! - [`ReducerTest`], a Given-When-Then harness for reducers
//! - [`assertions`] over the effects a reducer returned
//! - [`RecordingEventBus`], an event bus that remembers what was published
//!
//! ## Example
//!
//! ```ignore
//! use storefront_testing::{ReducerTest, assertions};
//!
//! ReducerTest::new(CartReducer::new())
//!     .with_env(cart_environment())
//!     .given_state(CartState::default())
//!     .when_action(CartAction::AddItem { line })
//!     .then_state(|state| assert_eq!(state.items().len(), 1))
//!     .then_effects(|effects| assertions::assert_has_future_effect(effects))
//!     .run();
//! ```

use chrono::{DateTime, Utc};
use storefront_core::environment::Clock;

mod reducer_test;

pub use reducer_test::{ReducerTest, assertions};

/// Mock implementations of environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, Mutex, PoisonError};
    use storefront_core::event_bus::{BroadcastEventBus, EventBus};
    use tokio::sync::broadcast;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making read timestamps reproducible.
    ///
    /// ```
    /// use storefront_testing::mocks::FixedClock;
    /// use storefront_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(DateTime::<Utc>::UNIX_EPOCH + chrono::Duration::days(20_089))
    }

    /// Event bus that records every published event
    ///
    /// Subscribers still receive events, so it can stand in for the real bus
    /// while tests assert on [`RecordingEventBus::published`].
    #[derive(Debug, Clone)]
    pub struct RecordingEventBus<E> {
        inner: BroadcastEventBus<E>,
        published: Arc<Mutex<Vec<E>>>,
    }

    impl<E: Clone> RecordingEventBus<E> {
        /// Create an empty recording bus
        #[must_use]
        pub fn new() -> Self {
            Self {
                inner: BroadcastEventBus::default(),
                published: Arc::new(Mutex::new(Vec::new())),
            }
        }

        /// Snapshot of every event published so far, in order
        #[must_use]
        pub fn published(&self) -> Vec<E> {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }

        /// Forget recorded events
        pub fn clear(&self) {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clear();
        }
    }

    impl<E: Clone> Default for RecordingEventBus<E> {
        fn default() -> Self {
            Self::new()
        }
    }

    impl<E> EventBus<E> for RecordingEventBus<E>
    where
        E: Clone + Send + Sync + std::fmt::Debug + 'static,
    {
        fn publish(&self, event: E) {
            self.published
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
            self.inner.publish(event);
        }

        fn subscribe(&self) -> broadcast::Receiver<E> {
            self.inner.subscribe()
        }
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, RecordingEventBus, test_clock};
