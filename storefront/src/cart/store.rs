//! [`CartStore`]: the cart reducer behind a small async API.

use super::reducer::{CartAction, CartEnvironment, CartReducer};
use super::types::{CartLine, CartState};
use std::time::Duration;
use storefront_runtime::{Store, StoreError};

/// Runtime store type for the cart
pub type CartRuntime = Store<CartState, CartAction, CartEnvironment, CartReducer>;

/// The canonical in-session cart
///
/// Cheap to clone; clones share the same state. Mutations never fail: each
/// returns the cart as it stands right after the mutation.
#[derive(Clone)]
pub struct CartStore {
    store: CartRuntime,
}

impl CartStore {
    /// Empty cart
    #[must_use]
    pub fn new(environment: CartEnvironment) -> Self {
        Self::with_state(CartState::default(), environment)
    }

    /// Cart starting from `state`
    #[must_use]
    pub fn with_state(state: CartState, environment: CartEnvironment) -> Self {
        Self {
            store: Store::new(state, CartReducer::new(), environment),
        }
    }

    /// Add one unit of `line`
    pub async fn add_item(&self, line: CartLine) -> CartState {
        self.dispatch(CartAction::AddItem { line }).await
    }

    /// Remove the line with `id`; unknown ids are ignored
    pub async fn remove_item(&self, id: impl Into<String>) -> CartState {
        self.dispatch(CartAction::RemoveItem { id: id.into() }).await
    }

    /// Set the quantity of line `id`; zero or less removes it
    pub async fn set_quantity(&self, id: impl Into<String>, quantity: i64) -> CartState {
        self.dispatch(CartAction::SetQuantity {
            id: id.into(),
            quantity,
        })
        .await
    }

    /// Empty the cart
    pub async fn clear(&self) -> CartState {
        self.dispatch(CartAction::Clear).await
    }

    /// Replace the cart with the remote mirror's lines
    ///
    /// Leaves the cart untouched when no mirror is configured or the fetch fails.
    pub async fn restore_from_mirror(&self) -> CartState {
        match self.store.send(CartAction::RestoreFromMirror).await {
            Ok(mut handle) => handle.wait().await,
            Err(error) => tracing::warn!(%error, "Cart restore rejected"),
        }
        self.snapshot().await
    }

    /// Current cart
    pub async fn snapshot(&self) -> CartState {
        self.store.state(CartState::clone).await
    }

    /// The underlying runtime store
    #[must_use]
    pub const fn store(&self) -> &CartRuntime {
        &self.store
    }

    /// Stop accepting mutations and let pending mirror writes finish
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if writes are still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }

    async fn dispatch(&self, action: CartAction) -> CartState {
        if let Err(error) = self.store.send(action).await {
            tracing::warn!(%error, "Cart mutation rejected");
        }
        self.snapshot().await
    }
}
