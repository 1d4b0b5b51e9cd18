//! Cart reducer: the four cart operations plus remote mirror restore.

use super::types::{CartLine, CartState};
use crate::api::CartMirror;
use crate::events::{SharedEventBus, StorefrontEvent};
use crate::types::ProductId;
use std::sync::Arc;
use storefront_core::effect::Effect;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, smallvec};

/// Cart inputs
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CartAction {
    /// Add one unit of a line
    AddItem {
        /// Line snapshot; its quantity is ignored
        line: CartLine,
    },
    /// Remove a line
    RemoveItem {
        /// Line id
        id: String,
    },
    /// Set the quantity of a line; zero or less removes it
    SetQuantity {
        /// Line id
        id: String,
        /// New quantity
        quantity: i64,
    },
    /// Empty the cart
    Clear,
    /// Replace the cart with the remote mirror's contents
    RestoreFromMirror,
    /// Result of a mirror fetch
    MirrorLoaded {
        /// Remote lines
        lines: Vec<CartLine>,
    },
    /// A mirror fetch failed
    MirrorUnavailable {
        /// Error description
        reason: String,
    },
}

/// Cart dependencies
#[derive(Clone)]
pub struct CartEnvironment {
    /// Receives `CartUpdated` and `CartCleared`
    pub events: SharedEventBus,
    /// Remote cart copy, if the session has one
    pub mirror: Option<Arc<dyn CartMirror>>,
}

impl CartEnvironment {
    /// Environment without a remote mirror
    #[must_use]
    pub fn new(events: SharedEventBus) -> Self {
        Self {
            events,
            mirror: None,
        }
    }

    /// Mirror every mutation to `mirror`
    #[must_use]
    pub fn with_mirror(mut self, mirror: Arc<dyn CartMirror>) -> Self {
        self.mirror = Some(mirror);
        self
    }
}

/// One mutation to replay on the mirror
enum MirrorWrite {
    Add(CartLine),
    Quantity {
        product_id: ProductId,
        variant: Option<String>,
        quantity: u32,
    },
    Remove {
        product_id: ProductId,
        variant: Option<String>,
    },
    Clear,
}

/// Reducer for [`CartState`]
#[derive(Clone, Debug, Default)]
pub struct CartReducer;

impl CartReducer {
    /// Creates a new cart reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn announce(state: &CartState, env: &CartEnvironment) -> Effect<CartAction> {
        let event = if state.is_empty() {
            StorefrontEvent::CartCleared
        } else {
            StorefrontEvent::CartUpdated {
                item_count: state.item_count(),
                total: state.total(),
            }
        };
        let events = Arc::clone(&env.events);
        Effect::fire_and_forget(async move { events.publish(event) })
    }

    fn mirror(write: MirrorWrite, env: &CartEnvironment) -> Effect<CartAction> {
        let Some(mirror) = env.mirror.clone() else {
            return Effect::None;
        };

        Effect::fire_and_forget(async move {
            let result = match write {
                MirrorWrite::Add(line) => mirror.add(&line).await,
                MirrorWrite::Quantity {
                    product_id,
                    variant,
                    quantity,
                } => {
                    mirror
                        .update_quantity(product_id, variant.as_deref(), quantity)
                        .await
                },
                MirrorWrite::Remove {
                    product_id,
                    variant,
                } => mirror.remove(product_id, variant.as_deref()).await,
                MirrorWrite::Clear => mirror.clear().await,
            };
            if let Err(error) = result {
                tracing::warn!(%error, "Cart mirror sync failed");
            }
        })
    }

    fn changed(
        state: &CartState,
        write: MirrorWrite,
        env: &CartEnvironment,
    ) -> SmallVec<[Effect<CartAction>; 4]> {
        smallvec![Self::announce(state, env), Self::mirror(write, env)]
    }
}

impl Reducer for CartReducer {
    type State = CartState;
    type Action = CartAction;
    type Environment = CartEnvironment;

    fn reduce(
        &self,
        state: &mut CartState,
        action: CartAction,
        env: &CartEnvironment,
    ) -> SmallVec<[Effect<CartAction>; 4]> {
        match action {
            CartAction::AddItem { line } => {
                state.add_item(line.clone());
                Self::changed(state, MirrorWrite::Add(line), env)
            },

            CartAction::RemoveItem { id } => match state.remove_item(&id) {
                Some(removed) => Self::changed(
                    state,
                    MirrorWrite::Remove {
                        product_id: removed.product_id,
                        variant: removed.variant,
                    },
                    env,
                ),
                None => smallvec![Effect::None],
            },

            CartAction::SetQuantity { id, quantity } => {
                let Some(line) = state.get(&id).cloned() else {
                    return smallvec![Effect::None];
                };
                state.set_quantity(&id, quantity);

                let write = match state.get(&id) {
                    Some(updated) => MirrorWrite::Quantity {
                        product_id: updated.product_id,
                        variant: updated.variant.clone(),
                        quantity: updated.quantity,
                    },
                    None => MirrorWrite::Remove {
                        product_id: line.product_id,
                        variant: line.variant,
                    },
                };
                Self::changed(state, write, env)
            },

            CartAction::Clear => {
                state.clear();
                Self::changed(state, MirrorWrite::Clear, env)
            },

            CartAction::RestoreFromMirror => {
                let Some(mirror) = env.mirror.clone() else {
                    tracing::debug!("No cart mirror configured, nothing to restore");
                    return smallvec![Effect::None];
                };
                smallvec![Effect::Future(Box::pin(async move {
                    Some(match mirror.fetch().await {
                        Ok(lines) => CartAction::MirrorLoaded { lines },
                        Err(error) => CartAction::MirrorUnavailable {
                            reason: error.to_string(),
                        },
                    })
                }))]
            },

            CartAction::MirrorLoaded { lines } => {
                // Replayed locally only; echoing these writes back would double them
                *state = CartState::from_lines(lines);
                tracing::info!(
                    lines = state.items().len(),
                    total = %state.total(),
                    "Cart restored from mirror"
                );
                smallvec![Self::announce(state, env)]
            },

            CartAction::MirrorUnavailable { reason } => {
                tracing::warn!(%reason, "Cart mirror unavailable, keeping local cart");
                smallvec![Effect::None]
            },
        }
    }
}
