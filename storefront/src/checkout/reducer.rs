//! Checkout reducer: build, validate, submit, then clear the cart.

use crate::api::OrderApi;
use crate::cart::{CartState, CartStore};
use crate::events::{SharedEventBus, StorefrontEvent};
use crate::order::{OrderDraft, PaymentDetails, ShippingForm};
use crate::types::{Money, OrderId};
use crate::validation::{Violation, validate_order};
use std::sync::Arc;
use storefront_core::effect::Effect;
use storefront_core::reducer::Reducer;
use storefront_core::{SmallVec, smallvec};
use uuid::Uuid;

/// Shown when the backend gave no usable message
pub const GENERIC_SUBMISSION_FAILURE: &str = "Failed to place order. Please try again.";

/// Shown when a second submission arrives while one is in flight
pub const ALREADY_SUBMITTING: &str = "An order is already being submitted";

/// How the shipping fee is derived from the subtotal
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ShippingPolicy {
    /// Fee charged below the threshold
    pub flat_fee: Money,
    /// Subtotal from which shipping is free; `None` means never free
    pub free_shipping_threshold: Option<Money>,
}

impl ShippingPolicy {
    /// Fee for an order with the given subtotal
    #[must_use]
    pub fn fee_for(&self, subtotal: Money) -> Money {
        match self.free_shipping_threshold {
            Some(threshold) if subtotal >= threshold => Money::ZERO,
            _ => self.flat_fee,
        }
    }
}

/// Where the checkout flow stands
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CheckoutState {
    /// Nothing submitted yet
    #[default]
    Idle,
    /// Waiting for the order API
    Submitting {
        /// Attempt in flight
        correlation_id: Uuid,
    },
    /// The backend confirmed the order
    Placed {
        /// Confirmed order
        order_id: OrderId,
    },
    /// The draft broke business rules; nothing was sent
    Rejected {
        /// Every violation found
        violations: Vec<Violation>,
    },
    /// The submission failed; the cart is untouched
    Failed {
        /// Message for the customer
        message: String,
    },
}

/// Checkout inputs
///
/// Every attempt carries a correlation id; each `Submit` is answered by
/// exactly one terminal action with the same id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutAction {
    /// Build, validate and submit an order from a cart snapshot
    Submit {
        /// Attempt id
        correlation_id: Uuid,
        /// Cart contents at submit time
        cart: CartState,
        /// Shipping fields as entered
        form: ShippingForm,
        /// Raw payment method name
        payment_method: String,
        /// Method-dependent details
        payment_details: PaymentDetails,
    },
    /// Terminal: the order was placed, the cart cleared and the event published
    OrderCompleted {
        /// Attempt id
        correlation_id: Uuid,
        /// Confirmed order
        order_id: OrderId,
    },
    /// Terminal: the draft was invalid
    ValidationFailed {
        /// Attempt id
        correlation_id: Uuid,
        /// Every violation found
        violations: Vec<Violation>,
    },
    /// Terminal: transport failure or backend rejection
    SubmissionFailed {
        /// Attempt id
        correlation_id: Uuid,
        /// Message for the customer
        message: String,
    },
    /// Terminal: another attempt is still in flight
    AlreadySubmitting {
        /// Attempt id of the refused submission
        correlation_id: Uuid,
    },
    /// The caller stopped waiting for an attempt
    TimedOut {
        /// Attempt id
        correlation_id: Uuid,
    },
}

impl CheckoutAction {
    /// Attempt id of a terminal action
    #[must_use]
    pub const fn terminal_correlation_id(&self) -> Option<Uuid> {
        match self {
            Self::OrderCompleted { correlation_id, .. }
            | Self::ValidationFailed { correlation_id, .. }
            | Self::SubmissionFailed { correlation_id, .. }
            | Self::AlreadySubmitting { correlation_id } => Some(*correlation_id),
            Self::Submit { .. } | Self::TimedOut { .. } => None,
        }
    }
}

/// Checkout dependencies
#[derive(Clone)]
pub struct CheckoutEnvironment {
    /// Order submission endpoint
    pub orders: Arc<dyn OrderApi>,
    /// Cart to clear after a confirmed order
    pub cart: CartStore,
    /// Receives `OrderPlaced` and `OrderFailed`
    pub events: SharedEventBus,
    /// Shipping fee rules
    pub shipping: ShippingPolicy,
}

/// Reducer for [`CheckoutState`]
#[derive(Clone, Debug, Default)]
pub struct CheckoutReducer;

impl CheckoutReducer {
    /// Creates a new checkout reducer
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Answer with a terminal action through the effect channel so waiters see it
    fn respond(action: CheckoutAction) -> Effect<CheckoutAction> {
        Effect::Future(Box::pin(async move { Some(action) }))
    }

    fn submit(
        draft: OrderDraft,
        correlation_id: Uuid,
        env: &CheckoutEnvironment,
    ) -> Effect<CheckoutAction> {
        let orders = Arc::clone(&env.orders);
        let events = Arc::clone(&env.events);
        let cart = env.cart.clone();

        Effect::Future(Box::pin(async move {
            match orders.submit_order(&draft).await {
                Ok(order_id) => {
                    cart.clear().await;
                    events.publish(StorefrontEvent::OrderPlaced {
                        order_id: order_id.clone(),
                    });
                    Some(CheckoutAction::OrderCompleted {
                        correlation_id,
                        order_id,
                    })
                },
                Err(error) => {
                    tracing::warn!(%correlation_id, %error, "Order submission failed");
                    let message = error
                        .user_message()
                        .unwrap_or(GENERIC_SUBMISSION_FAILURE)
                        .to_string();
                    events.publish(StorefrontEvent::OrderFailed {
                        message: message.clone(),
                    });
                    Some(CheckoutAction::SubmissionFailed {
                        correlation_id,
                        message,
                    })
                },
            }
        }))
    }

    fn is_current(state: &CheckoutState, id: Uuid) -> bool {
        matches!(state, CheckoutState::Submitting { correlation_id } if *correlation_id == id)
    }
}

impl Reducer for CheckoutReducer {
    type State = CheckoutState;
    type Action = CheckoutAction;
    type Environment = CheckoutEnvironment;

    fn reduce(
        &self,
        state: &mut CheckoutState,
        action: CheckoutAction,
        env: &CheckoutEnvironment,
    ) -> SmallVec<[Effect<CheckoutAction>; 4]> {
        match action {
            CheckoutAction::Submit {
                correlation_id,
                cart,
                form,
                payment_method,
                payment_details,
            } => {
                if matches!(state, CheckoutState::Submitting { .. }) {
                    tracing::debug!(%correlation_id, "Submission refused, another is in flight");
                    return smallvec![Self::respond(CheckoutAction::AlreadySubmitting {
                        correlation_id
                    })];
                }

                let fee = env.shipping.fee_for(cart.total());
                let draft = OrderDraft::from_cart(&cart, form, payment_method, payment_details, fee);

                let violations = validate_order(&draft);
                if !violations.is_empty() {
                    tracing::debug!(%correlation_id, count = violations.len(), "Order draft invalid");
                    return smallvec![Self::respond(CheckoutAction::ValidationFailed {
                        correlation_id,
                        violations,
                    })];
                }

                tracing::info!(
                    %correlation_id,
                    items = draft.items.len(),
                    total = %draft.total,
                    "Submitting order"
                );
                *state = CheckoutState::Submitting { correlation_id };
                smallvec![Self::submit(draft, correlation_id, env)]
            },

            CheckoutAction::OrderCompleted {
                correlation_id,
                order_id,
            } => {
                if Self::is_current(state, correlation_id) {
                    tracing::info!(%correlation_id, %order_id, "Order placed");
                    *state = CheckoutState::Placed { order_id };
                }
                smallvec![Effect::None]
            },

            CheckoutAction::ValidationFailed { violations, .. } => {
                if !matches!(state, CheckoutState::Submitting { .. }) {
                    *state = CheckoutState::Rejected { violations };
                }
                smallvec![Effect::None]
            },

            CheckoutAction::SubmissionFailed {
                correlation_id,
                message,
            } => {
                if Self::is_current(state, correlation_id) {
                    *state = CheckoutState::Failed { message };
                }
                smallvec![Effect::None]
            },

            CheckoutAction::AlreadySubmitting { .. } => smallvec![Effect::None],

            CheckoutAction::TimedOut { correlation_id } => {
                if Self::is_current(state, correlation_id) {
                    tracing::warn!(%correlation_id, "Order submission timed out");
                    *state = CheckoutState::Failed {
                        message: GENERIC_SUBMISSION_FAILURE.to_string(),
                    };
                }
                smallvec![Effect::None]
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartEnvironment, CartLine};
    use crate::mocks::InMemoryOrderApi;
    use crate::types::ProductId;
    use storefront_core::event_bus::BroadcastEventBus;
    use storefront_testing::{ReducerTest, assertions};

    fn env() -> CheckoutEnvironment {
        let events: SharedEventBus = Arc::new(BroadcastEventBus::<StorefrontEvent>::default());
        CheckoutEnvironment {
            orders: Arc::new(InMemoryOrderApi::default()),
            cart: CartStore::new(CartEnvironment::new(Arc::clone(&events))),
            events,
            shipping: ShippingPolicy::default(),
        }
    }

    fn submit(payment_method: &str) -> CheckoutAction {
        CheckoutAction::Submit {
            correlation_id: Uuid::nil(),
            cart: CartState::from_lines(vec![CartLine::new(
                ProductId::new(1),
                "Abaca slippers",
                Money::from_major(450),
            )]),
            form: ShippingForm {
                first_name: Some("Maria".to_string()),
                last_name: Some("Santos".to_string()),
                email: Some("maria@example.ph".to_string()),
                phone: Some("09171234567".to_string()),
                address: Some("4 Rizal Ave".to_string()),
                barangay: Some("Poblacion".to_string()),
                city: Some("Makati".to_string()),
                province: Some("Metro Manila".to_string()),
                region: Some("NCR".to_string()),
                zip_code: Some("1210".to_string()),
            },
            payment_method: payment_method.to_string(),
            payment_details: PaymentDetails::default(),
        }
    }

    #[test]
    fn valid_submit_enters_submitting() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(CheckoutState::Idle)
            .when_action(submit("cod"))
            .then_state(|state| {
                assert_eq!(
                    *state,
                    CheckoutState::Submitting {
                        correlation_id: Uuid::nil()
                    }
                );
            })
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn invalid_submit_stays_idle_until_answered() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(CheckoutState::Idle)
            .when_action(submit("bank_transfer"))
            .then_state(|state| assert_eq!(*state, CheckoutState::Idle))
            .then_effects(assertions::assert_has_future_effect)
            .run();
    }

    #[test]
    fn validation_failure_is_recorded() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(CheckoutState::Idle)
            .when_action(CheckoutAction::ValidationFailed {
                correlation_id: Uuid::nil(),
                violations: vec![Violation::MissingBankAccount],
            })
            .then_state(|state| {
                assert_eq!(
                    *state,
                    CheckoutState::Rejected {
                        violations: vec![Violation::MissingBankAccount]
                    }
                );
            })
            .run();
    }

    #[test]
    fn second_submit_while_submitting_is_refused() {
        let in_flight = Uuid::from_u128(7);
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(CheckoutState::Submitting {
                correlation_id: in_flight,
            })
            .when_action(submit("cod"))
            .then_state(move |state| {
                assert_eq!(
                    *state,
                    CheckoutState::Submitting {
                        correlation_id: in_flight
                    }
                );
            })
            .run();
    }

    #[test]
    fn stale_terminal_actions_are_ignored() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(CheckoutState::Submitting {
                correlation_id: Uuid::from_u128(1),
            })
            .when_action(CheckoutAction::SubmissionFailed {
                correlation_id: Uuid::from_u128(2),
                message: "late".to_string(),
            })
            .then_state(|state| {
                assert!(matches!(state, CheckoutState::Submitting { .. }));
            })
            .run();
    }

    #[test]
    fn timeout_fails_current_attempt() {
        ReducerTest::new(CheckoutReducer::new())
            .with_env(env())
            .given_state(CheckoutState::Submitting {
                correlation_id: Uuid::nil(),
            })
            .when_action(CheckoutAction::TimedOut {
                correlation_id: Uuid::nil(),
            })
            .then_state(|state| {
                assert_eq!(
                    *state,
                    CheckoutState::Failed {
                        message: GENERIC_SUBMISSION_FAILURE.to_string()
                    }
                );
            })
            .run();
    }

    #[test]
    fn free_shipping_from_threshold() {
        let policy = ShippingPolicy {
            flat_fee: Money::from_major(80),
            free_shipping_threshold: Some(Money::from_major(1500)),
        };

        assert_eq!(policy.fee_for(Money::from_major(1499)), Money::from_major(80));
        assert_eq!(policy.fee_for(Money::from_major(1500)), Money::ZERO);
        assert_eq!(ShippingPolicy::default().fee_for(Money::from_major(10)), Money::ZERO);
    }
}
