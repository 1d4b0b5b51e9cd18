//! [`CheckoutOrchestrator`]: one call per customer submission.

use super::reducer::{
    ALREADY_SUBMITTING, CheckoutAction, CheckoutEnvironment, CheckoutReducer, CheckoutState,
    GENERIC_SUBMISSION_FAILURE,
};
use crate::cart::CartState;
use crate::order::{PaymentDetails, ShippingForm};
use crate::types::OrderId;
use crate::validation::{Violation, violation_messages};
use std::time::Duration;
use storefront_runtime::{Store, StoreError};
use thiserror::Error;
use uuid::Uuid;

/// Default upper bound on one submission, validation to cart clear
pub const DEFAULT_CHECKOUT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runtime store type for checkout
pub type CheckoutRuntime = Store<CheckoutState, CheckoutAction, CheckoutEnvironment, CheckoutReducer>;

/// Why a submission did not produce an order
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// The draft broke business rules; nothing was sent
    #[error("order is invalid: {}", violation_messages(.violations).join("; "))]
    ValidationFailure {
        /// Every violation found, in rule order
        violations: Vec<Violation>,
    },

    /// Transport failure, backend rejection or a concurrent attempt
    #[error("{message}")]
    SubmissionFailure {
        /// Message for the customer
        message: String,
    },
}

impl CheckoutError {
    fn submission(message: impl Into<String>) -> Self {
        Self::SubmissionFailure {
            message: message.into(),
        }
    }
}

/// Turns a cart plus form input into a placed order
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    store: CheckoutRuntime,
    timeout: Duration,
}

impl CheckoutOrchestrator {
    /// Orchestrator with [`DEFAULT_CHECKOUT_TIMEOUT`]
    #[must_use]
    pub fn new(environment: CheckoutEnvironment) -> Self {
        Self::with_timeout(environment, DEFAULT_CHECKOUT_TIMEOUT)
    }

    /// Orchestrator that gives up on a submission after `timeout`
    #[must_use]
    pub fn with_timeout(environment: CheckoutEnvironment, timeout: Duration) -> Self {
        Self {
            store: Store::new(CheckoutState::Idle, CheckoutReducer::new(), environment),
            timeout,
        }
    }

    /// Submit the cart that the environment's [`CartStore`](crate::cart::CartStore) holds right now
    ///
    /// # Errors
    ///
    /// See [`submit`](Self::submit).
    pub async fn checkout(
        &self,
        form: ShippingForm,
        payment_method: impl Into<String>,
        payment_details: PaymentDetails,
    ) -> Result<OrderId, CheckoutError> {
        let cart = self.store.environment().cart.snapshot().await;
        self.submit(&cart, form, payment_method, payment_details)
            .await
    }

    /// Validate and submit an order for `cart`
    ///
    /// On success the cart has been cleared and `OrderPlaced` published
    /// before this returns. On any failure the cart is untouched.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::ValidationFailure`]: the draft broke business rules
    /// - [`CheckoutError::SubmissionFailure`]: transport failure, backend
    ///   rejection, timeout, or another submission already in flight
    #[tracing::instrument(skip_all, fields(payment_method = tracing::field::Empty))]
    pub async fn submit(
        &self,
        cart: &CartState,
        form: ShippingForm,
        payment_method: impl Into<String>,
        payment_details: PaymentDetails,
    ) -> Result<OrderId, CheckoutError> {
        let payment_method = payment_method.into();
        tracing::Span::current().record("payment_method", payment_method.as_str());

        let correlation_id = Uuid::new_v4();
        let action = CheckoutAction::Submit {
            correlation_id,
            cart: cart.clone(),
            form,
            payment_method,
            payment_details,
        };

        let outcome = self
            .store
            .send_and_wait_for(
                action,
                |action| action.terminal_correlation_id() == Some(correlation_id),
                self.timeout,
            )
            .await;

        match outcome {
            Ok(CheckoutAction::OrderCompleted { order_id, .. }) => Ok(order_id),
            Ok(CheckoutAction::ValidationFailed { violations, .. }) => {
                Err(CheckoutError::ValidationFailure { violations })
            },
            Ok(CheckoutAction::SubmissionFailed { message, .. }) => {
                Err(CheckoutError::submission(message))
            },
            Ok(CheckoutAction::AlreadySubmitting { .. }) => {
                Err(CheckoutError::submission(ALREADY_SUBMITTING))
            },
            Ok(other) => {
                tracing::error!(?other, "Unexpected checkout outcome");
                Err(CheckoutError::submission(GENERIC_SUBMISSION_FAILURE))
            },
            Err(StoreError::Timeout) => {
                if let Err(error) = self
                    .store
                    .send(CheckoutAction::TimedOut { correlation_id })
                    .await
                {
                    tracing::debug!(%error, "Could not record checkout timeout");
                }
                Err(CheckoutError::submission(GENERIC_SUBMISSION_FAILURE))
            },
            Err(error) => {
                tracing::error!(%error, "Checkout store unavailable");
                Err(CheckoutError::submission(GENERIC_SUBMISSION_FAILURE))
            },
        }
    }

    /// Where the most recent submission stands
    pub async fn state(&self) -> CheckoutState {
        self.store.state(CheckoutState::clone).await
    }

    /// The underlying runtime store
    #[must_use]
    pub const fn store(&self) -> &CheckoutRuntime {
        &self.store
    }

    /// Wait for an in-flight submission to settle
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ShutdownTimeout`] if a submission is still running after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
        self.store.shutdown(timeout).await
    }
}
