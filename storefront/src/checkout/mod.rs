//! Checkout.
//!
//! A submission runs through the reducer as one correlated attempt:
//! build the draft from a cart snapshot, validate it locally, submit it,
//! and only after the backend confirms, clear the cart and publish
//! `OrderPlaced`. Validation failures never reach the network.

mod orchestrator;
mod reducer;

pub use orchestrator::{
    CheckoutError, CheckoutOrchestrator, CheckoutRuntime, DEFAULT_CHECKOUT_TIMEOUT,
};
pub use reducer::{
    ALREADY_SUBMITTING, CheckoutAction, CheckoutEnvironment, CheckoutReducer, CheckoutState,
    GENERIC_SUBMISSION_FAILURE, ShippingPolicy,
};
