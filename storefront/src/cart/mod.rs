//! The in-session cart.
//!
//! [`CartState`] guarantees its invariants by construction; [`CartReducer`]
//! adds the event announcements and best-effort mirror writes around each
//! operation; [`CartStore`] is the async facade the rest of the app uses.

mod reducer;
mod store;
mod types;

pub use reducer::{CartAction, CartEnvironment, CartReducer};
pub use store::{CartRuntime, CartStore};
pub use types::{CartLine, CartState};
