//! # Storefront
//!
//! Client-side core of an e-commerce storefront: the in-session cart, order
//! validation, checkout, and notification reconciliation against a
//! storefront backend.
//!
//! Each stateful feature is a reducer behind a [`Store`](storefront_runtime::Store):
//!
//! - [`cart::CartStore`]: canonical cart, optionally mirrored to the backend
//! - [`checkout::CheckoutOrchestrator`]: validate, submit, clear, announce
//! - [`notifications::NotificationReconciler`]: polled notification view with
//!   optimistic read state
//!
//! Features talk to each other through the [`events::StorefrontEvent`] bus
//! rather than by holding references to each other, with one exception:
//! checkout clears the cart directly once an order is confirmed.
//!
//! ## Example
//!
//! ```ignore
//! let events: SharedEventBus = Arc::new(BroadcastEventBus::default());
//! let api = Arc::new(config.api_client(Credentials::Bearer(token))?);
//!
//! let cart = CartStore::new(CartEnvironment::new(events.clone()));
//! let checkout = CheckoutOrchestrator::new(CheckoutEnvironment {
//!     orders: api.clone(),
//!     cart: cart.clone(),
//!     events: events.clone(),
//!     shipping: config.shipping,
//! });
//!
//! cart.add_item(line).await;
//! let order_id = checkout.checkout(form, "cod", PaymentDetails::default()).await?;
//! ```

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod events;
pub mod mocks;
pub mod notifications;
pub mod order;
pub mod types;
pub mod validation;

pub use api::{ApiError, Credentials, HttpStorefrontApi};
pub use cart::{CartLine, CartState, CartStore};
pub use checkout::{CheckoutError, CheckoutOrchestrator};
pub use config::{ConfigError, StorefrontConfig};
pub use events::{SharedEventBus, StorefrontEvent, Toast, ToastKind};
pub use notifications::{NotificationReconciler, PollingStrategy};
pub use types::{Money, NotificationId, OrderId, ProductId};
