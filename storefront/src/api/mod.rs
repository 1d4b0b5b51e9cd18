//! Collaborators at the backend boundary.
//!
//! The reducers only see these traits. [`HttpStorefrontApi`] implements all of
//! them over HTTP+JSON; the in-memory versions in [`crate::mocks`] back the tests.

use crate::cart::CartLine;
use crate::notifications::NotificationRecord;
use crate::order::OrderDraft;
use crate::types::{NotificationId, OrderId, ProductId};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

mod http;

pub use http::HttpStorefrontApi;

/// Errors raised by backend calls
#[derive(Clone, Debug, Error)]
pub enum ApiError {
    /// Network failure, timeout or unreadable body
    #[error("Request failed: {0}")]
    Transport(String),

    /// Non-2xx response
    #[error("Backend returned status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Message from the error body, if any
        message: Option<String>,
    },

    /// 2xx response with `success: false`
    #[error("Backend rejected the request")]
    Rejected {
        /// Message from the response, if any
        message: Option<String>,
    },

    /// Response body did not have the expected shape
    #[error("Response parsing failed: {0}")]
    Decode(String),
}

impl ApiError {
    /// The backend-provided message suitable for the customer, if any
    #[must_use]
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::Rejected { message } => message.as_deref(),
            Self::Transport(_) | Self::Decode(_) => None,
        }
    }
}

/// How requests identify the caller
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Credentials {
    /// Authenticated user: `Authorization: Bearer <token>`
    Bearer(String),
    /// Guest cart session: `X-Session-ID: <id>`
    GuestSession(String),
    /// No identification
    Anonymous,
}

/// Response envelope shared by every backend endpoint
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    /// Missing means success for 2xx responses
    pub success: Option<bool>,
    /// Human-readable message
    pub message: Option<String>,
    /// Payload
    pub data: Option<T>,
    /// A list of messages, or a `{field: [messages]}` map
    pub errors: Option<Value>,
}

impl<T> ApiEnvelope<T> {
    /// True unless the backend said `success: false`
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(true)
    }

    /// `message`, else the `errors` entries joined with `"; "`
    #[must_use]
    pub fn rejection_message(&self) -> Option<String> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
            .map(ToString::to_string)
            .or_else(|| self.errors.as_ref().and_then(join_errors))
    }
}

fn join_errors(errors: &Value) -> Option<String> {
    let mut messages = Vec::new();
    collect_messages(errors, &mut messages);
    (!messages.is_empty()).then(|| messages.join("; "))
}

fn collect_messages(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(message) if !message.trim().is_empty() => out.push(message.clone()),
        Value::Array(values) => values.iter().for_each(|v| collect_messages(v, out)),
        Value::Object(fields) => fields.values().for_each(|v| collect_messages(v, out)),
        _ => {},
    }
}

/// Order submission endpoint
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Submit a validated draft; returns the order id on a confirmed 2xx
    ///
    /// # Errors
    ///
    /// Any transport failure, non-2xx status or `success: false` response.
    async fn submit_order(&self, draft: &OrderDraft) -> Result<OrderId, ApiError>;
}

/// Notification endpoints
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Full current notification list, newest first
    ///
    /// # Errors
    ///
    /// Transport, status or decode failures.
    async fn list(&self) -> Result<Vec<NotificationRecord>, ApiError>;

    /// Number of unread notifications
    ///
    /// # Errors
    ///
    /// Transport, status or decode failures.
    async fn unread_count(&self) -> Result<u32, ApiError>;

    /// Mark one notification read
    ///
    /// # Errors
    ///
    /// Transport, status or rejection failures.
    async fn mark_read(&self, id: NotificationId) -> Result<(), ApiError>;

    /// Mark every notification read
    ///
    /// # Errors
    ///
    /// Transport, status or rejection failures.
    async fn mark_all_read(&self) -> Result<(), ApiError>;

    /// Delete one notification
    ///
    /// # Errors
    ///
    /// Transport, status or rejection failures.
    async fn delete(&self, id: NotificationId) -> Result<(), ApiError>;
}

/// Optional remote copy of the cart, keyed by user token or guest session
///
/// Writes are best-effort; the in-memory cart stays authoritative.
#[async_trait]
pub trait CartMirror: Send + Sync {
    /// Current remote lines
    ///
    /// # Errors
    ///
    /// Transport, status or decode failures.
    async fn fetch(&self) -> Result<Vec<CartLine>, ApiError>;

    /// Add one unit of a line
    ///
    /// # Errors
    ///
    /// Transport, status or rejection failures.
    async fn add(&self, line: &CartLine) -> Result<(), ApiError>;

    /// Set the quantity of a product/variant
    ///
    /// # Errors
    ///
    /// Transport, status or rejection failures.
    async fn update_quantity(
        &self,
        product_id: ProductId,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<(), ApiError>;

    /// Remove a product/variant
    ///
    /// # Errors
    ///
    /// Transport, status or rejection failures.
    async fn remove(&self, product_id: ProductId, variant: Option<&str>) -> Result<(), ApiError>;

    /// Remove every line
    ///
    /// # Errors
    ///
    /// Transport, status or rejection failures.
    async fn clear(&self) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code can unwrap

    use super::*;

    fn envelope(json: &str) -> ApiEnvelope<Value> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn message_wins_over_errors() {
        let env = envelope(r#"{"success":false,"message":"Out of stock","errors":["x"]}"#);
        assert!(!env.is_success());
        assert_eq!(env.rejection_message().as_deref(), Some("Out of stock"));
    }

    #[test]
    fn error_list_is_joined() {
        let env = envelope(r#"{"success":false,"errors":["Bad phone","Bad zip"]}"#);
        assert_eq!(env.rejection_message().as_deref(), Some("Bad phone; Bad zip"));
    }

    #[test]
    fn field_error_map_is_flattened() {
        let env = envelope(
            r#"{"success":false,"message":"","errors":{"email":["Email taken"],"phone":["Bad phone"]}}"#,
        );
        assert_eq!(env.rejection_message().as_deref(), Some("Email taken; Bad phone"));
    }

    #[test]
    fn no_message_at_all() {
        let env = envelope(r#"{"success":false}"#);
        assert_eq!(env.rejection_message(), None);
    }

    #[test]
    fn missing_success_means_success() {
        assert!(envelope(r#"{"data":{"count":2}}"#).is_success());
    }

    #[test]
    fn user_message_only_for_backend_errors() {
        let rejected = ApiError::Rejected {
            message: Some("Card declined".to_string()),
        };
        assert_eq!(rejected.user_message(), Some("Card declined"));
        assert_eq!(ApiError::Transport("reset".to_string()).user_message(), None);
    }
}
