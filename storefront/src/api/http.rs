//! reqwest implementation of the backend collaborators.

use super::{ApiEnvelope, ApiError, CartMirror, Credentials, NotificationApi, OrderApi};
use crate::cart::CartLine;
use crate::notifications::NotificationRecord;
use crate::order::OrderDraft;
use crate::types::{Money, NotificationId, OrderId, ProductId};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

/// HTTP+JSON client for the storefront backend
#[derive(Clone, Debug)]
pub struct HttpStorefrontApi {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

#[derive(Deserialize)]
struct UnreadCount {
    count: u32,
}

impl HttpStorefrontApi {
    /// Client without a request timeout
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the TLS backend cannot be initialized.
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, credentials, None)
    }

    /// Client whose requests fail after `timeout`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] if the TLS backend cannot be initialized.
    pub fn with_timeout(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Same client, different caller identity
    #[must_use]
    pub fn with_credentials(&self, credentials: Credentials) -> Self {
        Self {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            credentials,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}/{path}", self.base_url))
            .header("Accept", "application/json");

        match &self.credentials {
            Credentials::Bearer(token) => builder.bearer_auth(token),
            Credentials::GuestSession(session_id) => builder.header("X-Session-ID", session_id),
            Credentials::Anonymous => builder,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiEnvelope<T>, ApiError> {
        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ApiEnvelope<Value>>(&body)
                .ok()
                .and_then(|envelope| envelope.rejection_message());
            tracing::debug!(status = status.as_u16(), ?message, "Backend returned an error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;

        if !envelope.is_success() {
            return Err(ApiError::Rejected {
                message: envelope.rejection_message(),
            });
        }

        Ok(envelope)
    }

    /// Runs a request whose payload is irrelevant
    async fn command(&self, request: RequestBuilder) -> Result<(), ApiError> {
        self.execute::<Value>(request).await.map(|_| ())
    }
}

/// Order id from a confirmed response, trying the shapes backends use
fn extract_order_id(data: &Value) -> Option<OrderId> {
    let candidates = [
        data.get("id"),
        data.get("order_id"),
        data.get("order").and_then(|order| order.get("id")),
        data.get("order_number"),
    ];

    candidates.into_iter().flatten().find_map(|value| match value {
        Value::String(id) if !id.is_empty() => Some(OrderId::new(id.clone())),
        Value::Number(id) => Some(OrderId::new(id.to_string())),
        _ => None,
    })
}

/// A list payload, either bare or wrapped by a paginator / container key
fn list_payload<T: DeserializeOwned>(data: Option<Value>, key: &str) -> Result<Vec<T>, ApiError> {
    let items = match data {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(mut wrapper)) => wrapper.remove(key).unwrap_or(Value::Array(Vec::new())),
        Some(other) => other,
    };
    serde_json::from_value(items).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Cart line as the backend stores it; the local dedup key is derived again
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteCartLine {
    #[serde(alias = "product_id")]
    product_id: ProductId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    variant: Option<String>,
    price: Money,
    quantity: Option<u32>,
}

impl From<RemoteCartLine> for CartLine {
    fn from(remote: RemoteCartLine) -> Self {
        Self {
            id: CartLine::line_id(remote.product_id, remote.variant.as_deref()),
            product_id: remote.product_id,
            name: remote.name,
            image: remote.image,
            variant: remote.variant,
            price: remote.price,
            quantity: remote.quantity.unwrap_or(1),
        }
    }
}

fn cart_item_path(product_id: ProductId) -> String {
    format!("cart/{product_id}")
}

#[async_trait]
impl OrderApi for HttpStorefrontApi {
    async fn submit_order(&self, draft: &OrderDraft) -> Result<OrderId, ApiError> {
        let envelope = self
            .execute::<Value>(self.request(Method::POST, "orders").json(draft))
            .await?;

        let order_id = envelope.data.as_ref().and_then(extract_order_id);
        Ok(order_id.unwrap_or_else(|| {
            tracing::warn!("Order confirmed without an order id");
            OrderId::new("unknown".to_string())
        }))
    }
}

#[async_trait]
impl NotificationApi for HttpStorefrontApi {
    async fn list(&self) -> Result<Vec<NotificationRecord>, ApiError> {
        let envelope = self
            .execute::<Value>(self.request(Method::GET, "notifications"))
            .await?;
        list_payload(envelope.data, "data")
    }

    async fn unread_count(&self) -> Result<u32, ApiError> {
        let envelope = self
            .execute::<UnreadCount>(self.request(Method::GET, "notifications/unread-count"))
            .await?;
        envelope
            .data
            .map(|data| data.count)
            .ok_or_else(|| ApiError::Decode("unread count response has no data".to_string()))
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), ApiError> {
        self.command(self.request(Method::PUT, &format!("notifications/{id}/read")))
            .await
    }

    async fn mark_all_read(&self) -> Result<(), ApiError> {
        self.command(self.request(Method::PUT, "notifications/mark-all-read"))
            .await
    }

    async fn delete(&self, id: NotificationId) -> Result<(), ApiError> {
        self.command(self.request(Method::DELETE, &format!("notifications/{id}")))
            .await
    }
}

#[async_trait]
impl CartMirror for HttpStorefrontApi {
    async fn fetch(&self) -> Result<Vec<CartLine>, ApiError> {
        let envelope = self
            .execute::<Value>(self.request(Method::GET, "cart"))
            .await?;
        let lines: Vec<RemoteCartLine> = list_payload(envelope.data, "items")?;
        Ok(lines.into_iter().map(CartLine::from).collect())
    }

    async fn add(&self, line: &CartLine) -> Result<(), ApiError> {
        let body = json!({
            "productId": line.product_id,
            "variant": line.variant,
            "quantity": 1,
        });
        self.command(self.request(Method::POST, "cart").json(&body))
            .await
    }

    async fn update_quantity(
        &self,
        product_id: ProductId,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<(), ApiError> {
        let body = json!({ "variant": variant, "quantity": quantity });
        self.command(
            self.request(Method::PUT, &cart_item_path(product_id))
                .json(&body),
        )
        .await
    }

    async fn remove(&self, product_id: ProductId, variant: Option<&str>) -> Result<(), ApiError> {
        let mut request = self.request(Method::DELETE, &cart_item_path(product_id));
        if let Some(variant) = variant {
            request = request.query(&[("variant", variant)]);
        }
        self.command(request).await
    }

    async fn clear(&self) -> Result<(), ApiError> {
        self.command(self.request(Method::DELETE, "cart")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_id_lookup_order() {
        assert_eq!(
            extract_order_id(&json!({"id": 42, "order_number": "ORD-1"})),
            Some(OrderId::new("42".to_string()))
        );
        assert_eq!(
            extract_order_id(&json!({"order_id": "A-7"})),
            Some(OrderId::new("A-7".to_string()))
        );
        assert_eq!(
            extract_order_id(&json!({"order": {"id": 5}})),
            Some(OrderId::new("5".to_string()))
        );
        assert_eq!(
            extract_order_id(&json!({"order_number": "ORD-2025-0001"})),
            Some(OrderId::new("ORD-2025-0001".to_string()))
        );
        assert_eq!(extract_order_id(&json!({"status": "pending"})), None);
    }

    #[test]
    fn list_payload_accepts_bare_and_paginated() {
        let bare: Result<Vec<u32>, _> = list_payload(Some(json!([1, 2])), "data");
        let paginated: Result<Vec<u32>, _> =
            list_payload(Some(json!({"current_page": 1, "data": [3]})), "data");
        let missing: Result<Vec<u32>, _> = list_payload(None, "data");

        assert_eq!(bare.ok(), Some(vec![1, 2]));
        assert_eq!(paginated.ok(), Some(vec![3]));
        assert_eq!(missing.ok(), Some(vec![]));
    }

    #[test]
    fn remote_line_gets_local_id() {
        let remote: Result<RemoteCartLine, _> = serde_json::from_value(json!({
            "id": 991,
            "product_id": 12,
            "name": "Tee",
            "variant": "large",
            "price": "300.00",
            "quantity": 2
        }));
        let line = remote.map(CartLine::from).ok();

        assert_eq!(line.as_ref().map(|l| l.id.as_str()), Some("12:large"));
        assert_eq!(line.as_ref().map(|l| l.quantity), Some(2));
    }
}
