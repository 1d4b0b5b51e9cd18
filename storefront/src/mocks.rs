//! In-memory backends for tests and offline runs.
//!
//! Each mock records what it was asked to do and can be told to fail, so
//! rollback and degradation paths can be exercised without a server.

use crate::api::{ApiError, CartMirror, NotificationApi, OrderApi};
use crate::cart::CartLine;
use crate::notifications::NotificationRecord;
use crate::order::OrderDraft;
use crate::types::{NotificationId, OrderId, ProductId};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn simulated_failure() -> ApiError {
    ApiError::Transport("simulated network failure".to_string())
}

/// Order endpoint that accepts or rejects every draft
#[derive(Debug)]
pub struct InMemoryOrderApi {
    outcome: Result<OrderId, ApiError>,
    delay: Option<Duration>,
    submitted: Mutex<Vec<OrderDraft>>,
}

impl Default for InMemoryOrderApi {
    fn default() -> Self {
        Self::succeeding(OrderId::new("ORD-1".to_string()))
    }
}

impl InMemoryOrderApi {
    /// Confirms every draft with `order_id`
    #[must_use]
    pub fn succeeding(order_id: OrderId) -> Self {
        Self {
            outcome: Ok(order_id),
            delay: None,
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Fails every draft with `error`
    #[must_use]
    pub fn rejecting(error: ApiError) -> Self {
        Self {
            outcome: Err(error),
            delay: None,
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Answer only after `delay`
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every draft received so far
    #[must_use]
    pub fn submitted(&self) -> Vec<OrderDraft> {
        lock(&self.submitted).clone()
    }
}

#[async_trait]
impl OrderApi for InMemoryOrderApi {
    async fn submit_order(&self, draft: &OrderDraft) -> Result<OrderId, ApiError> {
        lock(&self.submitted).push(draft.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

/// Notification backend holding its own copy of the records
#[derive(Debug, Default)]
pub struct InMemoryNotificationApi {
    records: Mutex<Vec<NotificationRecord>>,
    list_calls: AtomicUsize,
    mark_read_calls: Mutex<Vec<NotificationId>>,
    fail_fetch: AtomicBool,
    fail_mark_read: AtomicBool,
    fail_mark_all: AtomicBool,
    fail_delete: AtomicBool,
}

impl InMemoryNotificationApi {
    /// Backend that already holds `records`, newest first
    #[must_use]
    pub fn with_notifications(records: Vec<NotificationRecord>) -> Self {
        let api = Self::default();
        api.set_notifications(records);
        api
    }

    /// Replace the server-side list
    pub fn set_notifications(&self, records: Vec<NotificationRecord>) {
        *lock(&self.records) = records;
    }

    /// A new notification arrives on the server
    pub fn push(&self, record: NotificationRecord) {
        lock(&self.records).insert(0, record);
    }

    /// Server-side list as it stands
    #[must_use]
    pub fn notifications(&self) -> Vec<NotificationRecord> {
        lock(&self.records).clone()
    }

    /// How many times the list was fetched
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Ids sent to the single mark-read endpoint, in order
    #[must_use]
    pub fn mark_read_calls(&self) -> Vec<NotificationId> {
        lock(&self.mark_read_calls).clone()
    }

    /// Make list and count requests fail
    pub fn fail_fetch(&self, fail: bool) {
        self.fail_fetch.store(fail, Ordering::SeqCst);
    }

    /// Make single mark-read requests fail
    pub fn fail_mark_read(&self, fail: bool) {
        self.fail_mark_read.store(fail, Ordering::SeqCst);
    }

    /// Make mark-all requests fail
    pub fn fail_mark_all(&self, fail: bool) {
        self.fail_mark_all.store(fail, Ordering::SeqCst);
    }

    /// Make delete requests fail
    pub fn fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), ApiError> {
        if flag.load(Ordering::SeqCst) {
            Err(simulated_failure())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl NotificationApi for InMemoryNotificationApi {
    async fn list(&self) -> Result<Vec<NotificationRecord>, ApiError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Self::check(&self.fail_fetch)?;
        Ok(self.notifications())
    }

    async fn unread_count(&self) -> Result<u32, ApiError> {
        Self::check(&self.fail_fetch)?;
        let unread = lock(&self.records).iter().filter(|r| !r.is_read()).count();
        Ok(u32::try_from(unread).unwrap_or(u32::MAX))
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), ApiError> {
        lock(&self.mark_read_calls).push(id);
        Self::check(&self.fail_mark_read)?;
        let mut records = lock(&self.records);
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(ApiError::Status {
                status: 404,
                message: Some("Notification not found".to_string()),
            })?;
        record.read_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), ApiError> {
        Self::check(&self.fail_mark_all)?;
        let now = Utc::now();
        for record in lock(&self.records).iter_mut() {
            record.read_at.get_or_insert(now);
        }
        Ok(())
    }

    async fn delete(&self, id: NotificationId) -> Result<(), ApiError> {
        Self::check(&self.fail_delete)?;
        lock(&self.records).retain(|r| r.id != id);
        Ok(())
    }
}

/// One write the cart pushed to its mirror
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MirrorCall {
    /// One unit added
    Add {
        /// Product added
        product_id: ProductId,
        /// Variant added
        variant: Option<String>,
    },
    /// Quantity replaced
    Quantity {
        /// Product updated
        product_id: ProductId,
        /// Variant updated
        variant: Option<String>,
        /// New quantity
        quantity: u32,
    },
    /// Line removed
    Remove {
        /// Product removed
        product_id: ProductId,
        /// Variant removed
        variant: Option<String>,
    },
    /// Cart emptied
    Clear,
}

/// Remote cart copy kept in memory
#[derive(Debug, Default)]
pub struct InMemoryCartMirror {
    lines: Mutex<Vec<CartLine>>,
    writes: Mutex<Vec<MirrorCall>>,
    fail: AtomicBool,
}

impl InMemoryCartMirror {
    /// Mirror that already holds `lines`
    #[must_use]
    pub fn with_lines(lines: Vec<CartLine>) -> Self {
        Self {
            lines: Mutex::new(lines),
            ..Self::default()
        }
    }

    /// Make every request fail
    pub fn fail_requests(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Writes received so far, in order
    #[must_use]
    pub fn writes(&self) -> Vec<MirrorCall> {
        lock(&self.writes).clone()
    }

    /// Remote lines as they stand
    #[must_use]
    pub fn lines(&self) -> Vec<CartLine> {
        lock(&self.lines).clone()
    }

    fn record(&self, call: MirrorCall) -> Result<(), ApiError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(simulated_failure());
        }
        lock(&self.writes).push(call);
        Ok(())
    }
}

#[async_trait]
impl CartMirror for InMemoryCartMirror {
    async fn fetch(&self) -> Result<Vec<CartLine>, ApiError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(simulated_failure());
        }
        Ok(self.lines())
    }

    async fn add(&self, line: &CartLine) -> Result<(), ApiError> {
        self.record(MirrorCall::Add {
            product_id: line.product_id,
            variant: line.variant.clone(),
        })?;
        let mut lines = lock(&self.lines);
        match lines.iter_mut().find(|l| l.id == line.id) {
            Some(existing) => existing.quantity += 1,
            None => lines.push(CartLine {
                quantity: 1,
                ..line.clone()
            }),
        }
        Ok(())
    }

    async fn update_quantity(
        &self,
        product_id: ProductId,
        variant: Option<&str>,
        quantity: u32,
    ) -> Result<(), ApiError> {
        self.record(MirrorCall::Quantity {
            product_id,
            variant: variant.map(str::to_string),
            quantity,
        })?;
        let id = CartLine::line_id(product_id, variant);
        if let Some(line) = lock(&self.lines).iter_mut().find(|l| l.id == id) {
            line.quantity = quantity;
        }
        Ok(())
    }

    async fn remove(&self, product_id: ProductId, variant: Option<&str>) -> Result<(), ApiError> {
        self.record(MirrorCall::Remove {
            product_id,
            variant: variant.map(str::to_string),
        })?;
        let id = CartLine::line_id(product_id, variant);
        lock(&self.lines).retain(|l| l.id != id);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ApiError> {
        self.record(MirrorCall::Clear)?;
        lock(&self.lines).clear();
        Ok(())
    }
}
