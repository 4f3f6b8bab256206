//! Live order feed
//!
//! - [`admission`]: which events make an order visible
//! - [`merge`]: how an admitted order folds into a page
//! - [`OrderFeed`]: REST load + realtime channel + cache, wired together

pub mod admission;
pub mod merge;

pub use admission::admit;
pub use merge::{merge, reduce};

use shared::order::{DETAIL_FIELDS, Order, OrderEventType, PageSnapshot, QueryKey};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::ClientResult;
use crate::api::OrderApi;
use crate::cache::{MergeOutcome, OrderQueryCache};
use crate::message::{Delivery, MessageError, RealtimeOrderChannel, Transport};
use crate::status::OrderStatusMachine;

/// The live order feed for one dashboard view
pub struct OrderFeed {
    api: Arc<dyn OrderApi>,
    cache: OrderQueryCache,
    channel: RealtimeOrderChannel,
}

impl std::fmt::Debug for OrderFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderFeed")
            .field("cache", &self.cache)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl OrderFeed {
    pub fn new(api: Arc<dyn OrderApi>, cache: OrderQueryCache, transport: Arc<dyn Transport>) -> Self {
        let mut channel = RealtimeOrderChannel::new(transport, cache.view_epoch());
        for event_type in [OrderEventType::OrderCreated, OrderEventType::PaymentStatusUpdate] {
            let cache = cache.clone();
            channel.on(event_type, move |delivery| {
                apply_delivery(&cache, delivery);
            });
        }
        Self { api, cache, channel }
    }

    pub fn cache(&self) -> &OrderQueryCache {
        &self.cache
    }

    /// Tenant whose room is currently joined
    pub fn tenant(&self) -> Option<&str> {
        self.channel.tenant()
    }

    /// Status commands sharing this feed's API and cache
    pub fn status_machine(&self) -> OrderStatusMachine {
        OrderStatusMachine::new(Arc::clone(&self.api), self.cache.clone())
    }

    // ========== REST ==========

    /// Make `key` the active view and fetch it.
    ///
    /// A failed fetch is recorded as such in the cache, never as an empty page.
    pub async fn load(&self, key: QueryKey) -> ClientResult<PageSnapshot> {
        self.cache.activate(key.clone());
        match self.api.list_orders(&key).await {
            Ok(page) => {
                let snapshot = PageSnapshot::from(page);
                tracing::debug!(
                    page = key.page,
                    items = snapshot.len(),
                    total = snapshot.total,
                    "Orders loaded"
                );
                self.cache.store_page(key, snapshot.clone());
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!(page = key.page, error = %e, "Failed to load orders");
                self.cache.store_error(key, e.to_string());
                Err(e)
            }
        }
    }

    /// Refetch the active view, if there is one
    pub async fn refetch(&self) -> ClientResult<Option<PageSnapshot>> {
        match self.cache.active_key() {
            Some(key) => self.load(key).await.map(Some),
            None => Ok(None),
        }
    }

    /// Fetch a single order with its detail fields
    pub async fn load_order(&self, order_id: &str) -> ClientResult<Order> {
        let order = self.api.get_order(order_id, DETAIL_FIELDS).await?;
        self.cache.store_order(order.clone());
        Ok(order)
    }

    // ========== Realtime ==========

    /// Join the tenant's room
    pub async fn start(&mut self, tenant_id: &str) -> Result<(), MessageError> {
        self.channel.join(tenant_id).await
    }

    /// Move the subscription to another tenant; no-op if already joined there
    pub async fn switch_tenant(&mut self, tenant_id: &str) -> Result<(), MessageError> {
        if self.channel.tenant() == Some(tenant_id) {
            return Ok(());
        }
        self.channel.join(tenant_id).await
    }

    /// Process one delivery. Returns false once the subscription has ended.
    pub async fn run_once(&mut self) -> bool {
        self.channel.run_once().await
    }

    /// Process deliveries until cancelled or the subscription ends
    pub async fn run_until_cancelled(&mut self, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Order feed cancelled");
                    break;
                }
                alive = self.channel.run_once() => {
                    if !alive {
                        tracing::info!("Order feed subscription ended");
                        break;
                    }
                }
            }
        }
        self.channel.leave();
    }

    /// Tear down the subscription; later events are ignored
    pub fn leave(&mut self) {
        self.channel.leave();
    }

    /// Leave and close the transport
    pub async fn close(&mut self) -> Result<(), MessageError> {
        self.channel.close().await
    }
}

/// Handler body shared by both event types: admission, then merge
fn apply_delivery(cache: &OrderQueryCache, delivery: &Delivery) {
    let update = &delivery.update;
    if !admit(update) {
        tracing::debug!(
            order_id = %update.order_id(),
            event_type = %update.event_type,
            payment_mode = %update.data.payment_mode,
            payment_status = %update.data.payment_status,
            "Order event not admitted"
        );
        return;
    }

    match cache.merge_admitted(delivery.epoch, update.data.clone()) {
        MergeOutcome::Inserted => {
            tracing::info!(order_id = %update.order_id(), event_type = %update.event_type, "New order in feed")
        }
        MergeOutcome::Replaced => {
            tracing::debug!(order_id = %update.order_id(), "Order refreshed in feed")
        }
        MergeOutcome::Dropped(reason) => {
            tracing::debug!(order_id = %update.order_id(), ?reason, "Order event dropped")
        }
    }
}
