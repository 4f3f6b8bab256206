//! Order service seam
//!
//! The feed only needs three calls from the order service. They sit behind a
//! trait so the pipeline can run against [`crate::HttpClient`] in production
//! and against an in-memory double in tests.

use async_trait::async_trait;
use shared::order::{Order, OrderPage, OrderStatus, QueryKey};

use crate::ClientResult;

#[async_trait]
pub trait OrderApi: Send + Sync {
    /// `GET api/order?...` for one list view
    async fn list_orders(&self, key: &QueryKey) -> ClientResult<OrderPage>;

    /// `GET api/order/{id}?fields=...`
    async fn get_order(&self, order_id: &str, fields: &str) -> ClientResult<Order>;

    /// `PATCH api/order/{id}/status?fields=...` with body `{ status }`
    async fn update_order_status(
        &self,
        order_id: &str,
        status: OrderStatus,
        fields: &str,
    ) -> ClientResult<Order>;
}
