//! Order fulfillment status progression
//!
//! RECEIVED → CONFIRMED → PREPARING → OUT_FOR_DELIVERY → DELIVERED
//!
//! Forward jumps of any size are legal; going back is not. The command is
//! pessimistic: the cache only changes once the order service confirms.

use shared::order::{DETAIL_FIELDS, Order, OrderStatus};
use std::sync::Arc;
use thiserror::Error;

use crate::ClientError;
use crate::api::OrderApi;
use crate::cache::OrderQueryCache;

/// Status change failure
#[derive(Debug, Error)]
pub enum StatusChangeError {
    /// Target is behind the last confirmed status; no request was sent
    #[error("Cannot move order from {current} back to {target}")]
    Regression {
        current: OrderStatus,
        target: OrderStatus,
    },

    /// The order service rejected the command or could not be reached
    #[error(transparent)]
    Api(#[from] ClientError),
}

/// States selectable from `current`: itself and everything after it
pub fn available_targets(current: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .iter()
        .copied()
        .filter(|s| s.ordinal() >= current.ordinal())
        .collect()
}

pub fn is_allowed(current: OrderStatus, target: OrderStatus) -> bool {
    target.ordinal() >= current.ordinal()
}

/// Issues status-change commands and reconciles the cache on success
#[derive(Clone)]
pub struct OrderStatusMachine {
    api: Arc<dyn OrderApi>,
    cache: OrderQueryCache,
}

impl OrderStatusMachine {
    pub fn new(api: Arc<dyn OrderApi>, cache: OrderQueryCache) -> Self {
        Self { api, cache }
    }

    /// Move `order_id` to `target`.
    ///
    /// The target is checked against the furthest status any cached copy has
    /// reached. On success every cached copy of the order shows `target` and
    /// all order views are marked stale. On failure the cache is left as it was.
    pub async fn request_status_change(
        &self,
        order_id: &str,
        target: OrderStatus,
    ) -> Result<Order, StatusChangeError> {
        if let Some(current) = self.cache.known_status(order_id)
            && !is_allowed(current, target)
        {
            tracing::warn!(order_id = %order_id, %current, %target, "Status regression refused");
            return Err(StatusChangeError::Regression { current, target });
        }

        let order = match self
            .api
            .update_order_status(order_id, target, DETAIL_FIELDS)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                tracing::warn!(order_id = %order_id, %target, error = %e, "Status change failed");
                return Err(e.into());
            }
        };

        let copies = self.cache.set_order_status(order_id, target);
        self.cache.invalidate_orders();
        tracing::info!(order_id = %order_id, %target, copies, "Order status changed");
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use shared::order::{OrderPage, PageSnapshot, PaymentMode, PaymentStatus, QueryKey};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        fail: bool,
        calls: Mutex<Vec<(String, OrderStatus)>>,
    }

    #[async_trait]
    impl OrderApi for FakeApi {
        async fn list_orders(&self, _key: &QueryKey) -> crate::ClientResult<OrderPage> {
            unimplemented!()
        }

        async fn get_order(&self, _order_id: &str, _fields: &str) -> crate::ClientResult<Order> {
            unimplemented!()
        }

        async fn update_order_status(
            &self,
            order_id: &str,
            status: OrderStatus,
            _fields: &str,
        ) -> crate::ClientResult<Order> {
            self.calls.lock().unwrap().push((order_id.to_string(), status));
            if self.fail {
                return Err(ClientError::Internal("500: boom".into()));
            }
            Ok(Order::new(order_id, PaymentMode::Cash, PaymentStatus::Pending).with_status(status))
        }
    }

    fn cache_with(status: OrderStatus) -> OrderQueryCache {
        let cache = OrderQueryCache::new();
        let key = QueryKey::default();
        cache.activate(key.clone());
        let order = Order::new("o1", PaymentMode::Cash, PaymentStatus::Pending).with_status(status);
        cache.store_page(key, PageSnapshot::new(vec![order.clone()], 1));
        cache.store_order(order);
        cache
    }

    #[test]
    fn test_available_targets() {
        assert_eq!(available_targets(OrderStatus::Received), OrderStatus::ALL.to_vec());
        assert_eq!(
            available_targets(OrderStatus::Preparing),
            vec![
                OrderStatus::Preparing,
                OrderStatus::OutForDelivery,
                OrderStatus::Delivered
            ]
        );
        assert_eq!(
            available_targets(OrderStatus::Delivered),
            vec![OrderStatus::Delivered]
        );
    }

    #[test]
    fn test_is_allowed() {
        assert!(is_allowed(OrderStatus::Received, OrderStatus::Delivered));
        assert!(is_allowed(OrderStatus::Confirmed, OrderStatus::Confirmed));
        assert!(!is_allowed(OrderStatus::OutForDelivery, OrderStatus::Confirmed));
    }

    #[tokio::test]
    async fn test_change_updates_cache_and_invalidates() {
        let cache = cache_with(OrderStatus::Received);
        let api = Arc::new(FakeApi::default());
        let machine = OrderStatusMachine::new(api.clone(), cache.clone());

        let order = machine
            .request_status_change("o1", OrderStatus::Delivered)
            .await
            .unwrap();
        assert_eq!(order.order_status, OrderStatus::Delivered);

        let page = cache.active_page().unwrap();
        assert_eq!(page.get("o1").unwrap().order_status, OrderStatus::Delivered);
        assert_eq!(cache.order("o1").unwrap().order_status, OrderStatus::Delivered);
        assert!(cache.is_stale(&QueryKey::default()));
        assert_eq!(
            available_targets(cache.known_status("o1").unwrap()),
            vec![OrderStatus::Delivered]
        );
    }

    #[tokio::test]
    async fn test_failure_leaves_cache_untouched() {
        let cache = cache_with(OrderStatus::Confirmed);
        let api = Arc::new(FakeApi {
            fail: true,
            ..Default::default()
        });
        let machine = OrderStatusMachine::new(api, cache.clone());

        let err = machine
            .request_status_change("o1", OrderStatus::Preparing)
            .await
            .unwrap_err();
        assert!(matches!(err, StatusChangeError::Api(ClientError::Internal(_))));
        assert_eq!(cache.known_status("o1"), Some(OrderStatus::Confirmed));
        assert!(!cache.is_stale(&QueryKey::default()));
    }

    #[tokio::test]
    async fn test_regression_is_refused_without_a_request() {
        let cache = cache_with(OrderStatus::OutForDelivery);
        let api = Arc::new(FakeApi::default());
        let machine = OrderStatusMachine::new(api.clone(), cache);

        let err = machine
            .request_status_change("o1", OrderStatus::Received)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StatusChangeError::Regression {
                current: OrderStatus::OutForDelivery,
                target: OrderStatus::Received
            }
        ));
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_regression_checked_against_newest_copy() {
        let cache = cache_with(OrderStatus::Received);
        let epoch = cache.epoch();
        // live update moves the list copy ahead of the detail view
        cache.merge_admitted(
            epoch,
            Order::new("o1", PaymentMode::Cash, PaymentStatus::Pending)
                .with_status(OrderStatus::OutForDelivery),
        );
        let api = Arc::new(FakeApi::default());
        let machine = OrderStatusMachine::new(api.clone(), cache.clone());

        let err = machine
            .request_status_change("o1", OrderStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StatusChangeError::Regression {
                current: OrderStatus::OutForDelivery,
                target: OrderStatus::Confirmed
            }
        ));
        let page = cache.active_page().unwrap();
        assert_eq!(page.get("o1").unwrap().order_status, OrderStatus::OutForDelivery);
        assert!(api.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_order_goes_to_the_service() {
        let api = Arc::new(FakeApi::default());
        let machine = OrderStatusMachine::new(api.clone(), OrderQueryCache::new());

        machine
            .request_status_change("elsewhere", OrderStatus::Confirmed)
            .await
            .unwrap();
        assert_eq!(
            *api.calls.lock().unwrap(),
            vec![("elsewhere".to_string(), OrderStatus::Confirmed)]
        );
    }
}
