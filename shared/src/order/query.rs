//! 订单列表查询
//!
//! `QueryKey` identifies one cached view of the order list: tenant scope,
//! filter selection and pagination. Two keys are equal exactly when they
//! would produce the same `GET api/order` request.

use super::types::{Order, OrderStatus, PaymentMode, PaymentStatus};
use serde::{Deserialize, Serialize};

/// 默认每页数量
pub const DEFAULT_PAGE_LIMIT: u32 = 10;

/// Fields requested for the single-order view
pub const DETAIL_FIELDS: &str =
    "cart,address,total,comment,orderStatus,paymentMode,paymentStatus,createdAt,customerId,customer";

/// Optional filter selections from the orders filter bar
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_mode: Option<PaymentMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_status: Option<OrderStatus>,
}

impl OrderFilters {
    pub fn with_payment_status(mut self, status: PaymentStatus) -> Self {
        self.payment_status = Some(status);
        self
    }

    pub fn with_payment_mode(mut self, mode: PaymentMode) -> Self {
        self.payment_mode = Some(mode);
        self
    }

    pub fn with_order_status(mut self, status: OrderStatus) -> Self {
        self.order_status = Some(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payment_status.is_none() && self.payment_mode.is_none() && self.order_status.is_none()
    }
}

/// Cache key of one order list view
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryKey {
    /// None = all tenants (admin only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub filters: OrderFilters,
    /// 页码 (从 1 开始)
    pub page: u32,
    pub limit: u32,
}

impl QueryKey {
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            tenant_id: None,
            filters: OrderFilters::default(),
            page: page.max(1),
            limit,
        }
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    pub fn with_filters(mut self, filters: OrderFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Same view, different page
    pub fn at_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// Query string pairs for `GET api/order`; unset filters are omitted
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("limit", self.limit.to_string())];
        if let Some(tenant_id) = &self.tenant_id {
            pairs.push(("tenantId", tenant_id.clone()));
        }
        if let Some(status) = self.filters.payment_status {
            pairs.push(("paymentStatus", status.as_str().to_string()));
        }
        if let Some(mode) = self.filters.payment_mode {
            pairs.push(("paymentMode", mode.as_str().to_string()));
        }
        if let Some(status) = self.filters.order_status {
            pairs.push(("orderStatus", status.as_str().to_string()));
        }
        pairs
    }
}

impl Default for QueryKey {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

/// `GET api/order` response body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderPage {
    pub data: Vec<Order>,
    pub total: u64,
}

/// `PATCH api/order/{id}/status` request body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChangeRequest {
    pub status: OrderStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_pairs_skip_unset_filters() {
        let key = QueryKey::new(2, 20);
        assert_eq!(
            key.to_query_pairs(),
            vec![("page", "2".to_string()), ("limit", "20".to_string())]
        );
    }

    #[test]
    fn test_query_pairs_with_everything() {
        let key = QueryKey::new(1, 10).with_tenant("t1").with_filters(
            OrderFilters::default()
                .with_payment_status(PaymentStatus::Paid)
                .with_payment_mode(PaymentMode::Cash)
                .with_order_status(OrderStatus::OutForDelivery),
        );

        let pairs = key.to_query_pairs();
        assert!(pairs.contains(&("tenantId", "t1".to_string())));
        assert!(pairs.contains(&("paymentStatus", "paid".to_string())));
        assert!(pairs.contains(&("paymentMode", "cod".to_string())));
        assert!(pairs.contains(&("orderStatus", "out_for_delivery".to_string())));
    }

    #[test]
    fn test_keys_differ_by_page_and_filters() {
        let base = QueryKey::default();
        assert_ne!(base, base.at_page(2));
        assert_ne!(
            base,
            base.clone()
                .with_filters(OrderFilters::default().with_payment_mode(PaymentMode::Card))
        );
        assert_eq!(base, QueryKey::new(1, DEFAULT_PAGE_LIMIT));
        assert_eq!(QueryKey::new(0, 10).page, 1);
    }
}
