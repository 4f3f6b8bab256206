//! Page snapshot - the cached page of orders for one (filters, page) view

use super::query::OrderPage;
use super::types::Order;
use serde::{Deserialize, Serialize};

/// One page of orders as rendered by the dashboard.
///
/// `items` holds at most one entry per order id. Its order reflects admission
/// history once live events have been merged, and is only brought back in line
/// with the server's sort order by a full refetch. `total` is the server's
/// count from the last fetch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PageSnapshot {
    pub items: Vec<Order>,
    pub total: u64,
}

impl PageSnapshot {
    pub fn new(items: Vec<Order>, total: u64) -> Self {
        Self { items, total }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Index of the order with `id`, if present
    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|o| o.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&Order> {
        self.items.iter().find(|o| o.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Order ids in display order
    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|o| o.id.as_str()).collect()
    }
}

impl From<OrderPage> for PageSnapshot {
    fn from(page: OrderPage) -> Self {
        Self {
            items: page.data,
            total: page.total,
        }
    }
}
