//! Order record and its enumerations as they appear on the wire

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Payment
// ============================================================================

/// Payment mode chosen at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PaymentMode {
    /// Cash on delivery (COD)
    #[serde(rename = "cod")]
    Cash,
    #[serde(rename = "card")]
    Card,
}

impl PaymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "cod",
            PaymentMode::Card => "card",
        }
    }

    /// Human readable label used by the filter bar
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "Cash On Delivery",
            PaymentMode::Card => "Card",
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment status reported by the payment gateway
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Fulfillment
// ============================================================================

/// Fulfillment status.
///
/// Variants are declared in progression order, so the derived `Ord` and
/// [`OrderStatus::ordinal`] both follow the forward sequence.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Received,
    Confirmed,
    Preparing,
    OutForDelivery,
    /// Terminal
    Delivered,
}

impl OrderStatus {
    /// Every status in forward order
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Received,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
    ];

    /// Position in the forward sequence (0..=4)
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Received => "received",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Display label ("Out For Delivery")
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Received => "Received",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::OutForDelivery => "Out For Delivery",
            OrderStatus::Delivered => "Delivered",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Order
// ============================================================================

/// Order record as served by the order service and carried by realtime events.
///
/// Only the fields the live feed reasons about are typed. Cart, address,
/// customer, comment and pricing breakdown are kept verbatim in `extra` and
/// written back unchanged on serialization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    /// Order ID (document id `_id`)
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub payment_mode: PaymentMode,
    pub payment_status: PaymentStatus,
    /// Events may omit the status; a freshly created order is `received`
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Opaque pass-through fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Order {
    pub fn new(id: impl Into<String>, payment_mode: PaymentMode, payment_status: PaymentStatus) -> Self {
        Self {
            id: id.into(),
            payment_mode,
            payment_status,
            order_status: OrderStatus::default(),
            total: Decimal::ZERO,
            tenant_id: None,
            created_at: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.order_status = status;
        self
    }

    pub fn with_total(mut self, total: Decimal) -> Self {
        self.total = total;
        self
    }

    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Free-text customer comment, if any
    pub fn comment(&self) -> Option<&str> {
        self.extra.get("comment").and_then(|v| v.as_str())
    }
}
