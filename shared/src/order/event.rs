//! Realtime order events
//!
//! The order service pushes a full order snapshot with every event, so the
//! envelope is just the event type plus the order.

use super::types::Order;
use crate::error::PayloadError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Event type enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    /// Order placed by a customer
    OrderCreated,
    /// Payment gateway reported a new payment status
    PaymentStatusUpdate,
    /// Any event type this client does not know about
    #[serde(other)]
    Other,
}

impl fmt::Display for OrderEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderEventType::OrderCreated => write!(f, "ORDER_CREATED"),
            OrderEventType::PaymentStatusUpdate => write!(f, "PAYMENT_STATUS_UPDATE"),
            OrderEventType::Other => write!(f, "OTHER"),
        }
    }
}

/// `order-update` payload: `{ eventType, data }`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub event_type: OrderEventType,
    pub data: Order,
}

impl OrderUpdate {
    pub fn new(event_type: OrderEventType, data: Order) -> Self {
        Self { event_type, data }
    }

    pub fn created(data: Order) -> Self {
        Self::new(OrderEventType::OrderCreated, data)
    }

    pub fn payment_status(data: Order) -> Self {
        Self::new(OrderEventType::PaymentStatusUpdate, data)
    }

    /// Decode an event payload received on the realtime channel
    pub fn from_value(value: serde_json::Value) -> Result<Self, PayloadError> {
        if !value.is_object() {
            return Err(PayloadError::NotAnObject("order-update"));
        }
        serde_json::from_value(value).map_err(PayloadError::from)
    }

    pub fn order_id(&self) -> &str {
        &self.data.id
    }
}
