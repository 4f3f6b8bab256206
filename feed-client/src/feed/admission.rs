//! Admission policy: does an event make its order visible in the live feed?
//!
//! Cash orders carry no payment-abandonment risk and surface as soon as they
//! are created. Card orders surface only once the gateway confirms payment,
//! either already at creation or through a later payment status update.

use shared::order::{OrderEventType, OrderUpdate, PaymentMode, PaymentStatus};

/// Decide whether `update` is admitted into the feed
pub fn admit(update: &OrderUpdate) -> bool {
    let order = &update.data;
    match (update.event_type, order.payment_mode, order.payment_status) {
        (OrderEventType::OrderCreated, PaymentMode::Cash, _) => true,
        (OrderEventType::OrderCreated, PaymentMode::Card, PaymentStatus::Paid) => true,
        (OrderEventType::PaymentStatusUpdate, PaymentMode::Card, PaymentStatus::Paid) => true,
        // cash orders are never re-admitted through payment updates
        _ => false,
    }
}
