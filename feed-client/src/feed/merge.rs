//! Merge engine: fold an admitted order into a page snapshot
//!
//! Both functions here are pure reducers so they can be exercised without a
//! channel, a cache or a runtime.

use shared::order::{Order, OrderUpdate, PageSnapshot};

use super::admission::admit;

/// Merge `order` into `snapshot`.
///
/// - absent id: the order is prepended (most recent admission first) and
///   `total` is left alone; only a refetch corrects the server count.
/// - present id: the entry is overwritten in place, keeping its position. The
///   fulfillment status never moves backwards, so a late duplicate cannot
///   regress what is already on screen.
///
/// Items are never removed, and applying the same order twice yields the
/// same snapshot as applying it once.
pub fn merge(mut snapshot: PageSnapshot, order: Order) -> PageSnapshot {
    match snapshot.position(&order.id) {
        Some(index) => {
            let current = &mut snapshot.items[index];
            let status = current.order_status.max(order.order_status);
            *current = order;
            current.order_status = status;
        }
        None => snapshot.items.insert(0, order),
    }
    snapshot
}

/// Admission followed by merge; a rejected event leaves the snapshot untouched
pub fn reduce(snapshot: PageSnapshot, update: &OrderUpdate) -> PageSnapshot {
    if admit(update) {
        merge(snapshot, update.data.clone())
    } else {
        snapshot
    }
}
