//! Order Module
//!
//! Types shared by the live order feed:
//! - Order record and its enumerations
//! - Realtime event envelope
//! - Page snapshots and list query keys

pub mod event;
pub mod query;
pub mod snapshot;
pub mod types;

// Re-exports
pub use event::{OrderEventType, OrderUpdate};
pub use query::{
    DEFAULT_PAGE_LIMIT, DETAIL_FIELDS, OrderFilters, OrderPage, QueryKey, StatusChangeRequest,
};
pub use snapshot::PageSnapshot;
pub use types::*;
