//! Shared types for the live order feed
//!
//! Wire-level types used by the dashboard client: orders and their
//! realtime events, list query keys, realtime channel frames and the
//! authenticated user.

pub mod client;
pub mod error;
pub mod message;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::PayloadError;
pub use message::{ChannelFrame, Packet};
pub use order::{Order, OrderEventType, OrderStatus, OrderUpdate, PageSnapshot, QueryKey};
