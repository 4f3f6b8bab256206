//! Feed Client - live order feed for the operations dashboard
//!
//! Loads paginated order lists from the order service, keeps them cached per
//! view, and folds realtime `order-update` events into the active view.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod feed;
pub mod http;
pub mod logger;
pub mod message;
pub mod session;
pub mod status;

pub use api::OrderApi;
pub use cache::{CacheChange, FetchState, MergeOutcome, OrderQueryCache, ViewEpoch};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use feed::OrderFeed;
pub use http::HttpClient;
pub use session::{AppSession, SessionError};
pub use status::{OrderStatusMachine, StatusChangeError, available_targets};

// Realtime channel
pub use message::{MemoryTransport, MessageError, RealtimeOrderChannel, Transport, WsTransport};

// Re-export shared types for convenience
pub use shared::client::{Role, Tenant, User};
pub use shared::order::{Order, OrderStatus, OrderUpdate, PageSnapshot, QueryKey};
