//! Client configuration
//!
//! # Environment
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | ORDER_SERVICE_URL | http://localhost:5503 | Order service base URL |
//! | WEB_SOCKET_URL | ws://localhost:5504 | Realtime endpoint |
//! | REQUEST_TIMEOUT_SECS | 30 | REST request timeout |
//! | ORDERS_PAGE_LIMIT | 10 | Default orders per page |
//! | LOG_LEVEL | info | Tracing filter |
//! | LOG_DIR | - | Directory for daily log files |

use shared::order::DEFAULT_PAGE_LIMIT;

/// Client configuration for connecting to the order service
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Order service base URL (e.g., "http://localhost:5503")
    pub order_service_url: String,

    /// Realtime endpoint (ws:// or wss://)
    pub socket_url: String,

    /// Bearer token, when the deployment uses header auth
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout: u64,

    /// Default orders per page
    pub page_limit: u32,

    /// Tracing filter directive
    pub log_level: String,

    /// Log directory (stdout only when unset)
    pub log_dir: Option<String>,
}

impl ClientConfig {
    /// Create a new client configuration
    pub fn new(order_service_url: impl Into<String>, socket_url: impl Into<String>) -> Self {
        Self {
            order_service_url: order_service_url.into(),
            socket_url: socket_url.into(),
            token: None,
            timeout: 30,
            page_limit: DEFAULT_PAGE_LIMIT,
            log_level: "info".into(),
            log_dir: None,
        }
    }

    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or unparsable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            order_service_url: lookup("ORDER_SERVICE_URL").unwrap_or(defaults.order_service_url),
            socket_url: lookup("WEB_SOCKET_URL").unwrap_or(defaults.socket_url),
            token: lookup("ORDER_SERVICE_TOKEN"),
            timeout: lookup("REQUEST_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout),
            page_limit: lookup("ORDERS_PAGE_LIMIT")
                .and_then(|v| v.parse().ok())
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.page_limit),
            log_level: lookup("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: lookup("LOG_DIR"),
        }
    }

    /// Set the bearer token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Set the default page size
    pub fn with_page_limit(mut self, limit: u32) -> Self {
        self.page_limit = limit;
        self
    }

    /// Create an HTTP client from this configuration
    pub fn build_http_client(&self) -> crate::ClientResult<crate::HttpClient> {
        crate::HttpClient::new(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:5503", "ws://localhost:5504")
    }
}
