//! Error types for the shared crate
//!
//! Decoding failures for payloads received from the order service.

use thiserror::Error;

/// Payload decoding error
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Payload is not a JSON object
    #[error("{0} payload is not an object")]
    NotAnObject(&'static str),

    /// Missing or mistyped field
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Socket.IO packet could not be parsed
    #[error("Invalid packet: {0}")]
    InvalidPacket(String),
}
