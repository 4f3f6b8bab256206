// feed-client/src/message/mod.rs
// 实时通道模块 - 传输层、订单事件通道和错误类型

pub mod channel;
pub mod transport;

pub use channel::{Delivery, DeliveryHandler, RealtimeOrderChannel};
pub use shared::message::{ChannelFrame, Packet};
pub use transport::{MemoryTransport, Transport, WsTransport};

use shared::PayloadError;
use thiserror::Error;

/// 实时通道错误
#[derive(Debug, Error)]
pub enum MessageError {
    /// 无法建立连接
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Socket.IO 握手失败
    #[error("Handshake failed: {0}")]
    Handshake(String),

    /// 对端关闭了连接
    #[error("Connection closed")]
    Closed,

    /// 载荷无法编码/解码
    #[error("Invalid payload: {0}")]
    Payload(#[from] PayloadError),

    /// WebSocket 层错误
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}

impl MessageError {
    /// 连接层面的错误 (读循环应当停止)
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MessageError::Payload(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_errors_are_not_fatal() {
        let err = MessageError::from(PayloadError::InvalidPacket("x".into()));
        assert!(!err.is_fatal());
        assert!(MessageError::Closed.is_fatal());
        assert!(MessageError::Connection("refused".into()).is_fatal());
    }
}
