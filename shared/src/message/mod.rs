//! 实时通道消息类型定义
//!
//! 订单服务通过 Socket.IO 推送租户范围内的订单事件。这里只定义
//! 客户端用到的三个事件名以及对应的载荷，传输编码见 [`packet`]。

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::PayloadError;

pub mod packet;
pub use packet::Packet;

/// 客户端 → 服务器: 加入租户房间
pub const EVENT_JOIN: &str = "join";
/// 服务器 → 客户端: 已加入房间 (仅用于日志)
pub const EVENT_CLIENT_JOINED: &str = "client-joined";
/// 服务器 → 客户端: 订单事件
pub const EVENT_ORDER_UPDATE: &str = "order-update";

/// 命名事件帧: 事件名 + JSON 数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelFrame {
    pub event: String,
    pub data: serde_json::Value,
}

impl ChannelFrame {
    pub fn new(event: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// 创建 join 帧
    pub fn join(tenant_id: &str) -> Self {
        let payload = JoinPayload {
            tenant_id: tenant_id.to_string(),
        };
        Self::new(
            EVENT_JOIN,
            serde_json::to_value(payload).unwrap_or(serde_json::Value::Null),
        )
    }

    /// 创建 order-update 帧
    pub fn order_update(update: &crate::order::OrderUpdate) -> Result<Self, PayloadError> {
        Ok(Self::new(EVENT_ORDER_UPDATE, serde_json::to_value(update)?))
    }

    /// 解析载荷为指定类型
    pub fn parse_data<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        serde_json::from_value(self.data.clone()).map_err(PayloadError::from)
    }

    pub fn is(&self, event: &str) -> bool {
        self.event == event
    }
}

/// `join` 载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub tenant_id: String,
}

/// `client-joined` 载荷
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientJoinedPayload {
    pub room_id: String,
}
