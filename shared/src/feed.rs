//! 实时推送协议类型
//!
//! 服务端与客户端共享的帧定义。帧在 TCP 连接上以
//! 4 字节小端长度前缀 + JSON 编码传输（见 dine-server 的 fanout 模块）。

use serde::{Deserialize, Serialize};

use crate::models::OrderView;

/// The staff-dashboard topic every staff connection joins
pub const ADMIN_TOPIC: &str = "admin";

/// Topic name for a single order's live session
pub fn order_topic(order_id: i64) -> String {
    format!("order:{order_id}")
}

/// 客户端 -> 服务端帧
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Join a topic (`order:<id>` or `admin`); idempotent
    Join { topic: String },
    /// Leave a topic; idempotent
    Leave { topic: String },
}

/// 服务端 -> 客户端帧
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Membership acknowledged
    Joined { topic: String },
    /// Membership removed
    Left { topic: String },
    /// A state change committed; carries the fully-hydrated order
    OrderUpdate { order: Box<OrderView> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_topic_format() {
        assert_eq!(order_topic(42), "order:42");
    }

    #[test]
    fn test_client_frame_wire_format() {
        let frame = ClientFrame::Join {
            topic: "admin".into(),
        };
        let json = serde_json::to_string(&frame).unwrap();
        assert_eq!(json, r#"{"type":"join","topic":"admin"}"#);

        let back: ClientFrame = serde_json::from_str(r#"{"type":"leave","topic":"order:7"}"#).unwrap();
        assert_eq!(
            back,
            ClientFrame::Leave {
                topic: "order:7".into()
            }
        );
    }
}
