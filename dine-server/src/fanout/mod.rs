//! 事件扇出模块
//!
//! # 架构
//!
//! ```text
//! OrderService / PaymentReconciler (post-commit)
//!        │ publish_order(OrderView)
//!        ▼
//! ┌─────────────────────────────────────────┐
//! │               FanoutHub                  │
//! │   topic ──► { subscriber id ──► handle } │
//! │   "order:<id>"  顾客会话                  │
//! │   "admin"       全部员工看板              │
//! └───────────────────┬─────────────────────┘
//!                     │ Subscriber trait  ◄── 可插拔传输
//!                     ▼
//!              ChannelSubscriber ──► TCP feed 连接
//! ```
//!
//! 无持久化队列：掉线的订阅者错过事件后，可通过 HTTP 读路径取回
//! 权威状态；每次推送都携带完整水合的订单快照，而非增量。

pub mod feed;
pub mod hub;

pub use feed::FeedServer;
pub use hub::{ChannelSubscriber, FanoutHub, Subscriber};
