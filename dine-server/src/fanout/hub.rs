//! Fanout hub - topic membership and publish

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;

use shared::feed::{ADMIN_TOPIC, ServerFrame, order_topic};
use shared::models::OrderView;

use crate::utils::AppError;

/// 订阅者抽象
///
/// 任何能投递一帧的传输都可以实现：TCP 连接、进程内通道、未来的
/// SSE/broker 适配。核心代码只认识这个特征，不认识具体传输。
#[async_trait]
pub trait Subscriber: Send + Sync + std::fmt::Debug {
    /// Stable identity for membership bookkeeping
    fn id(&self) -> u64;

    /// Deliver one frame; an error marks the subscriber dead
    async fn deliver(&self, frame: ServerFrame) -> Result<(), AppError>;
}

static NEXT_SUBSCRIBER_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique subscriber id
pub fn next_subscriber_id() -> u64 {
    NEXT_SUBSCRIBER_ID.fetch_add(1, Ordering::Relaxed)
}

/// Channel-backed subscriber
///
/// The feed connection task owns the receiving end and writes frames to the
/// socket; tests read frames directly.
#[derive(Debug, Clone)]
pub struct ChannelSubscriber {
    id: u64,
    tx: mpsc::Sender<ServerFrame>,
}

impl ChannelSubscriber {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ServerFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                id: next_subscriber_id(),
                tx,
            },
            rx,
        )
    }
}

#[async_trait]
impl Subscriber for ChannelSubscriber {
    fn id(&self) -> u64 {
        self.id
    }

    async fn deliver(&self, frame: ServerFrame) -> Result<(), AppError> {
        // try_send: a slow consumer misses events rather than stalling the
        // publish path; the canonical state stays fetchable over HTTP.
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AppError::internal("subscriber channel full, frame dropped")
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::internal("subscriber channel closed")
            }
        })
    }
}

/// 扇出中心 - 主题到订阅者集合的注册表
///
/// 成员操作幂等；每个主题独立加锁 (DashMap 分片)，互不相关的
/// 订单完全并行。
#[derive(Debug, Default)]
pub struct FanoutHub {
    topics: DashMap<String, DashMap<u64, Arc<dyn Subscriber>>>,
}

impl FanoutHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a topic; re-joining is a no-op
    pub fn subscribe(&self, topic: &str, subscriber: Arc<dyn Subscriber>) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(subscriber.id(), subscriber);
    }

    /// Leave a topic; leaving twice is a no-op
    pub fn unsubscribe(&self, topic: &str, subscriber_id: u64) {
        if let Some(members) = self.topics.get(topic) {
            members.remove(&subscriber_id);
        }
        self.topics.remove_if(topic, |_, members| members.is_empty());
    }

    /// Remove a subscriber from every topic (connection closed)
    pub fn drop_subscriber(&self, subscriber_id: u64) {
        for members in self.topics.iter() {
            members.remove(&subscriber_id);
        }
        self.topics.retain(|_, members| !members.is_empty());
    }

    /// Number of members currently in a topic
    pub fn topic_len(&self, topic: &str) -> usize {
        self.topics.get(topic).map(|m| m.len()).unwrap_or(0)
    }

    /// Deliver a frame to every current member of a topic
    ///
    /// Dead subscribers are pruned as they fail. Returns the number of
    /// successful deliveries.
    pub async fn publish(&self, topic: &str, frame: ServerFrame) -> usize {
        // Snapshot membership first so delivery never holds a shard lock
        // across an await point.
        let members: Vec<Arc<dyn Subscriber>> = match self.topics.get(topic) {
            Some(m) => m.iter().map(|entry| entry.value().clone()).collect(),
            None => return 0,
        };

        let mut delivered = 0;
        let mut dead: Vec<u64> = Vec::new();
        for subscriber in members {
            match subscriber.deliver(frame.clone()).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(
                        topic = topic,
                        subscriber = subscriber.id(),
                        error = %e,
                        "dropping unreachable subscriber"
                    );
                    dead.push(subscriber.id());
                }
            }
        }
        for id in dead {
            self.unsubscribe(topic, id);
        }
        delivered
    }

    /// Publish a committed order state to its order topic and the admin topic
    ///
    /// Always the fully-hydrated snapshot, so any later event repairs a
    /// subscriber that missed earlier ones.
    pub async fn publish_order(&self, view: &OrderView) {
        let frame = ServerFrame::OrderUpdate {
            order: Box::new(view.clone()),
        };
        let topic = order_topic(view.id);
        let to_order = self.publish(&topic, frame.clone()).await;
        let to_admin = self.publish(ADMIN_TOPIC, frame).await;
        tracing::debug!(
            order_id = view.id,
            status = %view.status,
            to_order,
            to_admin,
            "order state published"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_view(id: i64) -> OrderView {
        OrderView {
            id,
            status: shared::models::OrderStatus::Pending,
            payment_status: shared::models::OrderPaymentStatus::Unpaid,
            total_amount: 0,
            table_id: 1,
            table_name: "T1".into(),
            customer_name: "Test".into(),
            staff_id: None,
            staff_name: None,
            items: vec![],
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn test_subscribe_publish_unsubscribe() {
        let hub = FanoutHub::new();
        let (sub, mut rx) = ChannelSubscriber::new(8);
        let id = sub.id();
        let sub: Arc<dyn Subscriber> = Arc::new(sub);

        hub.subscribe("order:1", sub.clone());
        assert_eq!(hub.topic_len("order:1"), 1);

        let delivered = hub
            .publish(
                "order:1",
                ServerFrame::Joined {
                    topic: "order:1".into(),
                },
            )
            .await;
        assert_eq!(delivered, 1);
        assert!(matches!(
            rx.recv().await,
            Some(ServerFrame::Joined { .. })
        ));

        hub.unsubscribe("order:1", id);
        assert_eq!(hub.topic_len("order:1"), 0);
        let delivered = hub
            .publish(
                "order:1",
                ServerFrame::Joined {
                    topic: "order:1".into(),
                },
            )
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_subscribe_is_idempotent() {
        let hub = FanoutHub::new();
        let (sub, mut rx) = ChannelSubscriber::new(8);
        let sub: Arc<dyn Subscriber> = Arc::new(sub);

        hub.subscribe("admin", sub.clone());
        hub.subscribe("admin", sub.clone());
        assert_eq!(hub.topic_len("admin"), 1);

        hub.publish_order(&test_view(9)).await;
        // One member, one admin delivery, not two
        assert!(matches!(rx.recv().await, Some(ServerFrame::OrderUpdate { .. })));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_publish_order_reaches_both_topics() {
        let hub = FanoutHub::new();
        let (customer, mut customer_rx) = ChannelSubscriber::new(8);
        let (staff, mut staff_rx) = ChannelSubscriber::new(8);

        hub.subscribe("order:7", Arc::new(customer));
        hub.subscribe(ADMIN_TOPIC, Arc::new(staff));

        hub.publish_order(&test_view(7)).await;

        let frame = customer_rx.recv().await.unwrap();
        let ServerFrame::OrderUpdate { order } = frame else {
            panic!("expected order update");
        };
        assert_eq!(order.id, 7);
        assert!(matches!(
            staff_rx.recv().await,
            Some(ServerFrame::OrderUpdate { .. })
        ));
    }

    #[tokio::test]
    async fn test_dead_subscriber_is_pruned() {
        let hub = FanoutHub::new();
        let (sub, rx) = ChannelSubscriber::new(1);
        drop(rx); // receiver gone: deliveries fail
        hub.subscribe("admin", Arc::new(sub));

        let delivered = hub
            .publish(
                "admin",
                ServerFrame::Left {
                    topic: "admin".into(),
                },
            )
            .await;
        assert_eq!(delivered, 0);
        assert_eq!(hub.topic_len("admin"), 0);
    }

    #[tokio::test]
    async fn test_drop_subscriber_leaves_all_topics() {
        let hub = FanoutHub::new();
        let (sub, _rx) = ChannelSubscriber::new(8);
        let id = sub.id();
        let sub: Arc<dyn Subscriber> = Arc::new(sub);

        hub.subscribe("order:1", sub.clone());
        hub.subscribe("order:2", sub.clone());
        hub.subscribe(ADMIN_TOPIC, sub);

        hub.drop_subscriber(id);
        assert_eq!(hub.topic_len("order:1"), 0);
        assert_eq!(hub.topic_len("order:2"), 0);
        assert_eq!(hub.topic_len(ADMIN_TOPIC), 0);
    }
}
