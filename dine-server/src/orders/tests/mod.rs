//! Order service test helpers
//!
//! In-memory database, seeded menu/table fixtures and fanout taps shared
//! by the lifecycle and flow tests (and by the payment reconciler tests).

mod test_flows;

use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use tokio::sync::mpsc;

use shared::feed::{ADMIN_TOPIC, ServerFrame, order_topic};
use shared::models::{
    DiningTable, DiningTableCreate, MenuItem, MenuItemCreate, OrderCreate, OrderItemInput,
    OrderView,
};

use crate::db;
use crate::db::repository::{DiningTableRepository, MenuItemRepository};
use crate::fanout::{ChannelSubscriber, FanoutHub};
use crate::orders::OrderService;

pub(crate) struct TestContext {
    pub db: Surreal<Db>,
    pub hub: Arc<FanoutHub>,
    pub orders: OrderService,
}

pub(crate) async fn setup() -> TestContext {
    let db = db::connect_memory().await.expect("open memory db");
    let hub = Arc::new(FanoutHub::new());
    let orders = OrderService::new(db.clone(), hub.clone());
    TestContext { db, hub, orders }
}

pub(crate) struct SeededMenu {
    pub table: DiningTable,
    pub pho: MenuItem,
    pub rolls: MenuItem,
}

/// Seed one table and two menu items (50000 / 30000 minor units)
pub(crate) async fn seed(ctx: &TestContext) -> SeededMenu {
    let tables = DiningTableRepository::new(ctx.db.clone());
    let table = tables
        .create(DiningTableCreate {
            name: "T1".into(),
            capacity: Some(4),
        })
        .await
        .expect("seed table");

    let menu = MenuItemRepository::new(ctx.db.clone());
    let pho = menu
        .create(MenuItemCreate {
            name: "Pho Bo".into(),
            price: 50_000,
        })
        .await
        .expect("seed pho");
    let rolls = menu
        .create(MenuItemCreate {
            name: "Goi Cuon".into(),
            price: 30_000,
        })
        .await
        .expect("seed rolls");

    SeededMenu { table, pho, rolls }
}

/// Place the standard two-line order: 2× 50000 + 1× 30000 = 130000
pub(crate) async fn place_standard_order(ctx: &TestContext, seeded: &SeededMenu) -> OrderView {
    ctx.orders
        .place_order(OrderCreate {
            table_id: seeded.table.id,
            customer_name: "Linh".into(),
            items: vec![
                OrderItemInput {
                    menu_item_id: seeded.pho.id,
                    quantity: 2,
                },
                OrderItemInput {
                    menu_item_id: seeded.rolls.id,
                    quantity: 1,
                },
            ],
        })
        .await
        .expect("place order")
}

/// Tap the admin topic; returns the frame receiver
pub(crate) fn tap_admin(ctx: &TestContext) -> mpsc::Receiver<ServerFrame> {
    let (subscriber, rx) = ChannelSubscriber::new(32);
    ctx.hub.subscribe(ADMIN_TOPIC, Arc::new(subscriber));
    rx
}

/// Tap one order's topic; returns the frame receiver
pub(crate) fn tap_order(ctx: &TestContext, order_id: i64) -> mpsc::Receiver<ServerFrame> {
    let (subscriber, rx) = ChannelSubscriber::new(32);
    ctx.hub.subscribe(&order_topic(order_id), Arc::new(subscriber));
    rx
}

/// Drain every pending OrderUpdate frame from a receiver
pub(crate) fn drain_updates(rx: &mut mpsc::Receiver<ServerFrame>) -> Vec<OrderView> {
    let mut views = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        if let ServerFrame::OrderUpdate { order } = frame {
            views.push(*order);
        }
    }
    views
}
