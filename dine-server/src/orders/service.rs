//! Order service - placement, transitions, hydration
//!
//! The single writer of `Order.status`. Every mutation commits through a
//! compare-and-swap keyed on `updated_at`, so concurrent staff/customer
//! actions on one order serialize against each other while unrelated
//! orders proceed fully in parallel.

use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use validator::Validate;

use shared::models::{
    Order, OrderCreate, OrderDetail, OrderItemView, OrderPaymentStatus, OrderStatus, OrderView,
};
use shared::util::{now_millis, snowflake_id};

use super::error::OrderError;
use crate::db::repository::{
    DiningTableRepository, EmployeeRepository, MenuItemRepository, OrderRepository,
};
use crate::fanout::FanoutHub;

/// 单笔订单 CAS 重试上限
///
/// 输掉竞争后重读重验；连续输掉说明该订单上存在异常热点，放弃并
/// 报告 ConcurrentUpdate。
const CAS_RETRIES: usize = 3;

#[derive(Clone)]
pub struct OrderService {
    db: Surreal<Db>,
    hub: Arc<FanoutHub>,
}

impl OrderService {
    pub fn new(db: Surreal<Db>, hub: Arc<FanoutHub>) -> Self {
        Self { db, hub }
    }

    fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.db.clone())
    }

    /// Place a new order (customer or staff manual entry)
    ///
    /// Snapshots menu names and prices into the details, computes the total
    /// from those snapshots, and writes order + details in one storage
    /// transaction. Publishes the hydrated snapshot post-commit.
    pub async fn place_order(&self, req: OrderCreate) -> Result<OrderView, OrderError> {
        req.validate()
            .map_err(|e| OrderError::Validation(e.to_string()))?;

        let tables = DiningTableRepository::new(self.db.clone());
        let table = tables
            .find_by_id(req.table_id)
            .await?
            .ok_or(OrderError::TableNotFound(req.table_id))?;

        let menu = MenuItemRepository::new(self.db.clone());
        let order_id = snowflake_id();
        let mut details = Vec::with_capacity(req.items.len());
        for item in &req.items {
            let menu_item = menu
                .find_by_id(item.menu_item_id)
                .await?
                .filter(|m| m.is_active)
                .ok_or(OrderError::MenuItemNotFound(item.menu_item_id))?;
            details.push(OrderDetail {
                order_id,
                menu_item_id: menu_item.id,
                name: menu_item.name,
                quantity: item.quantity,
                price_at_order: menu_item.price,
            });
        }

        let total_amount: i64 = details.iter().map(OrderDetail::line_total).sum();
        let now = now_millis();
        let order = Order {
            id: order_id,
            status: OrderStatus::Pending,
            payment_status: OrderPaymentStatus::Unpaid,
            total_amount,
            table_id: table.id,
            customer_name: req.customer_name,
            staff_id: None,
            created_at: now,
            updated_at: now,
        };

        let created = self.orders().create_with_details(order, details).await?;
        tracing::info!(
            order_id = created.id,
            table = %table.name,
            total = created.total_amount,
            "order placed"
        );

        let view = self.hydrate(created).await?;
        self.hub.publish_order(&view).await;
        Ok(view)
    }

    /// Apply a lifecycle transition
    ///
    /// Guard, commit and fanout in that order; the fanout only ever sees
    /// committed state. `acting_staff` stamps `staff_id` when a staff
    /// member performs the action (kitchen moves, denial, cash settlement).
    pub async fn transition(
        &self,
        order_id: i64,
        target: OrderStatus,
        acting_staff: Option<i64>,
    ) -> Result<OrderView, OrderError> {
        let repo = self.orders();

        for _ in 0..CAS_RETRIES {
            let order = repo
                .find_by_id(order_id)
                .await?
                .ok_or(OrderError::NotFound(order_id))?;

            if !order.status.can_transition_to(target) {
                return Err(OrderError::InvalidTransition {
                    from: order.status,
                    to: target,
                });
            }

            let mark_paid = target == OrderStatus::Paid;
            match repo
                .cas_update_status(order_id, order.updated_at, target, mark_paid, acting_staff)
                .await?
            {
                Some(updated) => {
                    tracing::info!(
                        order_id,
                        from = %order.status,
                        to = %target,
                        staff = ?acting_staff,
                        "order transitioned"
                    );
                    let view = self.hydrate(updated).await?;
                    self.hub.publish_order(&view).await;
                    return Ok(view);
                }
                // Lost the race: re-read, the guard may now reject
                None => continue,
            }
        }

        Err(OrderError::ConcurrentUpdate(order_id))
    }

    /// Re-derive the total from the details and persist a correction
    ///
    /// Defensive path used before quoting the gateway: the stored total is
    /// never trusted over the line items.
    pub async fn recompute_total(&self, order: Order) -> Result<Order, OrderError> {
        let repo = self.orders();
        let details = repo.find_details(order.id).await?;
        let derived: i64 = details.iter().map(OrderDetail::line_total).sum();
        if derived == order.total_amount {
            return Ok(order);
        }

        tracing::warn!(
            order_id = order.id,
            stored = order.total_amount,
            derived,
            "stored total drifted from line items, correcting"
        );
        repo.cas_update_total(order.id, order.updated_at, derived)
            .await?
            .ok_or(OrderError::ConcurrentUpdate(order.id))
    }

    /// Fetch an order row
    pub async fn get_order(&self, order_id: i64) -> Result<Order, OrderError> {
        self.orders()
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))
    }

    /// Fetch the hydrated view of an order
    pub async fn get_view(&self, order_id: i64) -> Result<OrderView, OrderError> {
        let order = self.get_order(order_id).await?;
        self.hydrate(order).await
    }

    /// List order rows, newest first
    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
        status: Option<OrderStatus>,
    ) -> Result<Vec<Order>, OrderError> {
        Ok(self.orders().find_all(limit, offset, status).await?)
    }

    /// Assemble the fully-hydrated projection for an order row
    pub async fn hydrate(&self, order: Order) -> Result<OrderView, OrderError> {
        let details = self.orders().find_details(order.id).await?;
        let items: Vec<OrderItemView> = details
            .into_iter()
            .map(|d| {
                let line_total = d.line_total();
                OrderItemView {
                    menu_item_id: d.menu_item_id,
                    name: d.name,
                    quantity: d.quantity,
                    price_at_order: d.price_at_order,
                    line_total,
                }
            })
            .collect();

        let table_name = DiningTableRepository::new(self.db.clone())
            .find_by_id(order.table_id)
            .await?
            .map(|t| t.name)
            .unwrap_or_default();

        let staff_name = match order.staff_id {
            Some(staff_id) => EmployeeRepository::new(self.db.clone())
                .find_by_id(staff_id)
                .await?
                .map(|e| e.name),
            None => None,
        };

        Ok(OrderView {
            id: order.id,
            status: order.status,
            payment_status: order.payment_status,
            total_amount: order.total_amount,
            table_id: order.table_id,
            table_name,
            customer_name: order.customer_name,
            staff_id: order.staff_id,
            staff_name,
            items,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
    }
}
