//! Order Repository
//!
//! Order rows and their line items. Two write paths only:
//! - atomic create of an order together with all of its details;
//! - compare-and-swap updates keyed on `updated_at`, which serialize all
//!   mutations of a single order without a process-wide lock.
//!
//! The table is named `orders` (not `order`) to stay clear of the
//! `ORDER BY` keyword in SurrealQL. The business id doubles as the record
//! key (`orders:<i64>`).

use serde::Deserialize;
use shared::models::{Order, OrderDetail, OrderPaymentStatus, OrderStatus};
use shared::util::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult, record_id};

const TABLE: &str = "orders";

/// Minimal CAS probe: enough to learn whether the UPDATE matched, without
/// fighting the record-id field in the returned row
#[derive(Debug, Deserialize)]
struct CasProbe {
    #[allow(dead_code)]
    updated_at: i64,
}

#[derive(Clone)]
pub struct OrderRepository {
    base: BaseRepository,
}

impl OrderRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Create an order and its details in one storage transaction
    ///
    /// Details are never written outside this path, so the total invariant
    /// holds from the first observable moment of the order. The caller's
    /// struct is authoritative; the write is fire-and-verify.
    pub async fn create_with_details(
        &self,
        order: Order,
        details: Vec<OrderDetail>,
    ) -> RepoResult<Order> {
        self.base
            .db()
            .query(
                r#"
                BEGIN TRANSACTION;
                CREATE orders CONTENT $order RETURN NONE;
                INSERT INTO order_detail $details;
                COMMIT TRANSACTION;
                "#,
            )
            .bind(("order", order.clone()))
            .bind(("details", details))
            .await?
            .check()?;

        self.find_by_id(order.id)
            .await?
            .ok_or_else(|| RepoError::Database("Failed to create order".to_string()))
    }

    /// Find order by id
    pub async fn find_by_id(&self, id: i64) -> RepoResult<Option<Order>> {
        let mut result = self
            .base
            .db()
            .query("SELECT *, record::id(id) AS id FROM orders WHERE id = $id LIMIT 1")
            .bind(("id", record_id(TABLE, id)))
            .await?;
        let orders: Vec<Order> = result.take(0)?;
        Ok(orders.into_iter().next())
    }

    /// List orders, newest first, optionally filtered by status
    pub async fn find_all(
        &self,
        limit: i64,
        offset: i64,
        status: Option<OrderStatus>,
    ) -> RepoResult<Vec<Order>> {
        let sql = if status.is_some() {
            "SELECT *, record::id(id) AS id FROM orders WHERE status = $status \
             ORDER BY created_at DESC LIMIT $limit START $offset"
        } else {
            "SELECT *, record::id(id) AS id FROM orders \
             ORDER BY created_at DESC LIMIT $limit START $offset"
        };
        let mut query = self
            .base
            .db()
            .query(sql)
            .bind(("limit", limit))
            .bind(("offset", offset));
        if let Some(status) = status {
            query = query.bind(("status", status));
        }
        let orders: Vec<Order> = query.await?.take(0)?;
        Ok(orders)
    }

    /// Fetch the line items of an order
    pub async fn find_details(&self, order_id: i64) -> RepoResult<Vec<OrderDetail>> {
        let details: Vec<OrderDetail> = self
            .base
            .db()
            .query("SELECT * FROM order_detail WHERE order_id = $order_id ORDER BY menu_item_id")
            .bind(("order_id", order_id))
            .await?
            .take(0)?;
        Ok(details)
    }

    /// Compare-and-swap status write
    ///
    /// Matches only when `updated_at` still equals `expected_updated_at`;
    /// returns `None` when the CAS lost (a concurrent writer got there
    /// first). The new `updated_at` is strictly greater than the expected
    /// one even within a single millisecond, so a stale token can never
    /// match twice.
    pub async fn cas_update_status(
        &self,
        id: i64,
        expected_updated_at: i64,
        target: OrderStatus,
        mark_paid: bool,
        staff_id: Option<i64>,
    ) -> RepoResult<Option<Order>> {
        let now = now_millis().max(expected_updated_at + 1);

        let mut set_clause = String::from("status = $status, updated_at = $now");
        if mark_paid {
            set_clause.push_str(", payment_status = $payment_status");
        }
        if staff_id.is_some() {
            set_clause.push_str(", staff_id = $staff_id");
        }
        let sql = format!(
            "UPDATE orders SET {set_clause} WHERE id = $id AND updated_at = $expected RETURN updated_at"
        );

        let mut query = self
            .base
            .db()
            .query(sql)
            .bind(("status", target))
            .bind(("now", now))
            .bind(("id", record_id(TABLE, id)))
            .bind(("expected", expected_updated_at));
        if mark_paid {
            query = query.bind(("payment_status", OrderPaymentStatus::Paid));
        }
        if let Some(staff_id) = staff_id {
            query = query.bind(("staff_id", staff_id));
        }

        let touched: Vec<CasProbe> = query.await?.take(0)?;
        if touched.is_empty() {
            return Ok(None);
        }
        self.find_by_id(id).await
    }

    /// Compare-and-swap total correction
    ///
    /// Used by the defensive re-derivation before quoting the gateway.
    pub async fn cas_update_total(
        &self,
        id: i64,
        expected_updated_at: i64,
        total_amount: i64,
    ) -> RepoResult<Option<Order>> {
        let now = now_millis().max(expected_updated_at + 1);
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE orders SET total_amount = $total, updated_at = $now \
                 WHERE id = $id AND updated_at = $expected RETURN updated_at",
            )
            .bind(("total", total_amount))
            .bind(("now", now))
            .bind(("id", record_id(TABLE, id)))
            .bind(("expected", expected_updated_at))
            .await?;
        let touched: Vec<CasProbe> = result.take(0)?;
        if touched.is_empty() {
            return Ok(None);
        }
        self.find_by_id(id).await
    }
}
