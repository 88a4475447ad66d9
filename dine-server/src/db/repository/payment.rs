//! Payment Repository
//!
//! 独立 payment 表，每次支付发起一行。`txn_ref` UNIQUE 索引 +
//! PENDING→终态 CAS 写入保证回调幂等：并发重复回调只有一个能赢得
//! 终态写入，其余读到已有结果。

use serde::Deserialize;
use shared::models::{Payment, PaymentState};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use super::{BaseRepository, RepoError, RepoResult};

/// Minimal CAS probe: learns whether the settle matched without fighting
/// the record-id field in the returned row
#[derive(Debug, Deserialize)]
struct CasProbe {
    #[allow(dead_code)]
    txn_ref: String,
}

#[derive(Clone)]
pub struct PaymentRepository {
    base: BaseRepository,
}

impl PaymentRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Create a payment row (always PENDING)
    ///
    /// The caller's struct is authoritative; the write is fire-and-return.
    pub async fn create(&self, payment: Payment) -> RepoResult<Payment> {
        self.base
            .db()
            .query("CREATE payment CONTENT $payment RETURN NONE")
            .bind(("payment", payment.clone()))
            .await?
            .check()?;
        Ok(payment)
    }

    /// Look up a payment by its gateway transaction reference
    pub async fn find_by_txn_ref(&self, txn_ref: &str) -> RepoResult<Option<Payment>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT *, record::id(id) AS id FROM payment WHERE txn_ref = $txn_ref LIMIT 1",
            )
            .bind(("txn_ref", txn_ref.to_string()))
            .await?;
        let payments: Vec<Payment> = result.take(0)?;
        Ok(payments.into_iter().next())
    }

    /// Most recent payment attempt for an order
    ///
    /// `txn_ref` breaks created_at ties: its nanosecond suffix is
    /// fixed-width, so the lexicographic order matches issue order.
    pub async fn find_latest_for_order(&self, order_id: i64) -> RepoResult<Option<Payment>> {
        let mut result = self
            .base
            .db()
            .query(
                "SELECT *, record::id(id) AS id FROM payment WHERE order_id = $order_id \
                 ORDER BY created_at DESC, txn_ref DESC LIMIT 1",
            )
            .bind(("order_id", order_id))
            .await?;
        let payments: Vec<Payment> = result.take(0)?;
        Ok(payments.into_iter().next())
    }

    /// All payment attempts for an order, newest first
    pub async fn find_for_order(&self, order_id: i64) -> RepoResult<Vec<Payment>> {
        let payments: Vec<Payment> = self
            .base
            .db()
            .query(
                "SELECT *, record::id(id) AS id FROM payment WHERE order_id = $order_id \
                 ORDER BY created_at DESC, txn_ref DESC",
            )
            .bind(("order_id", order_id))
            .await?
            .take(0)?;
        Ok(payments)
    }

    /// Compare-and-swap settle: PENDING → terminal
    ///
    /// Returns `None` when the row was no longer PENDING: the caller lost
    /// the race against a duplicate callback and must re-read the recorded
    /// outcome instead of applying its own.
    pub async fn cas_settle(
        &self,
        txn_ref: &str,
        status: PaymentState,
        gateway_txn_no: Option<String>,
        gateway_response_code: Option<String>,
        gateway_secure_hash: Option<String>,
        error: Option<String>,
    ) -> RepoResult<Option<Payment>> {
        debug_assert!(status.is_terminal());
        let mut result = self
            .base
            .db()
            .query(
                "UPDATE payment SET status = $status, gateway_txn_no = $txn_no, \
                 gateway_response_code = $code, gateway_secure_hash = $hash, error = $error \
                 WHERE txn_ref = $txn_ref AND status = 'PENDING' RETURN txn_ref",
            )
            .bind(("status", status))
            .bind(("txn_no", gateway_txn_no))
            .bind(("code", gateway_response_code))
            .bind(("hash", gateway_secure_hash))
            .bind(("error", error))
            .bind(("txn_ref", txn_ref.to_string()))
            .await?;
        let touched: Vec<CasProbe> = result.take(0)?;
        if touched.is_empty() {
            return Ok(None);
        }
        // The row is terminal and immutable now; the re-read is stable
        let settled = self
            .find_by_txn_ref(txn_ref)
            .await?
            .ok_or_else(|| RepoError::Database(format!("Settled payment {txn_ref} vanished")))?;
        Ok(Some(settled))
    }
}
