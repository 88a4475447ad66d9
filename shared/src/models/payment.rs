//! Payment Model (支付记录)
//!
//! One row per gateway initiation. `txn_ref` is the idempotency key for
//! callback processing; a row is mutated exactly once, into a terminal
//! state, by the callback handler.

use serde::{Deserialize, Serialize};

/// Payment attempt lifecycle: PENDING → SUCCESS | FAILED (terminal)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    #[default]
    Pending,
    Success,
    Failed,
}

impl PaymentState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentState::Success | PaymentState::Failed)
    }
}

/// Payment attempt record
///
/// Many rows may exist per order (retries), but at most one reaches
/// SUCCESS, guaranteed by the order-level PAID compare-and-swap plus the
/// payment-level PENDING→terminal compare-and-swap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    /// Globally unique gateway reference: `order_id` ++ nanosecond timestamp
    pub txn_ref: String,
    /// Amount quoted to the gateway, minor currency units
    pub amount: i64,
    pub status: PaymentState,
    pub gateway_txn_no: Option<String>,
    pub gateway_response_code: Option<String>,
    pub gateway_secure_hash: Option<String>,
    /// Reconciliation failure note (amount mismatch etc.), for manual review
    pub error: Option<String>,
    pub created_at: i64,
}
