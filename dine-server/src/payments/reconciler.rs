//! Payment Reconciler
//!
//! Owns the Payment record lifecycle: creates PENDING rows on initiation,
//! settles them exactly once from gateway callbacks, and drives the order
//! PAID transition on verified success.
//!
//! Duplicate callbacks are the expected path, not an error: `txn_ref` is
//! the idempotency key and the PENDING→terminal compare-and-swap picks a
//! single winner among concurrent duplicates; losers re-read and return
//! the recorded outcome.

use std::collections::HashMap;
use std::sync::Arc;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

use shared::models::{
    Order, OrderPaymentStatus, OrderStatus, Payment, PaymentState,
};
use shared::util::{now_millis, now_nanos, snowflake_id};
use shared::{AppError, ErrorCode};

use super::gateway::{
    AMOUNT_SCALE, GatewayClient, PARAM_AMOUNT, PARAM_RESPONSE_CODE, PARAM_SECURE_HASH,
    PARAM_TRANSACTION_NO, PARAM_TXN_REF, RESPONSE_CODE_SUCCESS,
};
use crate::db::repository::{PaymentRepository, RepoError};
use crate::orders::{OrderError, OrderService};

/// Errors produced by payment initiation and callback reconciliation
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Payment requested outside SERVED/UNPAID; nothing mutated
    #[error("Order {order_id} is not payable (status {status}, payment {payment_status:?})")]
    NotPayable {
        order_id: i64,
        status: OrderStatus,
        payment_status: OrderPaymentStatus,
    },

    /// Callback authenticity failure; nothing mutated
    #[error("Callback signature verification failed")]
    InvalidSignature,

    /// Callback references a transaction never issued; nothing mutated
    #[error("Unknown gateway transaction reference: {0}")]
    UnknownTransaction(String),

    /// Callback amount disagrees with the quoted amount; the payment is
    /// marked FAILED, the order is untouched
    #[error("Amount mismatch for order {order_id}: quoted {expected}, callback {received}")]
    AmountMismatch {
        order_id: i64,
        expected: i64,
        received: i64,
    },

    /// Signed but structurally unusable callback
    #[error("Malformed callback: {0}")]
    MalformedCallback(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        let message = err.to_string();
        match err {
            PaymentError::NotPayable { .. } => {
                AppError::with_message(ErrorCode::NotPayable, message)
            }
            PaymentError::InvalidSignature => AppError::new(ErrorCode::InvalidSignature),
            PaymentError::UnknownTransaction(txn_ref) => {
                AppError::with_message(ErrorCode::UnknownTransaction, message)
                    .with_detail("txn_ref", txn_ref)
            }
            PaymentError::AmountMismatch { .. } => {
                AppError::with_message(ErrorCode::AmountMismatch, message)
            }
            PaymentError::MalformedCallback(msg) => AppError::invalid(msg),
            PaymentError::Order(order) => order.into(),
            PaymentError::Repo(repo) => repo.into(),
        }
    }
}

/// Result of a successful `initiate`
#[derive(Debug, Clone, serde::Serialize)]
pub struct PaymentInitiation {
    pub payment_id: i64,
    pub txn_ref: String,
    pub payment_url: String,
}

/// Result of a processed callback
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub order_id: i64,
    pub txn_ref: String,
    pub success: bool,
    pub response_code: String,
    /// True when this callback hit an already-terminal payment and the
    /// recorded outcome was returned without side effects
    pub replayed: bool,
}

impl ReconcileOutcome {
    fn recorded(payment: &Payment, replayed: bool) -> Self {
        Self {
            order_id: payment.order_id,
            txn_ref: payment.txn_ref.clone(),
            success: payment.status == PaymentState::Success,
            response_code: payment.gateway_response_code.clone().unwrap_or_default(),
            replayed,
        }
    }
}

/// Payment reconciler - initiation and callback settlement
#[derive(Clone)]
pub struct PaymentReconciler {
    db: Surreal<Db>,
    orders: OrderService,
    gateway: Arc<GatewayClient>,
}

impl PaymentReconciler {
    pub fn new(db: Surreal<Db>, orders: OrderService, gateway: Arc<GatewayClient>) -> Self {
        Self {
            db,
            orders,
            gateway,
        }
    }

    fn payments(&self) -> PaymentRepository {
        PaymentRepository::new(self.db.clone())
    }

    /// Begin a gateway payment for a served, unpaid order
    ///
    /// Re-derives the total from the line items before quoting the gateway
    /// (the stored total is never trusted), creates a PENDING payment row
    /// with a fresh globally-unique reference, and returns the redirect
    /// URL. Each retry produces its own row and reference.
    pub async fn initiate(&self, order_id: i64) -> Result<PaymentInitiation, PaymentError> {
        let order = self.orders.get_order(order_id).await?;
        self.ensure_payable(&order)?;

        let order = self.orders.recompute_total(order).await?;

        // order id ++ nanosecond timestamp: unique across retries
        let txn_ref = format!("{}{}", order.id, now_nanos());
        let payment = Payment {
            id: snowflake_id(),
            order_id: order.id,
            txn_ref: txn_ref.clone(),
            amount: order.total_amount,
            status: PaymentState::Pending,
            gateway_txn_no: None,
            gateway_response_code: None,
            gateway_secure_hash: None,
            error: None,
            created_at: now_millis(),
        };
        let created = self.payments().create(payment).await?;

        let payment_url = self.gateway.build_payment_url(
            order.id,
            created.amount,
            &txn_ref,
            chrono::Utc::now(),
        );

        tracing::info!(
            order_id = order.id,
            payment_id = created.id,
            txn_ref = %txn_ref,
            amount = created.amount,
            "payment initiated"
        );

        Ok(PaymentInitiation {
            payment_id: created.id,
            txn_ref,
            payment_url,
        })
    }

    /// Process one inbound gateway callback, idempotently
    ///
    /// Steps, in order: verify authenticity, look up the payment, short-
    /// circuit on terminal state, check the amount, settle, and on success
    /// drive the order PAID transition (which publishes the hydrated
    /// snapshot to both topics).
    pub async fn reconcile(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<ReconcileOutcome, PaymentError> {
        // 1. Authenticity before anything else; nothing is mutated on failure
        if !self.gateway.verify_callback(params) {
            tracing::warn!(
                target: "security",
                txn_ref = params.get(PARAM_TXN_REF).map(String::as_str).unwrap_or("?"),
                "callback signature verification failed - possible tampering"
            );
            return Err(PaymentError::InvalidSignature);
        }

        // 2. Look up the payment by its reference
        let txn_ref = params
            .get(PARAM_TXN_REF)
            .ok_or_else(|| PaymentError::MalformedCallback("missing vnp_TxnRef".into()))?;
        let repo = self.payments();
        let payment = repo
            .find_by_txn_ref(txn_ref)
            .await?
            .ok_or_else(|| PaymentError::UnknownTransaction(txn_ref.clone()))?;

        // 3. Idempotency guard: duplicates return the recorded outcome
        if payment.status.is_terminal() {
            tracing::info!(
                txn_ref = %payment.txn_ref,
                status = ?payment.status,
                "duplicate callback for settled payment, replaying outcome"
            );
            return Ok(ReconcileOutcome::recorded(&payment, true));
        }

        // 4. Amount check - undo the gateway's ×100 scaling at the boundary,
        //    before any comparison or storage
        let raw_amount: i64 = params
            .get(PARAM_AMOUNT)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| PaymentError::MalformedCallback("missing or invalid vnp_Amount".into()))?;
        let callback_amount = raw_amount / AMOUNT_SCALE;
        let amount_matches = raw_amount % AMOUNT_SCALE == 0 && callback_amount == payment.amount;

        let response_code = params
            .get(PARAM_RESPONSE_CODE)
            .cloned()
            .unwrap_or_default();
        let gateway_txn_no = params.get(PARAM_TRANSACTION_NO).cloned();
        let secure_hash = params.get(PARAM_SECURE_HASH).cloned();

        if !amount_matches {
            let note = format!(
                "amount mismatch: quoted {}, callback {}",
                payment.amount, raw_amount
            );
            tracing::warn!(
                txn_ref = %payment.txn_ref,
                order_id = payment.order_id,
                %note,
                "payment flagged for manual reconciliation"
            );
            return match repo
                .cas_settle(
                    txn_ref,
                    PaymentState::Failed,
                    gateway_txn_no,
                    Some(response_code),
                    secure_hash,
                    Some(note),
                )
                .await?
            {
                Some(_) => Err(PaymentError::AmountMismatch {
                    order_id: payment.order_id,
                    expected: payment.amount,
                    received: callback_amount,
                }),
                // A concurrent duplicate already settled the row
                None => self.replay(txn_ref).await,
            };
        }

        // 5./6. Settle on the gateway's verdict
        if response_code == RESPONSE_CODE_SUCCESS {
            match repo
                .cas_settle(
                    txn_ref,
                    PaymentState::Success,
                    gateway_txn_no,
                    Some(response_code.clone()),
                    secure_hash,
                    None,
                )
                .await?
            {
                Some(settled) => {
                    self.mark_order_paid(settled.order_id).await?;
                    tracing::info!(
                        txn_ref = %settled.txn_ref,
                        order_id = settled.order_id,
                        "payment settled successfully"
                    );
                    Ok(ReconcileOutcome::recorded(&settled, false))
                }
                None => self.replay(txn_ref).await,
            }
        } else {
            match repo
                .cas_settle(
                    txn_ref,
                    PaymentState::Failed,
                    gateway_txn_no,
                    Some(response_code.clone()),
                    secure_hash,
                    None,
                )
                .await?
            {
                Some(settled) => {
                    tracing::info!(
                        txn_ref = %settled.txn_ref,
                        order_id = settled.order_id,
                        code = %response_code,
                        "payment declined by gateway"
                    );
                    Ok(ReconcileOutcome::recorded(&settled, false))
                }
                None => self.replay(txn_ref).await,
            }
        }
    }

    /// Current payment status for client polling
    pub async fn latest_for_order(&self, order_id: i64) -> Result<Option<Payment>, PaymentError> {
        Ok(self.payments().find_latest_for_order(order_id).await?)
    }

    fn ensure_payable(&self, order: &Order) -> Result<(), PaymentError> {
        if order.status != OrderStatus::Served
            || order.payment_status != OrderPaymentStatus::Unpaid
        {
            return Err(PaymentError::NotPayable {
                order_id: order.id,
                status: order.status,
                payment_status: order.payment_status,
            });
        }
        Ok(())
    }

    /// Drive the PAID transition after a winning settlement
    ///
    /// An order that was cash-settled while the gateway round trip was in
    /// flight is already PAID; the settled payment stands and the order is
    /// left alone.
    async fn mark_order_paid(&self, order_id: i64) -> Result<(), PaymentError> {
        match self.orders.transition(order_id, OrderStatus::Paid, None).await {
            Ok(_) => Ok(()),
            Err(OrderError::InvalidTransition {
                from: OrderStatus::Paid,
                ..
            }) => {
                tracing::warn!(
                    order_id,
                    "order was already settled when the gateway confirmation arrived"
                );
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Lost a settle race: the row is terminal now, return what won
    async fn replay(&self, txn_ref: &str) -> Result<ReconcileOutcome, PaymentError> {
        let payment = self
            .payments()
            .find_by_txn_ref(txn_ref)
            .await?
            .ok_or_else(|| PaymentError::UnknownTransaction(txn_ref.to_string()))?;
        Ok(ReconcileOutcome::recorded(&payment, true))
    }
}

#[cfg(test)]
mod tests;
