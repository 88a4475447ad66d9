//! Reconciliation tests: initiation guards, callback settlement,
//! idempotent replay and tampering rejection.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use shared::models::{OrderPaymentStatus, OrderStatus, OrderView, PaymentState};

use super::super::gateway::{
    GatewayClient, GatewayConfig, PARAM_AMOUNT, PARAM_RESPONSE_CODE, PARAM_SECURE_HASH,
    PARAM_TRANSACTION_NO, PARAM_TXN_REF,
};
use super::{PaymentError, PaymentReconciler};
use crate::db::repository::PaymentRepository;
use crate::orders::tests::{
    TestContext, drain_updates, place_standard_order, seed, setup, tap_admin, tap_order,
};

struct PayContext {
    ctx: TestContext,
    reconciler: PaymentReconciler,
    gateway: Arc<GatewayClient>,
}

async fn setup_payments() -> PayContext {
    let ctx = setup().await;
    let gateway = Arc::new(GatewayClient::new(GatewayConfig {
        hash_secret: "reconciler-test-secret".into(),
        ..GatewayConfig::default()
    }));
    let reconciler =
        PaymentReconciler::new(ctx.db.clone(), ctx.orders.clone(), gateway.clone());
    PayContext {
        ctx,
        reconciler,
        gateway,
    }
}

/// Place the standard order and walk it to SERVED
async fn served_order(pc: &PayContext) -> OrderView {
    let seeded = seed(&pc.ctx).await;
    let view = place_standard_order(&pc.ctx, &seeded).await;
    pc.ctx
        .orders
        .transition(view.id, OrderStatus::Cooking, Some(7))
        .await
        .unwrap();
    pc.ctx
        .orders
        .transition(view.id, OrderStatus::Served, Some(7))
        .await
        .unwrap()
}

/// Build a correctly-signed callback for the given reference and raw
/// (gateway-scaled) amount
fn signed_callback(
    gateway: &GatewayClient,
    txn_ref: &str,
    raw_amount: &str,
    response_code: &str,
) -> HashMap<String, String> {
    let mut sorted = BTreeMap::new();
    sorted.insert(PARAM_AMOUNT.to_string(), raw_amount.to_string());
    sorted.insert(PARAM_TXN_REF.to_string(), txn_ref.to_string());
    sorted.insert(PARAM_RESPONSE_CODE.to_string(), response_code.to_string());
    sorted.insert(PARAM_TRANSACTION_NO.to_string(), "GW777".to_string());
    let signature = gateway.sign_params(&sorted);
    let mut params: HashMap<String, String> = sorted.into_iter().collect();
    params.insert(PARAM_SECURE_HASH.to_string(), signature);
    params
}

#[tokio::test]
async fn test_initiate_requires_served_unpaid() {
    let pc = setup_payments().await;
    let seeded = seed(&pc.ctx).await;
    let pending = place_standard_order(&pc.ctx, &seeded).await;

    let err = pc.reconciler.initiate(pending.id).await.unwrap_err();
    assert!(matches!(err, PaymentError::NotPayable { .. }));

    // Cash-settled orders are not payable either
    pc.ctx
        .orders
        .transition(pending.id, OrderStatus::Cooking, Some(1))
        .await
        .unwrap();
    pc.ctx
        .orders
        .transition(pending.id, OrderStatus::Served, Some(1))
        .await
        .unwrap();
    pc.ctx
        .orders
        .transition(pending.id, OrderStatus::Paid, Some(1))
        .await
        .unwrap();
    let err = pc.reconciler.initiate(pending.id).await.unwrap_err();
    assert!(matches!(err, PaymentError::NotPayable { .. }));
}

#[tokio::test]
async fn test_initiate_embeds_amount_and_fresh_reference() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;

    let first = pc.reconciler.initiate(served.id).await.unwrap();
    assert!(first.payment_url.contains("vnp_Amount=13000000"));
    assert!(first
        .payment_url
        .contains(&format!("vnp_TxnRef={}", first.txn_ref)));
    assert!(first.txn_ref.starts_with(&served.id.to_string()));

    // A retry produces a second payment row with a different reference
    let second = pc.reconciler.initiate(served.id).await.unwrap();
    assert_ne!(first.txn_ref, second.txn_ref);
    assert_ne!(first.payment_id, second.payment_id);

    let repo = PaymentRepository::new(pc.ctx.db.clone());
    let attempts = repo.find_for_order(served.id).await.unwrap();
    assert_eq!(attempts.len(), 2);
    assert!(attempts.iter().all(|p| p.status == PaymentState::Pending));
    assert!(attempts.iter().all(|p| p.amount == 130_000));
}

#[tokio::test]
async fn test_initiate_recomputes_drifted_total() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;

    // Corrupt the stored total; initiation must not trust it
    pc.ctx
        .db
        .query("UPDATE orders SET total_amount = 5 WHERE id = $id RETURN NONE")
        .bind(("id", surrealdb::RecordId::from_table_key("orders", served.id)))
        .await
        .unwrap()
        .check()
        .unwrap();

    let initiation = pc.reconciler.initiate(served.id).await.unwrap();
    assert!(initiation.payment_url.contains("vnp_Amount=13000000"));

    let corrected = pc.ctx.orders.get_order(served.id).await.unwrap();
    assert_eq!(corrected.total_amount, 130_000);
}

#[tokio::test]
async fn test_success_callback_settles_and_fans_out() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;
    let initiation = pc.reconciler.initiate(served.id).await.unwrap();

    let mut admin_rx = tap_admin(&pc.ctx);
    let mut order_rx = tap_order(&pc.ctx, served.id);

    let params = signed_callback(&pc.gateway, &initiation.txn_ref, "13000000", "00");
    let outcome = pc.reconciler.reconcile(&params).await.unwrap();
    assert!(outcome.success);
    assert!(!outcome.replayed);
    assert_eq!(outcome.order_id, served.id);

    // Order is PAID, payment is SUCCESS
    let order = pc.ctx.orders.get_order(served.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.payment_status, OrderPaymentStatus::Paid);

    let repo = PaymentRepository::new(pc.ctx.db.clone());
    let payment = repo
        .find_by_txn_ref(&initiation.txn_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentState::Success);
    assert_eq!(payment.gateway_txn_no.as_deref(), Some("GW777"));
    assert_eq!(payment.gateway_response_code.as_deref(), Some("00"));

    // Both topics saw the hydrated PAID snapshot
    let admin_updates = drain_updates(&mut admin_rx);
    assert_eq!(admin_updates.len(), 1);
    assert_eq!(admin_updates[0].status, OrderStatus::Paid);
    assert_eq!(admin_updates[0].items.len(), 2);

    let order_updates = drain_updates(&mut order_rx);
    assert_eq!(order_updates.len(), 1);
    assert_eq!(order_updates[0].status, OrderStatus::Paid);

    // Replaying the identical callback changes nothing and publishes nothing
    let replay = pc.reconciler.reconcile(&params).await.unwrap();
    assert!(replay.success);
    assert!(replay.replayed);
    assert_eq!(replay.response_code, "00");
    assert!(drain_updates(&mut admin_rx).is_empty());
    assert!(drain_updates(&mut order_rx).is_empty());

    let payment_after = repo
        .find_by_txn_ref(&initiation.txn_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment_after.status, PaymentState::Success);
}

#[tokio::test]
async fn test_tampered_signature_mutates_nothing() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;
    let initiation = pc.reconciler.initiate(served.id).await.unwrap();

    // Tamper one parameter after signing
    let mut params = signed_callback(&pc.gateway, &initiation.txn_ref, "13000000", "00");
    params.insert(PARAM_AMOUNT.to_string(), "13000100".to_string());

    let err = pc.reconciler.reconcile(&params).await.unwrap_err();
    assert!(matches!(err, PaymentError::InvalidSignature));

    // Neither the payment nor the order moved
    let repo = PaymentRepository::new(pc.ctx.db.clone());
    let payment = repo
        .find_by_txn_ref(&initiation.txn_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentState::Pending);
    let order = pc.ctx.orders.get_order(served.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Served);
    assert_eq!(order.payment_status, OrderPaymentStatus::Unpaid);
}

#[tokio::test]
async fn test_amount_tamper_marks_failed_and_leaves_order() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;
    let initiation = pc.reconciler.initiate(served.id).await.unwrap();

    // Correctly signed, but over the wrong amount ("success" for 1000.00)
    let params = signed_callback(&pc.gateway, &initiation.txn_ref, "100000", "00");
    let err = pc.reconciler.reconcile(&params).await.unwrap_err();
    assert!(matches!(
        err,
        PaymentError::AmountMismatch {
            expected: 130_000,
            received: 1_000,
            ..
        }
    ));

    let repo = PaymentRepository::new(pc.ctx.db.clone());
    let payment = repo
        .find_by_txn_ref(&initiation.txn_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentState::Failed);
    assert!(payment.error.as_deref().unwrap().contains("amount mismatch"));

    // The order never transitions on a mismatched amount
    let order = pc.ctx.orders.get_order(served.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Served);
    assert_eq!(order.payment_status, OrderPaymentStatus::Unpaid);
}

#[tokio::test]
async fn test_non_integral_scaled_amount_is_a_mismatch() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;
    let initiation = pc.reconciler.initiate(served.id).await.unwrap();

    // 13000050 / 100 is not an integral minor-unit amount we ever quoted
    let params = signed_callback(&pc.gateway, &initiation.txn_ref, "13000050", "00");
    let err = pc.reconciler.reconcile(&params).await.unwrap_err();
    assert!(matches!(err, PaymentError::AmountMismatch { .. }));
}

#[tokio::test]
async fn test_unknown_reference_rejected() {
    let pc = setup_payments().await;
    let _served = served_order(&pc).await;

    let params = signed_callback(&pc.gateway, "999999999", "13000000", "00");
    let err = pc.reconciler.reconcile(&params).await.unwrap_err();
    assert!(matches!(err, PaymentError::UnknownTransaction(_)));
}

#[tokio::test]
async fn test_missing_amount_is_malformed() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;
    let initiation = pc.reconciler.initiate(served.id).await.unwrap();

    let mut sorted = BTreeMap::new();
    sorted.insert(PARAM_TXN_REF.to_string(), initiation.txn_ref.clone());
    sorted.insert(PARAM_RESPONSE_CODE.to_string(), "00".to_string());
    let signature = pc.gateway.sign_params(&sorted);
    let mut params: HashMap<String, String> = sorted.into_iter().collect();
    params.insert(PARAM_SECURE_HASH.to_string(), signature);

    let err = pc.reconciler.reconcile(&params).await.unwrap_err();
    assert!(matches!(err, PaymentError::MalformedCallback(_)));
}

#[tokio::test]
async fn test_gateway_decline_marks_failed() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;
    let initiation = pc.reconciler.initiate(served.id).await.unwrap();

    let mut admin_rx = tap_admin(&pc.ctx);

    // "24" - customer cancelled at the gateway
    let params = signed_callback(&pc.gateway, &initiation.txn_ref, "13000000", "24");
    let outcome = pc.reconciler.reconcile(&params).await.unwrap();
    assert!(!outcome.success);
    assert!(!outcome.replayed);
    assert_eq!(outcome.response_code, "24");

    let repo = PaymentRepository::new(pc.ctx.db.clone());
    let payment = repo
        .find_by_txn_ref(&initiation.txn_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentState::Failed);

    // Declines never touch the order and never fan out
    let order = pc.ctx.orders.get_order(served.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Served);
    assert!(drain_updates(&mut admin_rx).is_empty());

    // Replaying the decline returns the recorded failure
    let replay = pc.reconciler.reconcile(&params).await.unwrap();
    assert!(!replay.success);
    assert!(replay.replayed);
}

#[tokio::test]
async fn test_retry_after_decline_can_succeed() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;

    let first = pc.reconciler.initiate(served.id).await.unwrap();
    let decline = signed_callback(&pc.gateway, &first.txn_ref, "13000000", "24");
    pc.reconciler.reconcile(&decline).await.unwrap();

    let second = pc.reconciler.initiate(served.id).await.unwrap();
    let success = signed_callback(&pc.gateway, &second.txn_ref, "13000000", "00");
    let outcome = pc.reconciler.reconcile(&success).await.unwrap();
    assert!(outcome.success);

    let order = pc.ctx.orders.get_order(served.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_gateway_success_after_cash_settlement_is_tolerated() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;
    let initiation = pc.reconciler.initiate(served.id).await.unwrap();

    // Staff cash-settles while the gateway round trip is in flight
    pc.ctx
        .orders
        .transition(served.id, OrderStatus::Paid, Some(7))
        .await
        .unwrap();

    let params = signed_callback(&pc.gateway, &initiation.txn_ref, "13000000", "00");
    let outcome = pc.reconciler.reconcile(&params).await.unwrap();
    assert!(outcome.success);

    let repo = PaymentRepository::new(pc.ctx.db.clone());
    let payment = repo
        .find_by_txn_ref(&initiation.txn_ref)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payment.status, PaymentState::Success);

    let order = pc.ctx.orders.get_order(served.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn test_latest_for_order_reports_most_recent_attempt() {
    let pc = setup_payments().await;
    let served = served_order(&pc).await;

    assert!(pc
        .reconciler
        .latest_for_order(served.id)
        .await
        .unwrap()
        .is_none());

    let _first = pc.reconciler.initiate(served.id).await.unwrap();
    let second = pc.reconciler.initiate(served.id).await.unwrap();

    let latest = pc
        .reconciler
        .latest_for_order(served.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(latest.txn_ref, second.txn_ref);
}
