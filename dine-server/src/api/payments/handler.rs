//! Payment API Handlers

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Form, Path, Query, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};

use shared::models::{OrderItemView, OrderPaymentStatus, Payment};

use crate::core::ServerState;
use crate::payments::{PaymentError, PaymentInitiation};
use crate::utils::AppResult;

/// Initiation payload
#[derive(Debug, Deserialize)]
pub struct InitiateRequest {
    pub order_id: i64,
}

/// Begin a gateway payment for a served, unpaid order
pub async fn initiate(
    State(state): State<ServerState>,
    Json(payload): Json<InitiateRequest>,
) -> AppResult<Json<PaymentInitiation>> {
    let initiation = state.reconciler().initiate(payload.order_id).await?;
    Ok(Json(initiation))
}

/// Gateway browser return, GET variant
pub async fn callback_get(
    State(state): State<ServerState>,
    Query(params): Query<HashMap<String, String>>,
) -> Redirect {
    handle_callback(state, params).await
}

/// Gateway browser return, POST variant
pub async fn callback_post(
    State(state): State<ServerState>,
    Form(params): Form<HashMap<String, String>>,
) -> Redirect {
    handle_callback(state, params).await
}

/// Reconcile and translate the outcome into a browser redirect
///
/// Every path out of here is a redirect: success and gateway declines go
/// to the order-scoped landing pages, everything unverifiable (bad
/// signature, unknown reference, internal failure) goes to the generic
/// error landing - the browser has no other way to recover.
async fn handle_callback(state: ServerState, params: HashMap<String, String>) -> Redirect {
    let gateway = state.gateway.config().clone();
    match state.reconciler().reconcile(&params).await {
        Ok(outcome) if outcome.success => Redirect::to(&format!(
            "{}?orderId={}",
            gateway.landing_success, outcome.order_id
        )),
        Ok(outcome) => Redirect::to(&format!(
            "{}?orderId={}&code={}",
            gateway.landing_failure, outcome.order_id, outcome.response_code
        )),
        // The amount dispute names a known order; send the customer to the
        // failure page so staff can pick it up from there
        Err(PaymentError::AmountMismatch { order_id, .. }) => Redirect::to(&format!(
            "{}?orderId={}&code=AMOUNT_MISMATCH",
            gateway.landing_failure, order_id
        )),
        Err(e) => {
            tracing::error!(error = %e, "callback reconciliation failed");
            Redirect::to(&gateway.landing_error)
        }
    }
}

/// Payment status snapshot for client polling
#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub order_id: i64,
    pub payment_status: OrderPaymentStatus,
    pub total_amount: i64,
    pub items: Vec<OrderItemView>,
    pub latest_payment: Option<Payment>,
}

/// Current payment state of an order (fallback to the realtime feed)
pub async fn status(
    State(state): State<ServerState>,
    Path(order_id): Path<i64>,
) -> AppResult<Json<PaymentStatusResponse>> {
    let view = state.order_service().get_view(order_id).await?;
    let latest_payment = state.reconciler().latest_for_order(order_id).await?;
    Ok(Json(PaymentStatusResponse {
        order_id: view.id,
        payment_status: view.payment_status,
        total_amount: view.total_amount,
        items: view.items,
        latest_payment,
    }))
}
