//! Order API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use shared::models::{Order, OrderCreate, OrderStatus, OrderView};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::AppResult;

/// Query params for listing orders
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
    pub status: Option<OrderStatus>,
}

fn default_limit() -> i64 {
    50
}

/// Place a new order (customer session or staff manual entry)
pub async fn place(
    State(state): State<ServerState>,
    Json(payload): Json<OrderCreate>,
) -> AppResult<Json<OrderView>> {
    let view = state.order_service().place_order(payload).await?;
    Ok(Json(view))
}

/// List orders (staff dashboards; paginated, optional status filter)
pub async fn list(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Order>>> {
    let orders = state
        .order_service()
        .list(query.limit, query.offset, query.status)
        .await?;
    Ok(Json(orders))
}

/// Get the hydrated view of an order
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> AppResult<Json<OrderView>> {
    let view = state.order_service().get_view(id).await?;
    Ok(Json(view))
}

/// Status mutation payload
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub target_status: OrderStatus,
}

/// Apply a lifecycle transition (staff action)
///
/// `SERVED -> PAID` here is the cash-settlement path; it runs through the
/// same commit + fanout pipeline as the gateway reconciliation.
pub async fn update_status(
    State(state): State<ServerState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<OrderView>> {
    let view = state
        .order_service()
        .transition(id, payload.target_status, Some(user.employee_id))
        .await?;
    Ok(Json(view))
}
