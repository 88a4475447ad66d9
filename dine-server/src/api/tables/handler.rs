//! Dining Table API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use validator::Validate;

use shared::models::{DiningTable, DiningTableCreate, DiningTableUpdate};
use shared::AppError;

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::DiningTableRepository;
use crate::utils::AppResult;

/// List active tables
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<DiningTable>>> {
    let tables = DiningTableRepository::new(state.db.clone()).find_all().await?;
    Ok(Json(tables))
}

/// Create a table (staff)
pub async fn create(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Json(payload): Json<DiningTableCreate>,
) -> AppResult<Json<DiningTable>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let table = DiningTableRepository::new(state.db.clone())
        .create(payload)
        .await?;
    Ok(Json(table))
}

/// Update a table (staff)
pub async fn update(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<DiningTableUpdate>,
) -> AppResult<Json<DiningTable>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let table = DiningTableRepository::new(state.db.clone())
        .update(id, payload)
        .await?;
    Ok(Json(table))
}

/// Soft-delete a table (staff)
pub async fn remove(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let removed = DiningTableRepository::new(state.db.clone()).delete(id).await?;
    if !removed {
        return Err(AppError::not_found(format!("Dining table {id}")));
    }
    Ok(Json(true))
}
