//! Menu Item API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use validator::Validate;

use shared::AppError;
use shared::models::{MenuItem, MenuItemCreate, MenuItemUpdate};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::repository::MenuItemRepository;
use crate::utils::AppResult;

/// List active menu items
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<MenuItem>>> {
    let items = MenuItemRepository::new(state.db.clone()).find_all().await?;
    Ok(Json(items))
}

/// Create a menu item (staff)
pub async fn create(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Json(payload): Json<MenuItemCreate>,
) -> AppResult<Json<MenuItem>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let item = MenuItemRepository::new(state.db.clone())
        .create(payload)
        .await?;
    Ok(Json(item))
}

/// Update a menu item (staff)
///
/// Price edits never touch placed orders; details carry their own
/// snapshots.
pub async fn update(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<MenuItemUpdate>,
) -> AppResult<Json<MenuItem>> {
    payload
        .validate()
        .map_err(|e| AppError::validation(e.to_string()))?;
    let item = MenuItemRepository::new(state.db.clone())
        .update(id, payload)
        .await?;
    Ok(Json(item))
}

/// Soft-delete a menu item (staff)
pub async fn remove(
    State(state): State<ServerState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Json<bool>> {
    let removed = MenuItemRepository::new(state.db.clone()).delete(id).await?;
    if !removed {
        return Err(AppError::not_found(format!("Menu item {id}")));
    }
    Ok(Json(true))
}
