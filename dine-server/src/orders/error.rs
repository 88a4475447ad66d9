//! Order service errors

use shared::models::OrderStatus;
use shared::{AppError, ErrorCode};
use thiserror::Error;

use crate::db::repository::RepoError;

/// Errors produced by order placement and lifecycle transitions
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("Order {0} not found")]
    NotFound(i64),

    #[error("Dining table {0} not found")]
    TableNotFound(i64),

    #[error("Menu item {0} not found")]
    MenuItemNotFound(i64),

    /// The `(current -> target)` pair is absent from the state table.
    /// The order is left untouched.
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Lost the compare-and-swap race repeatedly; caller may retry
    #[error("Order {0} was modified concurrently")]
    ConcurrentUpdate(i64),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Repo(#[from] RepoError),
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound(id) => {
                AppError::with_message(ErrorCode::OrderNotFound, format!("Order {id} not found"))
            }
            OrderError::TableNotFound(id) => AppError::with_message(
                ErrorCode::TableNotFound,
                format!("Dining table {id} not found"),
            ),
            OrderError::MenuItemNotFound(id) => AppError::with_message(
                ErrorCode::MenuItemNotFound,
                format!("Menu item {id} not found"),
            ),
            OrderError::InvalidTransition { from, to } => AppError::with_message(
                ErrorCode::InvalidTransition,
                format!("Invalid transition: {from} -> {to}"),
            )
            .with_detail("from", from.as_str())
            .with_detail("to", to.as_str()),
            OrderError::ConcurrentUpdate(id) => AppError::with_message(
                ErrorCode::ConcurrentUpdate,
                format!("Order {id} was modified concurrently"),
            ),
            OrderError::Validation(msg) => AppError::validation(msg),
            OrderError::Repo(repo) => repo.into(),
        }
    }
}
