//! Shared types for the dine-server workspace
//!
//! Common types used by the server and its clients: domain models,
//! the unified error system, realtime feed frames and utility helpers.

pub mod error;
pub mod feed;
pub mod models;
pub mod util;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use models::{
    DiningTable, Employee, MenuItem, Order, OrderDetail, OrderItemView, OrderPaymentStatus,
    OrderStatus, OrderView, Payment, PaymentState,
};
