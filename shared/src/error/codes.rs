//! Unified error codes for the dine-server workspace
//!
//! Error codes are shared between the server and its clients and are
//! organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Menu errors
//! - 7xxx: Table errors
//! - 8xxx: Employee errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Token has expired
    TokenExpired = 1002,
    /// Token is invalid
    TokenInvalid = 1003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Attempted status change violates the lifecycle state table
    InvalidTransition = 4002,
    /// Concurrent modification lost the compare-and-swap race
    ConcurrentUpdate = 4003,
    /// Order has no line items
    EmptyOrder = 4004,

    // ==================== 5xxx: Payment ====================
    /// Payment requested outside SERVED/UNPAID
    NotPayable = 5001,
    /// Gateway callback signature did not verify
    InvalidSignature = 5002,
    /// Gateway callback amount disagrees with the quoted amount
    AmountMismatch = 5003,
    /// Gateway callback references a transaction never issued
    UnknownTransaction = 5004,
    /// Payment record not found
    PaymentNotFound = 5005,

    // ==================== 6xxx: Menu ====================
    /// Menu item not found
    MenuItemNotFound = 6001,
    /// Menu item name already exists
    MenuItemNameExists = 6002,

    // ==================== 7xxx: Table ====================
    /// Dining table not found
    TableNotFound = 7001,
    /// Dining table name already exists
    TableNameExists = 7002,

    // ==================== 8xxx: Employee ====================
    /// Employee not found
    EmployeeNotFound = 8001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the default human-readable message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",

            Self::NotAuthenticated => "Not authenticated",
            Self::TokenExpired => "Token has expired",
            Self::TokenInvalid => "Token is invalid",

            Self::OrderNotFound => "Order not found",
            Self::InvalidTransition => "Invalid order status transition",
            Self::ConcurrentUpdate => "Order was modified concurrently",
            Self::EmptyOrder => "Order has no line items",

            Self::NotPayable => "Order is not payable",
            Self::InvalidSignature => "Callback signature verification failed",
            Self::AmountMismatch => "Callback amount does not match the quoted amount",
            Self::UnknownTransaction => "Unknown gateway transaction reference",
            Self::PaymentNotFound => "Payment not found",

            Self::MenuItemNotFound => "Menu item not found",
            Self::MenuItemNameExists => "Menu item name already exists",

            Self::TableNotFound => "Dining table not found",
            Self::TableNameExists => "Dining table name already exists",

            Self::EmployeeNotFound => "Employee not found",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::ConfigError => "Configuration error",
        }
    }

    /// Get the numeric value of this error code
    pub fn value(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code as u16
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,

            1001 => Self::NotAuthenticated,
            1002 => Self::TokenExpired,
            1003 => Self::TokenInvalid,

            4001 => Self::OrderNotFound,
            4002 => Self::InvalidTransition,
            4003 => Self::ConcurrentUpdate,
            4004 => Self::EmptyOrder,

            5001 => Self::NotPayable,
            5002 => Self::InvalidSignature,
            5003 => Self::AmountMismatch,
            5004 => Self::UnknownTransaction,
            5005 => Self::PaymentNotFound,

            6001 => Self::MenuItemNotFound,
            6002 => Self::MenuItemNameExists,

            7001 => Self::TableNotFound,
            7002 => Self::TableNameExists,

            8001 => Self::EmployeeNotFound,

            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            9003 => Self::ConfigError,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_u16() {
        let codes = [
            ErrorCode::Success,
            ErrorCode::InvalidTransition,
            ErrorCode::NotPayable,
            ErrorCode::InvalidSignature,
            ErrorCode::AmountMismatch,
            ErrorCode::UnknownTransaction,
            ErrorCode::DatabaseError,
        ];
        for code in codes {
            let raw: u16 = code.into();
            assert_eq!(ErrorCode::try_from(raw).unwrap(), code);
        }
    }

    #[test]
    fn test_unknown_value_rejected() {
        assert_eq!(ErrorCode::try_from(1234), Err(InvalidErrorCode(1234)));
    }
}
