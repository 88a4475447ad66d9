//! Employee Model (员工)
//!
//! Minimal record for staff attribution and view hydration. Credential
//! issuance lives outside this server.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Employee entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub is_active: bool,
}

/// Create employee payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmployeeCreate {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub username: String,
}
