//! Menu Item Model (菜品)

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Menu item entity
///
/// `price` is the *current* menu price. Orders snapshot it into
/// `OrderDetail.price_at_order` at placement time, so editing it here never
/// changes historical totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    /// Minor currency units
    pub price: i64,
    pub is_active: bool,
}

/// Create menu item payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MenuItemCreate {
    #[validate(length(min = 1, max = 64))]
    pub name: String,
    #[validate(range(min = 0))]
    pub price: i64,
}

/// Update menu item payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MenuItemUpdate {
    #[validate(length(min = 1, max = 64))]
    pub name: Option<String>,
    #[validate(range(min = 0))]
    pub price: Option<i64>,
    pub is_active: Option<bool>,
}
