//! Order Model (订单)
//!
//! Lifecycle states, persisted rows and the hydrated projection pushed to
//! realtime subscribers. All money amounts are `i64` in the smallest
//! currency unit; all timestamps are UTC milliseconds.

use serde::{Deserialize, Serialize};
use validator::Validate;

// ============================================================================
// Lifecycle Status
// ============================================================================

/// 订单生命周期状态
///
/// ```text
/// PENDING ──► COOKING ──► SERVED ──► PAID
///    │
///    ├──► CANCELLED
///    └──► DENIED
/// ```
///
/// PAID / CANCELLED / DENIED 为终态。SERVED 之后不可再取消，只能结账。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Placed, awaiting kitchen acceptance
    #[default]
    Pending,
    /// Accepted by the kitchen
    Cooking,
    /// Delivered to the table, awaiting settlement
    Served,
    /// Settled (gateway or cash)
    Paid,
    /// Cancelled by the customer while still pending
    Cancelled,
    /// Rejected by staff while still pending
    Denied,
}

impl OrderStatus {
    /// Whether the lifecycle permits moving from `self` to `target`.
    ///
    /// This is the single source of truth for the state table; every
    /// mutation path goes through it.
    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (*self, target),
            (Pending, Cooking) | (Pending, Cancelled) | (Pending, Denied)
                | (Cooking, Served)
                | (Served, Paid)
        )
    }

    /// Terminal states admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Cancelled | OrderStatus::Denied
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Cooking => "COOKING",
            OrderStatus::Served => "SERVED",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Denied => "DENIED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 订单付款状态（与支付记录的终态分开维护）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderPaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

// ============================================================================
// Persisted Rows
// ============================================================================

/// Order entity
///
/// Invariant: `total_amount` equals the sum of `quantity * price_at_order`
/// over the order's details at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    /// Minor currency units
    pub total_amount: i64,
    pub table_id: i64,
    pub customer_name: String,
    /// The staff member who last acted on the order
    pub staff_id: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Order line item
///
/// `price_at_order` and `name` are snapshots taken at placement time; later
/// menu edits never retroactively alter historical totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    pub order_id: i64,
    pub menu_item_id: i64,
    pub name: String,
    pub quantity: i64,
    /// Minor currency units, immutable once written
    pub price_at_order: i64,
}

impl OrderDetail {
    /// Line total in minor currency units
    pub fn line_total(&self) -> i64 {
        self.quantity * self.price_at_order
    }
}

// ============================================================================
// Create DTOs
// ============================================================================

/// Line item input for order placement
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderItemInput {
    pub menu_item_id: i64,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i64,
}

/// Order placement payload (customer or staff manual entry)
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderCreate {
    pub table_id: i64,
    #[validate(length(min = 1, max = 64, message = "customer name is required"))]
    pub customer_name: String,
    #[validate(
        length(min = 1, message = "order must contain at least one item"),
        nested
    )]
    pub items: Vec<OrderItemInput>,
}

// ============================================================================
// Hydrated Projection
// ============================================================================

/// Line item inside an [`OrderView`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItemView {
    pub menu_item_id: i64,
    pub name: String,
    pub quantity: i64,
    pub price_at_order: i64,
    pub line_total: i64,
}

/// Fully-hydrated order snapshot
///
/// This is what read endpoints return and what the fanout hub publishes on
/// every state change, always the whole thing, never a delta, so a
/// subscriber that missed earlier events is consistent again after any
/// later one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    pub id: i64,
    pub status: OrderStatus,
    pub payment_status: OrderPaymentStatus,
    pub total_amount: i64,
    pub table_id: i64,
    pub table_name: String,
    pub customer_name: String,
    pub staff_id: Option<i64>,
    pub staff_name: Option<String>,
    pub items: Vec<OrderItemView>,
    pub created_at: i64,
    pub updated_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Cooking,
        OrderStatus::Served,
        OrderStatus::Paid,
        OrderStatus::Cancelled,
        OrderStatus::Denied,
    ];

    #[test]
    fn test_allowed_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cooking));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Denied));
        assert!(OrderStatus::Cooking.can_transition_to(OrderStatus::Served));
        assert!(OrderStatus::Served.can_transition_to(OrderStatus::Paid));
    }

    #[test]
    fn test_everything_else_is_rejected() {
        let allowed = [
            (OrderStatus::Pending, OrderStatus::Cooking),
            (OrderStatus::Pending, OrderStatus::Cancelled),
            (OrderStatus::Pending, OrderStatus::Denied),
            (OrderStatus::Cooking, OrderStatus::Served),
            (OrderStatus::Served, OrderStatus::Paid),
        ];
        for from in ALL {
            for to in ALL {
                let expected = allowed.contains(&(from, to));
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "unexpected verdict for {from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        for s in [OrderStatus::Paid, OrderStatus::Cancelled, OrderStatus::Denied] {
            assert!(s.is_terminal());
            for to in ALL {
                assert!(!s.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_no_manual_cancel_after_served() {
        assert!(!OrderStatus::Served.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Served.can_transition_to(OrderStatus::Denied));
        assert!(!OrderStatus::Cooking.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_status_serializes_screaming_snake() {
        let json = serde_json::to_string(&OrderStatus::Cooking).unwrap();
        assert_eq!(json, "\"COOKING\"");
        let back: OrderStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn test_line_total() {
        let detail = OrderDetail {
            order_id: 1,
            menu_item_id: 2,
            name: "Pho".into(),
            quantity: 3,
            price_at_order: 50_000,
        };
        assert_eq!(detail.line_total(), 150_000);
    }
}
