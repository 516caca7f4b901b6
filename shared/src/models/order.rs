//! Order Model
//!
//! Status state machine:
//!
//! ```text
//! pending ──▶ paid ──▶ shipped ──▶ delivered
//!    │
//!    ├──▶ cancelled          (buyer action)
//!    └──▶ cancelled_timeout  (expiry sweep)
//! ```
//!
//! Transitions are applied only through guarded compare-and-set updates
//! keyed on the expected prior status; a lost race surfaces as an
//! invalid-order-status error, never a silent overwrite.

use serde::{Deserialize, Serialize};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum OrderStatus {
    Pending,
    Paid,
    Shipped,
    Delivered,
    Cancelled,
    CancelledTimeout,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::CancelledTimeout => "cancelled_timeout",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OrderStatus::Pending),
            "paid" => Some(OrderStatus::Paid),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "cancelled" => Some(OrderStatus::Cancelled),
            "cancelled_timeout" => Some(OrderStatus::CancelledTimeout),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::CancelledTimeout
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order entity
///
/// `total_price` is computed once at creation from the item snapshots
/// and never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub store_id: String,
    pub status: OrderStatus,
    pub total_price: i64,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipment_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<i64>,
}

/// Order line, fixed at creation; `unit_price` is the listing snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct OrderItem {
    pub order_id: String,
    pub book_id: String,
    pub count: i64,
    pub unit_price: i64,
}

/// Order line as serialized in list/detail payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemView {
    pub book_id: String,
    pub count: i64,
    pub price: i64,
}

impl From<OrderItem> for OrderItemView {
    fn from(item: OrderItem) -> Self {
        Self {
            book_id: item.book_id,
            count: item.count,
            price: item.unit_price,
        }
    }
}

/// Order with its items, as returned by list operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItemView>,
}

/// Paginated order listing payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPage {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub orders: Vec<OrderDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::CancelledTimeout,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("refunded"), None);
    }

    #[test]
    fn terminal_states() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::CancelledTimeout.is_terminal());
    }
}
