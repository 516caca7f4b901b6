//! Inventory Model

use serde::{Deserialize, Serialize};

/// Per-store book listing, keyed by `(store_id, book_id)`
///
/// `stock_level >= 0` at all times, enforced at the point of decrement.
/// `price` is the snapshot taken at listing time; imported rows may lack
/// it and carry the price only inside the `book_info` blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Inventory {
    pub store_id: String,
    pub book_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_info: Option<String>,
    pub stock_level: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,
    pub updated_at: i64,
}

impl Inventory {
    /// Effective unit price for order lines.
    ///
    /// Falls back to the `price` field of the serialized `book_info`
    /// blob when no structured price column is set, a data-migration
    /// compatibility shim, not a pricing rule.
    pub fn unit_price(&self) -> i64 {
        if let Some(price) = self.price {
            return price;
        }
        self.book_info
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|info| info.get("price").and_then(|p| p.as_i64()))
            .unwrap_or(0)
    }
}

/// Search result line: one listing plus its parsed book info
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookListing {
    pub store_id: String,
    pub book_id: String,
    pub stock_level: i64,
    pub book_info: serde_json::Value,
}

/// Paginated search payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPage {
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub books: Vec<BookListing>,
}
