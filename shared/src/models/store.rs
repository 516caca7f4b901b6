//! Store Model

use serde::{Deserialize, Serialize};

/// Seller store; immutable after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Bookstore {
    pub store_id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: i64,
}

impl Bookstore {
    pub fn new(store_id: impl Into<String>, owner_id: impl Into<String>) -> Self {
        let store_id = store_id.into();
        Self {
            name: store_id.clone(),
            store_id,
            owner_id: owner_id.into(),
            description: None,
            created_at: crate::util::now_millis(),
        }
    }
}
