//! 卖家服务 - 店铺与库存
//!
//! Store creation and inventory listings. The `book_info` blob is kept
//! opaque; only the price snapshot and the search text are lifted out
//! of it at listing time.

use std::sync::Arc;

use serde_json::Value;
use shared::error::{ApiError, ApiResult};
use shared::models::{Bookstore, Inventory};
use shared::util::now_millis;

use crate::db::{Datastore, DbError, StockDirection};

/// Text fields folded into the search text, in listing order
const SEARCH_TEXT_FIELDS: [&str; 8] = [
    "title",
    "sub_title",
    "author",
    "publisher",
    "translator",
    "book_intro",
    "author_intro",
    "content",
];

/// Catalog service
pub struct SellerService {
    store: Arc<dyn Datastore>,
}

impl SellerService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    async fn ensure_user(&self, user_id: &str) -> ApiResult<()> {
        if self.store.get_user(user_id, true).await?.is_none() {
            return Err(ApiError::NonExistUserId(user_id.to_string()));
        }
        Ok(())
    }

    /// Create a store owned by `user_id`
    pub async fn create_store(&self, user_id: &str, store_id: &str) -> ApiResult<()> {
        self.ensure_user(user_id).await?;
        if self.store.get_store(store_id).await?.is_some() {
            return Err(ApiError::ExistStoreId(store_id.to_string()));
        }
        match self
            .store
            .insert_store(&Bookstore::new(store_id, user_id))
            .await
        {
            Ok(()) => Ok(()),
            Err(DbError::Duplicate(_)) => Err(ApiError::ExistStoreId(store_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// List a book in a store with an initial stock level
    pub async fn add_book(
        &self,
        user_id: &str,
        store_id: &str,
        book_id: &str,
        book_info: &str,
        stock_level: i64,
    ) -> ApiResult<()> {
        self.ensure_user(user_id).await?;
        if self.store.get_store(store_id).await?.is_none() {
            return Err(ApiError::NonExistStoreId(store_id.to_string()));
        }
        if self.store.get_inventory(store_id, book_id).await?.is_some() {
            return Err(ApiError::ExistBookId(book_id.to_string()));
        }

        let (price, search_text) = parse_book_info(book_info);
        let inventory = Inventory {
            store_id: store_id.to_string(),
            book_id: book_id.to_string(),
            book_info: Some(book_info.to_string()),
            stock_level: stock_level.max(0),
            price,
            search_text,
            updated_at: now_millis(),
        };
        match self.store.insert_inventory(&inventory).await {
            Ok(()) => Ok(()),
            Err(DbError::Duplicate(_)) => Err(ApiError::ExistBookId(book_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }

    /// Adjust the stock level of a listed book.
    ///
    /// A negative delta goes through the guarded decrease path so the
    /// stock level can never be driven below zero.
    pub async fn add_stock_level(
        &self,
        user_id: &str,
        store_id: &str,
        book_id: &str,
        add_stock_level: i64,
    ) -> ApiResult<()> {
        self.ensure_user(user_id).await?;
        if self.store.get_store(store_id).await?.is_none() {
            return Err(ApiError::NonExistStoreId(store_id.to_string()));
        }
        if self.store.get_inventory(store_id, book_id).await?.is_none() {
            return Err(ApiError::NonExistBookId(book_id.to_string()));
        }

        let (items, direction) = if add_stock_level >= 0 {
            (
                vec![(book_id.to_string(), add_stock_level)],
                StockDirection::Increase,
            )
        } else {
            (
                vec![(book_id.to_string(), -add_stock_level)],
                StockDirection::Decrease,
            )
        };
        let applied = self.store.adjust_stock(store_id, &items, direction).await?;
        if !applied {
            return match direction {
                StockDirection::Decrease => Err(ApiError::StockLevelLow(book_id.to_string())),
                StockDirection::Increase => Err(ApiError::NonExistBookId(book_id.to_string())),
            };
        }
        Ok(())
    }
}

/// Lift the price snapshot and the search text out of a book-info blob
fn parse_book_info(raw: &str) -> (Option<i64>, Option<String>) {
    let info: Value = serde_json::from_str(raw).unwrap_or(Value::Null);
    let Some(obj) = info.as_object() else {
        return (None, None);
    };

    let mut pieces: Vec<String> = Vec::new();
    for key in SEARCH_TEXT_FIELDS {
        if let Some(text) = obj.get(key).and_then(|v| v.as_str())
            && !text.is_empty()
        {
            pieces.push(text.to_string());
        }
    }
    match obj.get("tags") {
        Some(Value::Array(tags)) => pieces.extend(
            tags.iter()
                .filter_map(|t| t.as_str())
                .filter(|t| !t.is_empty())
                .map(String::from),
        ),
        Some(Value::String(tags)) if !tags.is_empty() => pieces.push(tags.clone()),
        _ => {}
    }
    if let Some(catalog) = obj.get("catalog").and_then(|v| v.as_str())
        && !catalog.is_empty()
    {
        pieces.push(catalog.to_string());
    }

    let price = obj.get("price").and_then(|p| p.as_i64());
    let search_text = if pieces.is_empty() {
        None
    } else {
        Some(pieces.join(" "))
    };
    (price, search_text)
}
