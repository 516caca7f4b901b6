//! 搜索服务 - 只读图书检索
//!
//! Read-only consumer of the catalog: keyword substring search over the
//! derived search text, optionally scoped to one store.

use std::sync::Arc;

use shared::error::ApiResult;
use shared::models::{BookListing, SearchPage};

use crate::db::Datastore;

pub struct SearchService {
    store: Arc<dyn Datastore>,
}

impl SearchService {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }

    /// Paginated keyword search, `updated_at` descending
    pub async fn search_books(
        &self,
        keyword: Option<&str>,
        store_id: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> ApiResult<SearchPage> {
        let page = page.max(1);
        let page_size = if page_size <= 0 {
            20
        } else {
            page_size.min(50)
        };
        let keyword = keyword.filter(|k| !k.is_empty());
        let store_id = store_id.filter(|s| !s.is_empty());

        let (total, listings) = self
            .store
            .search_books(keyword, store_id, page, page_size)
            .await?;

        let books = listings
            .into_iter()
            .map(|inv| BookListing {
                book_info: inv
                    .book_info
                    .as_deref()
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_else(|| serde_json::json!({})),
                store_id: inv.store_id,
                book_id: inv.book_id,
                stock_level: inv.stock_level,
            })
            .collect();

        Ok(SearchPage {
            page,
            page_size,
            total,
            books,
        })
    }
}
