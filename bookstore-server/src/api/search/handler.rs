//! Search API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use crate::core::ServerState;
use shared::error::ApiResult;
use shared::models::SearchPage;
use shared::response::ApiResponse;

#[derive(Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub store_id: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// GET /search/books - 关键字检索图书
pub async fn search_books(
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<ApiResponse<SearchPage>>> {
    let page = state
        .search
        .search_books(
            query.keyword.as_deref(),
            query.store_id.as_deref(),
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(20),
        )
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}
