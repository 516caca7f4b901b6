//! Seller API Handlers

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::Value;

use crate::core::ServerState;
use shared::error::ApiResult;
use shared::response::ApiResponse;

#[derive(Deserialize)]
pub struct CreateStoreRequest {
    pub user_id: String,
    pub store_id: String,
}

#[derive(Deserialize)]
pub struct AddBookRequest {
    pub user_id: String,
    pub store_id: String,
    pub book_id: String,
    /// Opaque book metadata; accepted as an object or a pre-serialized
    /// string, stored verbatim either way.
    pub book_info: Value,
    pub stock_level: i64,
}

#[derive(Deserialize)]
pub struct AddStockLevelRequest {
    pub user_id: String,
    pub store_id: String,
    pub book_id: String,
    pub add_stock_level: i64,
}

#[derive(Deserialize)]
pub struct ShipOrderRequest {
    pub user_id: String,
    pub store_id: String,
    pub order_id: String,
}

/// POST /seller/create_store - 创建店铺
pub async fn create_store(
    State(state): State<ServerState>,
    Json(req): Json<CreateStoreRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .sellers
        .create_store(&req.user_id, &req.store_id)
        .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

/// POST /seller/add_book - 上架图书
pub async fn add_book(
    State(state): State<ServerState>,
    Json(req): Json<AddBookRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let book_info = match &req.book_info {
        Value::String(raw) => raw.clone(),
        other => other.to_string(),
    };
    state
        .sellers
        .add_book(
            &req.user_id,
            &req.store_id,
            &req.book_id,
            &book_info,
            req.stock_level,
        )
        .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

/// POST /seller/add_stock_level - 调整库存
pub async fn add_stock_level(
    State(state): State<ServerState>,
    Json(req): Json<AddStockLevelRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .sellers
        .add_stock_level(
            &req.user_id,
            &req.store_id,
            &req.book_id,
            req.add_stock_level,
        )
        .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

/// POST /seller/ship_order - 发货
pub async fn ship_order(
    State(state): State<ServerState>,
    Json(req): Json<ShipOrderRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .orders
        .ship_order(&req.user_id, &req.store_id, &req.order_id)
        .await?;
    Ok(Json(ApiResponse::ok_empty()))
}
