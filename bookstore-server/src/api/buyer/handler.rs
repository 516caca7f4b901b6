//! Buyer API Handlers

use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use shared::error::ApiResult;
use shared::models::OrderPage;
use shared::response::ApiResponse;

#[derive(Deserialize)]
pub struct BookOrder {
    pub id: String,
    pub count: i64,
}

#[derive(Deserialize)]
pub struct NewOrderRequest {
    pub user_id: String,
    pub store_id: String,
    pub books: Vec<BookOrder>,
}

#[derive(Serialize)]
pub struct NewOrderData {
    pub order_id: String,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub user_id: String,
    pub password: String,
    pub order_id: String,
}

#[derive(Deserialize)]
pub struct AddFundsRequest {
    pub user_id: String,
    pub password: String,
    pub add_value: i64,
}

#[derive(Deserialize)]
pub struct ConfirmReceiptRequest {
    pub user_id: String,
    pub order_id: String,
}

#[derive(Deserialize)]
pub struct CancelOrderRequest {
    pub user_id: String,
    pub password: Option<String>,
    pub order_id: String,
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    pub user_id: String,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

/// POST /buyer/new_order - 下单（预留库存）
pub async fn new_order(
    State(state): State<ServerState>,
    Json(req): Json<NewOrderRequest>,
) -> ApiResult<Json<ApiResponse<NewOrderData>>> {
    let id_and_count: Vec<(String, i64)> =
        req.books.into_iter().map(|b| (b.id, b.count)).collect();
    let order_id = state
        .orders
        .new_order(&req.user_id, &req.store_id, &id_and_count)
        .await?;
    Ok(Json(ApiResponse::ok(NewOrderData { order_id })))
}

/// POST /buyer/payment - 支付订单
pub async fn payment(
    State(state): State<ServerState>,
    Json(req): Json<PaymentRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .orders
        .payment(&req.user_id, &req.password, &req.order_id)
        .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

/// POST /buyer/add_funds - 充值
pub async fn add_funds(
    State(state): State<ServerState>,
    Json(req): Json<AddFundsRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .orders
        .add_funds(&req.user_id, &req.password, req.add_value)
        .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

/// POST /buyer/confirm_receipt - 确认收货
pub async fn confirm_receipt(
    State(state): State<ServerState>,
    Json(req): Json<ConfirmReceiptRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .orders
        .confirm_receipt(&req.user_id, &req.order_id)
        .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

/// POST /buyer/cancel_order - 取消待支付订单（恢复库存）
pub async fn cancel_order(
    State(state): State<ServerState>,
    Json(req): Json<CancelOrderRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .orders
        .cancel_order(&req.user_id, req.password.as_deref(), &req.order_id)
        .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

/// GET /buyer/orders - 分页查询订单
pub async fn list_orders(
    State(state): State<ServerState>,
    Query(query): Query<ListOrdersQuery>,
) -> ApiResult<Json<ApiResponse<OrderPage>>> {
    let page = state
        .orders
        .list_orders(
            &query.user_id,
            query.status.as_deref(),
            query.page.unwrap_or(1),
            query.page_size.unwrap_or(20),
        )
        .await?;
    Ok(Json(ApiResponse::ok(page)))
}
