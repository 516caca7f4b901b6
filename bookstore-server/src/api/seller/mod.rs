//! Seller API 模块

mod handler;

use axum::{Router, routing::post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/seller", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/create_store", post(handler::create_store))
        .route("/add_book", post(handler::add_book))
        .route("/add_stock_level", post(handler::add_stock_level))
        .route("/ship_order", post(handler::ship_order))
}
