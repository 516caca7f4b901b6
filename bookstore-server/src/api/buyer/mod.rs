//! Buyer API 模块

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/buyer", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/new_order", post(handler::new_order))
        .route("/payment", post(handler::payment))
        .route("/add_funds", post(handler::add_funds))
        .route("/confirm_receipt", post(handler::confirm_receipt))
        .route("/cancel_order", post(handler::cancel_order))
        .route("/orders", get(handler::list_orders))
}
