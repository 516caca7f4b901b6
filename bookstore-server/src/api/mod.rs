//! HTTP API 模块
//!
//! Thin view layer: each area contributes a router (`mod.rs`) and its
//! handlers (`handler.rs`). Handlers parse the request, call one
//! service method and wrap the result in the response envelope; no
//! business rules live here.

pub mod auth;
pub mod buyer;
pub mod search;
pub mod seller;

use axum::Router;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .merge(auth::router())
        .merge(buyer::router())
        .merge(seller::router())
        .merge(search::router())
}
