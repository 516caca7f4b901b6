//! Search API 模块

mod handler;

use axum::{Router, routing::get};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/search", routes())
}

fn routes() -> Router<ServerState> {
    Router::new().route("/books", get(handler::search_books))
}
