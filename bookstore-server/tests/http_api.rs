//! End-to-end HTTP tests through the axum router.
//!
//! Every response carries the `{code, message, data?}` envelope and
//! the business code doubles as the HTTP status.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use bookstore_server::{BackendKind, Config, ServerState, SqliteDatastore};

async fn app() -> Router {
    let store = Arc::new(SqliteDatastore::open_in_memory().await.unwrap());
    let config = Config::with_overrides(BackendKind::Sqlite, ":memory:", 1800);
    let state = ServerState::with_datastore(config, store);
    bookstore_server::api::router().with_state(state)
}

async fn post(app: &Router, path: &str, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(path)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn get(app: &Router, path: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn register_and_duplicate() {
    let app = app().await;

    let (status, body) = post(
        &app,
        "/auth/register",
        json!({"user_id": "alice", "password": "pw"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 200);
    assert_eq!(body["message"], "ok");

    let (status, body) = post(
        &app,
        "/auth/register",
        json!({"user_id": "alice", "password": "pw"}),
    )
    .await;
    assert_eq!(status.as_u16(), 512);
    assert_eq!(body["code"], 512);
    assert!(body["message"].as_str().unwrap().contains("alice"));
}

#[tokio::test]
async fn full_purchase_flow_over_http() {
    let app = app().await;

    for (user, pw) in [("buyer", "b-pw"), ("seller", "s-pw")] {
        let (status, _) = post(
            &app,
            "/auth/register",
            json!({"user_id": user, "password": pw}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, _) = post(
        &app,
        "/seller/create_store",
        json!({"user_id": "seller", "store_id": "shop"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        "/seller/add_book",
        json!({
            "user_id": "seller",
            "store_id": "shop",
            "book_id": "b1",
            "book_info": {"title": "Rust in Action", "price": 100},
            "stock_level": 5
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        "/buyer/add_funds",
        json!({"user_id": "buyer", "password": "b-pw", "add_value": 1000}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &app,
        "/buyer/new_order",
        json!({
            "user_id": "buyer",
            "store_id": "shop",
            "books": [{"id": "b1", "count": 2}]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let order_id = body["data"]["order_id"].as_str().unwrap().to_string();
    assert!(order_id.starts_with("buyer_shop_"));

    // Wrong password gets the authorization code straight through.
    let (status, _) = post(
        &app,
        "/buyer/payment",
        json!({"user_id": "buyer", "password": "wrong", "order_id": order_id}),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = post(
        &app,
        "/buyer/payment",
        json!({"user_id": "buyer", "password": "b-pw", "order_id": order_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        "/seller/ship_order",
        json!({"user_id": "seller", "store_id": "shop", "order_id": order_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = post(
        &app,
        "/buyer/confirm_receipt",
        json!({"user_id": "buyer", "order_id": order_id}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get(&app, "/buyer/orders?user_id=buyer&status=delivered").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    let order = &body["data"]["orders"][0];
    assert_eq!(order["order_id"], order_id.as_str());
    assert_eq!(order["status"], "delivered");
    assert_eq!(order["total_price"], 200);
    assert_eq!(order["items"][0]["count"], 2);

    // Search sees the decremented stock.
    let (status, body) = get(&app, "/search/books?keyword=Rust").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["books"][0]["stock_level"], 3);
}

#[tokio::test]
async fn insufficient_stock_over_http() {
    let app = app().await;

    for (user, pw) in [("buyer", "b-pw"), ("seller", "s-pw")] {
        post(
            &app,
            "/auth/register",
            json!({"user_id": user, "password": pw}),
        )
        .await;
    }
    post(
        &app,
        "/seller/create_store",
        json!({"user_id": "seller", "store_id": "shop"}),
    )
    .await;
    post(
        &app,
        "/seller/add_book",
        json!({
            "user_id": "seller",
            "store_id": "shop",
            "book_id": "b1",
            "book_info": {"price": 100},
            "stock_level": 5
        }),
    )
    .await;

    let (status, body) = post(
        &app,
        "/buyer/new_order",
        json!({
            "user_id": "buyer",
            "store_id": "shop",
            "books": [{"id": "b1", "count": 6}]
        }),
    )
    .await;
    assert_eq!(status.as_u16(), 517);
    assert_eq!(body["code"], 517);
    assert!(body["message"].as_str().unwrap().contains("b1"));
}
