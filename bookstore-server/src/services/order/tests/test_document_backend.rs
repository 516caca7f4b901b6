//! The same engine scenarios against the document adapter.
//!
//! The engine is backend-agnostic; these runs pin down that the
//! SurrealDB adapter's conditional updates and compensation logic
//! uphold the identical contract the SQLite adapter provides
//! transactionally.

use super::*;

use shared::error::ApiError;

#[tokio::test]
async fn test_order_and_payment_flow() {
    let ctx = surreal_context_with_timeout(LONG_TIMEOUT).await;
    seed_shop(&ctx, 100, 5).await;

    let order_id = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 2)])
        .await
        .unwrap();
    assert_eq!(ctx.stock_level("shop", "b1").await, 3);

    let order = ctx.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_price, 200);

    ctx.orders
        .payment("buyer", "buyer-pw", &order_id)
        .await
        .unwrap();
    assert_eq!(ctx.balance("buyer").await, 9_800);
    assert_eq!(ctx.balance("seller").await, 200);

    ctx.orders
        .ship_order("seller", "shop", &order_id)
        .await
        .unwrap();
    ctx.orders
        .confirm_receipt("buyer", &order_id)
        .await
        .unwrap();
    assert_eq!(ctx.order_status(&order_id).await, OrderStatus::Delivered);
}

#[tokio::test]
async fn test_insufficient_stock_compensates_applied_lines() {
    let ctx = surreal_context_with_timeout(LONG_TIMEOUT).await;
    seed_shop(&ctx, 100, 5).await;
    ctx.seed_book("seller", "shop", "b2", 50, 1).await;

    // b1 is decremented first, then b2's guard fails; the adapter must
    // hand b1's reservation back.
    let err = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 2), ("b2".into(), 3)])
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::StockLevelLow("b2".into()));
    assert_eq!(ctx.stock_level("shop", "b1").await, 5);
    assert_eq!(ctx.stock_level("shop", "b2").await, 1);
}

#[tokio::test]
async fn test_insufficient_funds_leaves_order_pending() {
    let ctx = surreal_context_with_timeout(LONG_TIMEOUT).await;
    ctx.seed_user("buyer", "buyer-pw", 50).await;
    ctx.seed_user("seller", "seller-pw", 0).await;
    ctx.seed_store("seller", "shop").await;
    ctx.seed_book("seller", "shop", "b1", 100, 5).await;

    let order_id = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 1)])
        .await
        .unwrap();
    let err = ctx
        .orders
        .payment("buyer", "buyer-pw", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::NotSufficientFunds(order_id.clone()));

    // The reserve-then-commit path must hand the order back untouched.
    let order = ctx.store.get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.payment_time.is_none());
    assert_eq!(ctx.balance("buyer").await, 50);
    assert_eq!(ctx.balance("seller").await, 0);
}

#[tokio::test]
async fn test_cancel_round_trip_and_sweep_idempotence() {
    let ctx = surreal_context_with_timeout(ZERO_TIMEOUT).await;
    seed_shop(&ctx, 100, 8).await;

    let order_id = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 3)])
        .await
        .unwrap();
    assert_eq!(ctx.stock_level("shop", "b1").await, 5);

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    let cancelled = ctx.orders.cancel_expired_orders().await.unwrap();
    assert_eq!(cancelled, 1);
    assert_eq!(
        ctx.order_status(&order_id).await,
        OrderStatus::CancelledTimeout
    );
    assert_eq!(ctx.stock_level("shop", "b1").await, 8);

    let cancelled = ctx.orders.cancel_expired_orders().await.unwrap();
    assert_eq!(cancelled, 0);
    assert_eq!(ctx.stock_level("shop", "b1").await, 8);
}

#[tokio::test]
async fn test_duplicate_registration_maps_unique_index() {
    let ctx = surreal_context_with_timeout(LONG_TIMEOUT).await;
    ctx.seed_user("alice", "pw", 0).await;

    let err = ctx.users.register("alice", "other").await.unwrap_err();
    assert_eq!(err, ApiError::ExistUserId("alice".into()));
}

#[tokio::test]
async fn test_list_orders_sorted_and_filtered() {
    let ctx = surreal_context_with_timeout(LONG_TIMEOUT).await;
    seed_shop(&ctx, 100, 10).await;

    let first = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 1)])
        .await
        .unwrap();
    // Keep updated_at strictly ordered across the two orders.
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 2)])
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    ctx.orders
        .payment("buyer", "buyer-pw", &second)
        .await
        .unwrap();

    let page = ctx.orders.list_orders("buyer", None, 1, 20).await.unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.orders[0].order.order_id, second);

    let page = ctx
        .orders
        .list_orders("buyer", Some("pending"), 1, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.orders[0].order.order_id, first);
    assert_eq!(page.orders[0].items.len(), 1);
}
