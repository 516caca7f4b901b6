use super::*;

use shared::error::ApiError;

#[tokio::test]
async fn test_full_lifecycle() {
    let ctx = sqlite_context().await;
    seed_shop(&ctx, 100, 5).await;

    let order_id = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 2)])
        .await
        .unwrap();

    // payment: buyer debited, seller credited exactly total_price
    ctx.orders
        .payment("buyer", "buyer-pw", &order_id)
        .await
        .unwrap();
    assert_eq!(ctx.balance("buyer").await, 9_800);
    assert_eq!(ctx.balance("seller").await, 200);
    assert_eq!(ctx.order_status(&order_id).await, OrderStatus::Paid);

    ctx.orders
        .ship_order("seller", "shop", &order_id)
        .await
        .unwrap();
    assert_eq!(ctx.order_status(&order_id).await, OrderStatus::Shipped);

    ctx.orders
        .confirm_receipt("buyer", &order_id)
        .await
        .unwrap();
    assert_eq!(ctx.order_status(&order_id).await, OrderStatus::Delivered);

    let order = ctx.store.get_order(&order_id).await.unwrap().unwrap();
    assert!(order.payment_time.is_some());
    assert!(order.shipment_time.is_some());
    assert!(order.delivery_time.is_some());

    // Second confirmation loses the guard.
    let err = ctx
        .orders
        .confirm_receipt("buyer", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::InvalidOrderStatus(order_id.clone()));
}

#[tokio::test]
async fn test_payment_insufficient_funds() {
    let ctx = sqlite_context().await;
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

    // Order stays pending, nobody's balance moved.
    assert_eq!(ctx.order_status(&order_id).await, OrderStatus::Pending);
    assert_eq!(ctx.balance("buyer").await, 50);
    assert_eq!(ctx.balance("seller").await, 0);
}

#[tokio::test]
async fn test_payment_validation_errors() {
    let ctx = sqlite_context().await;
    seed_shop(&ctx, 100, 5).await;
    ctx.seed_user("mallory", "mallory-pw", 1_000).await;

    let order_id = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 1)])
        .await
        .unwrap();

    let err = ctx
        .orders
        .payment("buyer", "buyer-pw", "no-such-order")
        .await
        .unwrap_err();
    assert_eq!(err.code(), 518);

    let err = ctx
        .orders
        .payment("mallory", "mallory-pw", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::AuthorizationFail);

    let err = ctx
        .orders
        .payment("buyer", "wrong-pw", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::AuthorizationFail);

    // Nothing above moved money.
    assert_eq!(ctx.balance("buyer").await, 10_000);
}

#[tokio::test]
async fn test_double_payment_rejected() {
    let ctx = sqlite_context().await;
    seed_shop(&ctx, 100, 5).await;

    let order_id = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 1)])
        .await
        .unwrap();
    ctx.orders
        .payment("buyer", "buyer-pw", &order_id)
        .await
        .unwrap();

    let err = ctx
        .orders
        .payment("buyer", "buyer-pw", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::InvalidOrderStatus(order_id.clone()));

    // Exactly one transfer happened.
    assert_eq!(ctx.balance("buyer").await, 9_900);
    assert_eq!(ctx.balance("seller").await, 100);
}

#[tokio::test]
async fn test_payment_after_timeout_cancels_first() {
    let ctx = sqlite_context_with_timeout(ZERO_TIMEOUT).await;
    seed_shop(&ctx, 100, 5).await;

    let order_id = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 2)])
        .await
        .unwrap();
    assert_eq!(ctx.stock_level("shop", "b1").await, 3);

    tokio::time::sleep(std::time::Duration::from_millis(10)).await;

    // The sweep runs as a prefix of payment: the order expires before
    // the transfer is attempted, and exactly one of {paid,
    // cancelled_timeout} wins.
    let err = ctx
        .orders
        .payment("buyer", "buyer-pw", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::InvalidOrderStatus(order_id.clone()));

    assert_eq!(
        ctx.order_status(&order_id).await,
        OrderStatus::CancelledTimeout
    );
    assert_eq!(ctx.stock_level("shop", "b1").await, 5);
    assert_eq!(ctx.balance("buyer").await, 10_000);
    assert_eq!(ctx.balance("seller").await, 0);
}

#[tokio::test]
async fn test_ship_order_guards() {
    let ctx = sqlite_context().await;
    seed_shop(&ctx, 100, 5).await;
    ctx.seed_user("other-seller", "pw", 0).await;
    ctx.seed_store("other-seller", "other-shop").await;

    let order_id = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 1)])
        .await
        .unwrap();

    // Not paid yet.
    let err = ctx
        .orders
        .ship_order("seller", "shop", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::InvalidOrderStatus(order_id.clone()));

    ctx.orders
        .payment("buyer", "buyer-pw", &order_id)
        .await
        .unwrap();

    // Unknown store, foreign store, foreign seller.
    let err = ctx
        .orders
        .ship_order("seller", "ghost-shop", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err.code(), 513);

    let err = ctx
        .orders
        .ship_order("other-seller", "other-shop", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::AuthorizationFail);

    let err = ctx
        .orders
        .ship_order("other-seller", "shop", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::AuthorizationFail);

    // The rightful seller ships exactly once.
    ctx.orders
        .ship_order("seller", "shop", &order_id)
        .await
        .unwrap();
    let err = ctx
        .orders
        .ship_order("seller", "shop", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::InvalidOrderStatus(order_id.clone()));
}

#[tokio::test]
async fn test_confirm_receipt_requires_shipped() {
    let ctx = sqlite_context().await;
    seed_shop(&ctx, 100, 5).await;

    let order_id = ctx
        .orders
        .new_order("buyer", "shop", &[("b1".into(), 1)])
        .await
        .unwrap();

    let err = ctx
        .orders
        .confirm_receipt("buyer", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::InvalidOrderStatus(order_id.clone()));

    let err = ctx
        .orders
        .confirm_receipt("seller", &order_id)
        .await
        .unwrap_err();
    assert_eq!(err, ApiError::AuthorizationFail);
}

#[tokio::test]
async fn test_list_orders() {
    let ctx = sqlite_context().await;
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
    ctx.orders.payment("buyer", "buyer-pw", &second).await.unwrap();

    let page = ctx
        .orders
        .list_orders("buyer", None, 1, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.orders.len(), 2);
    // Most recently updated first.
    assert_eq!(page.orders[0].order.order_id, second);
    assert_eq!(page.orders[0].items.len(), 1);

    let page = ctx
        .orders
        .list_orders("buyer", Some("pending"), 1, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.orders[0].order.order_id, first);

    // Unknown status filter matches nothing.
    let page = ctx
        .orders
        .list_orders("buyer", Some("refunded"), 1, 20)
        .await
        .unwrap();
    assert_eq!(page.total, 0);

    // Clamps: page >= 1, page_size in [1, 50], 0 means the default.
    let page = ctx
        .orders
        .list_orders("buyer", None, -3, 500)
        .await
        .unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, 50);
    let page = ctx.orders.list_orders("buyer", None, 1, 0).await.unwrap();
    assert_eq!(page.page_size, 20);

    let err = ctx
        .orders
        .list_orders("nobody", None, 1, 20)
        .await
        .unwrap_err();
    assert_eq!(err.code(), 511);
}

#[tokio::test]
async fn test_list_orders_pagination() {
    let ctx = sqlite_context().await;
    seed_shop(&ctx, 10, 100).await;

    for _ in 0..5 {
        ctx.orders
            .new_order("buyer", "shop", &[("b1".into(), 1)])
            .await
            .unwrap();
    }

    let page = ctx.orders.list_orders("buyer", None, 1, 2).await.unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.orders.len(), 2);

    let page = ctx.orders.list_orders("buyer", None, 3, 2).await.unwrap();
    assert_eq!(page.orders.len(), 1);

    let page = ctx.orders.list_orders("buyer", None, 4, 2).await.unwrap();
    assert!(page.orders.is_empty());
}
