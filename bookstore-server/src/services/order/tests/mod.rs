use super::*;

use crate::db::{SqliteDatastore, SurrealDatastore};
use crate::services::{SellerService, UserService};
use shared::models::OrderStatus;

mod test_document_backend;
mod test_flows;

/// Default pending timeout for tests that never hit the sweep
const LONG_TIMEOUT: Duration = Duration::from_secs(1800);

/// Timeout that makes every fresh order immediately expired
const ZERO_TIMEOUT: Duration = Duration::from_secs(0);

struct TestContext {
    store: Arc<dyn Datastore>,
    users: UserService,
    sellers: SellerService,
    orders: OrderService,
}

fn build_context(store: Arc<dyn Datastore>, pending_timeout: Duration) -> TestContext {
    TestContext {
        users: UserService::new(store.clone(), 3600),
        sellers: SellerService::new(store.clone()),
        orders: OrderService::new(store.clone(), pending_timeout),
        store,
    }
}

async fn sqlite_context() -> TestContext {
    sqlite_context_with_timeout(LONG_TIMEOUT).await
}

async fn sqlite_context_with_timeout(pending_timeout: Duration) -> TestContext {
    let store = SqliteDatastore::open_in_memory().await.unwrap();
    build_context(Arc::new(store), pending_timeout)
}

async fn surreal_context_with_timeout(pending_timeout: Duration) -> TestContext {
    let store = SurrealDatastore::open_in_memory().await.unwrap();
    build_context(Arc::new(store), pending_timeout)
}

impl TestContext {
    /// Register a user and top up an initial balance
    async fn seed_user(&self, user_id: &str, password: &str, balance: i64) {
        self.users.register(user_id, password).await.unwrap();
        if balance > 0 {
            self.orders
                .add_funds(user_id, password, balance)
                .await
                .unwrap();
        }
    }

    async fn seed_store(&self, seller_id: &str, store_id: &str) {
        self.sellers
            .create_store(seller_id, store_id)
            .await
            .unwrap();
    }

    /// List a book with a structured price column
    async fn seed_book(&self, seller_id: &str, store_id: &str, book_id: &str, price: i64, stock: i64) {
        let info = format!(r#"{{"title":"Book {book_id}","author":"Author","price":{price}}}"#);
        self.sellers
            .add_book(seller_id, store_id, book_id, &info, stock)
            .await
            .unwrap();
    }

    async fn stock_level(&self, store_id: &str, book_id: &str) -> i64 {
        self.store
            .get_inventory(store_id, book_id)
            .await
            .unwrap()
            .unwrap()
            .stock_level
    }

    async fn balance(&self, user_id: &str) -> i64 {
        self.store
            .get_user(user_id, true)
            .await
            .unwrap()
            .unwrap()
            .balance
    }

    async fn order_status(&self, order_id: &str) -> OrderStatus {
        self.store
            .get_order(order_id)
            .await
            .unwrap()
            .unwrap()
            .status
    }
}

// ========================================================================
// Helper: buyer + seller + one listed book, ready to order
// ========================================================================

async fn seed_shop(ctx: &TestContext, price: i64, stock: i64) {
    ctx.seed_user("buyer", "buyer-pw", 10_000).await;
    ctx.seed_user("seller", "seller-pw", 0).await;
    ctx.seed_store("seller", "shop").await;
    ctx.seed_book("seller", "shop", "b1", price, stock).await;
}
