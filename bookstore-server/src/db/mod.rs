//! Datastore adapter layer
//!
//! The order engine and its collaborator services are written against
//! the [`Datastore`] contract only. Two interchangeable adapters exist:
//!
//! - [`sqlite::SqliteDatastore`]: relational adapter (sqlx/SQLite).
//!   Multi-entity operations run inside one transaction; guards are
//!   conditional `UPDATE ... WHERE` clauses checked via rows-affected.
//! - [`surreal::SurrealDatastore`]: document adapter (embedded
//!   SurrealDB). Guards are conditional updates (compare-and-swap);
//!   multi-entity operations compensate already-applied writes when a
//!   later step fails.
//!
//! Either way, a failed operation leaves stock/balance state equivalent
//! to "no call happened", and status transitions have exactly one
//! winner under concurrency.

pub mod sqlite;
pub mod surreal;

pub use sqlite::SqliteDatastore;
pub use surreal::SurrealDatastore;

use async_trait::async_trait;
use shared::models::{Bookstore, Inventory, Order, OrderItem, OrderStatus, User};
use thiserror::Error;

/// Datastore error types
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && matches!(db_err.kind(), sqlx::error::ErrorKind::UniqueViolation)
        {
            return DbError::Duplicate(db_err.message().to_string());
        }
        DbError::Database(err.to_string())
    }
}

impl From<surrealdb::Error> for DbError {
    fn from(err: surrealdb::Error) -> Self {
        let message = err.to_string();
        // Unique index violations surface as "... already contains ..."
        if message.contains("already contains") {
            return DbError::Duplicate(message);
        }
        DbError::Database(message)
    }
}

/// Result type for datastore operations
pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for shared::error::ApiError {
    fn from(err: DbError) -> Self {
        // Duplicates that matter are mapped to their business error at
        // the call site; anything reaching here is the generic
        // datastore failure.
        match err {
            DbError::Duplicate(msg) | DbError::Database(msg) => {
                shared::error::ApiError::Database(msg)
            }
        }
    }
}

/// Direction of a stock adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockDirection {
    /// Reserve stock; all-or-nothing, rejected on insufficient stock
    Decrease,
    /// Restore stock; unbounded
    Increase,
}

/// Outcome of the atomic order placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceOrderOutcome {
    Placed,
    /// Stock check failed for this book at commit time
    OutOfStock(String),
}

/// Outcome of the atomic payment settlement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    Settled,
    InsufficientFunds,
    SellerMissing,
    /// The `pending -> paid` guard lost the race
    StatusConflict,
}

/// Timestamp fields written together with a guarded status transition
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionStamp {
    pub payment_time: Option<i64>,
    pub shipment_time: Option<i64>,
    pub delivery_time: Option<i64>,
    pub cancelled_at: Option<i64>,
}

impl TransitionStamp {
    pub fn shipped(now: i64) -> Self {
        Self {
            shipment_time: Some(now),
            ..Default::default()
        }
    }

    pub fn delivered(now: i64) -> Self {
        Self {
            delivery_time: Some(now),
            ..Default::default()
        }
    }

    pub fn cancelled(now: i64) -> Self {
        Self {
            cancelled_at: Some(now),
            ..Default::default()
        }
    }
}

/// Abstract datastore contract
///
/// Four entity collections (users, stores, inventory, orders+items)
/// with unique keys, conditional updates, and the range/pagination
/// queries the sweep and list operations need.
#[async_trait]
pub trait Datastore: Send + Sync {
    // ========== Users ==========

    /// Insert a fresh user row; `DbError::Duplicate` on an existing id
    async fn insert_user(&self, user: &User) -> DbResult<()>;

    /// Fetch a user; deleted users are filtered unless requested
    async fn get_user(&self, user_id: &str, include_deleted: bool) -> DbResult<Option<User>>;

    /// Reactivate a soft-deleted user with fresh credentials and zero balance
    async fn revive_user(
        &self,
        user_id: &str,
        password: &str,
        token: &str,
        terminal: &str,
    ) -> DbResult<bool>;

    async fn update_token(&self, user_id: &str, token: &str, terminal: &str) -> DbResult<bool>;

    async fn update_password(
        &self,
        user_id: &str,
        password: &str,
        token: &str,
        terminal: &str,
    ) -> DbResult<bool>;

    /// Flip status to deleted and clear credentials; the row stays
    async fn soft_delete_user(&self, user_id: &str) -> DbResult<bool>;

    /// Atomically apply `balance += delta`; rejects (false, no mutation)
    /// when the result would be negative or the user is missing/deleted.
    async fn change_balance(&self, user_id: &str, delta: i64) -> DbResult<bool>;

    // ========== Stores & inventory ==========

    async fn insert_store(&self, store: &Bookstore) -> DbResult<()>;

    async fn get_store(&self, store_id: &str) -> DbResult<Option<Bookstore>>;

    async fn insert_inventory(&self, inventory: &Inventory) -> DbResult<()>;

    async fn get_inventory(&self, store_id: &str, book_id: &str) -> DbResult<Option<Inventory>>;

    /// Adjust stock for a batch of `(book_id, count)` pairs.
    ///
    /// `Decrease` verifies every item has sufficient stock and leaves
    /// the store untouched when any does not (returns false).
    /// `Increase` restores reserved stock; false only when a row is
    /// missing.
    async fn adjust_stock(
        &self,
        store_id: &str,
        items: &[(String, i64)],
        direction: StockDirection,
    ) -> DbResult<bool>;

    // ========== Orders ==========

    /// Reserve stock for every item and persist the order plus its
    /// items as one atomic unit. On `OutOfStock` no mutation survives.
    async fn place_order(&self, order: &Order, items: &[OrderItem]) -> DbResult<PlaceOrderOutcome>;

    async fn get_order(&self, order_id: &str) -> DbResult<Option<Order>>;

    async fn get_order_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>>;

    /// Guarded status transition: applied only when the persisted
    /// status still equals `expected` at write time. Returns whether
    /// this caller won the transition.
    async fn transition_order(
        &self,
        order_id: &str,
        expected: OrderStatus,
        new_status: OrderStatus,
        updated_at: i64,
        stamp: TransitionStamp,
    ) -> DbResult<bool>;

    /// Buyer debit, seller credit, and the `pending -> paid` guard as
    /// one settlement. A non-`Settled` outcome leaves balances and the
    /// order as if the call never happened.
    async fn settle_payment(
        &self,
        order_id: &str,
        buyer_id: &str,
        seller_id: &str,
        amount: i64,
        now: i64,
    ) -> DbResult<SettleOutcome>;

    /// Pending orders past their deadline: `expires_at <= now`, or for
    /// legacy rows without `expires_at`, `created_at <= legacy_cutoff`.
    async fn find_expired_pending(&self, now: i64, legacy_cutoff: i64) -> DbResult<Vec<Order>>;

    /// Paginated orders for a user, `updated_at` descending
    async fn list_orders(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> DbResult<(i64, Vec<Order>)>;

    // ========== Search ==========

    /// Keyword substring search over listing search text, optionally
    /// scoped to one store, `updated_at` descending
    async fn search_books(
        &self,
        keyword: Option<&str>,
        store_id: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> DbResult<(i64, Vec<Inventory>)>;
}
