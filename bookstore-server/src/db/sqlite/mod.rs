//! Relational datastore adapter (sqlx / SQLite)
//!
//! One logical operation = one transaction. Stock and balance guards
//! are conditional `UPDATE ... WHERE` clauses; a guard that matches no
//! row aborts the transaction, so multi-entity operations are
//! all-or-nothing.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;

use shared::models::{Bookstore, Inventory, Order, OrderItem, OrderStatus, User};
use shared::util::now_millis;

use super::{
    Datastore, DbError, DbResult, PlaceOrderOutcome, SettleOutcome, StockDirection,
    TransitionStamp,
};

/// SQLite-backed datastore — owns a connection pool
#[derive(Clone)]
pub struct SqliteDatastore {
    pool: SqlitePool,
}

impl SqliteDatastore {
    /// Open (or create) a database file with WAL mode and run migrations
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
            .map_err(|e| DbError::Database(format!("Invalid database path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON")
            .optimize_on_close(true, None);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Database(format!("Failed to open database: {e}")))?;

        // busy_timeout: 写冲突时等待 5s 而非立即失败
        sqlx::query("PRAGMA busy_timeout = 5000;")
            .execute(&pool)
            .await
            .map_err(|e| DbError::Database(format!("Failed to set busy_timeout: {e}")))?;

        tracing::info!("Database connection established (SQLite WAL, busy_timeout=5000ms)");

        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory database (tests); single connection so every handle
    /// sees the same store
    pub async fn open_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DbError::Database(e.to_string()))?
            .pragma("foreign_keys", "ON");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| DbError::Database(e.to_string()))?;
        Self::migrate(&pool).await?;
        Ok(Self { pool })
    }

    async fn migrate(pool: &SqlitePool) -> DbResult<()> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| DbError::Database(format!("Failed to apply migrations: {e}")))?;
        tracing::debug!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl Datastore for SqliteDatastore {
    // ========== Users ==========

    async fn insert_user(&self, user: &User) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO users (user_id, password, balance, token, terminal, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&user.user_id)
        .bind(&user.password)
        .bind(user.balance)
        .bind(&user.token)
        .bind(&user.terminal)
        .bind(user.status.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str, include_deleted: bool) -> DbResult<Option<User>> {
        let sql = if include_deleted {
            "SELECT * FROM users WHERE user_id = ?"
        } else {
            "SELECT * FROM users WHERE user_id = ? AND status = 'active'"
        };
        let user = sqlx::query_as::<_, User>(sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn revive_user(
        &self,
        user_id: &str,
        password: &str,
        token: &str,
        terminal: &str,
    ) -> DbResult<bool> {
        let rows = sqlx::query(
            "UPDATE users SET password = ?1, balance = 0, token = ?2, terminal = ?3, \
             status = 'active', updated_at = ?4 WHERE user_id = ?5 AND status = 'deleted'",
        )
        .bind(password)
        .bind(token)
        .bind(terminal)
        .bind(now_millis())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(rows.rows_affected() > 0)
    }

    async fn update_token(&self, user_id: &str, token: &str, terminal: &str) -> DbResult<bool> {
        let rows = sqlx::query(
            "UPDATE users SET token = ?1, terminal = ?2, updated_at = ?3 \
             WHERE user_id = ?4 AND status = 'active'",
        )
        .bind(token)
        .bind(terminal)
        .bind(now_millis())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(rows.rows_affected() > 0)
    }

    async fn update_password(
        &self,
        user_id: &str,
        password: &str,
        token: &str,
        terminal: &str,
    ) -> DbResult<bool> {
        let rows = sqlx::query(
            "UPDATE users SET password = ?1, token = ?2, terminal = ?3, updated_at = ?4 \
             WHERE user_id = ?5 AND status = 'active'",
        )
        .bind(password)
        .bind(token)
        .bind(terminal)
        .bind(now_millis())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(rows.rows_affected() > 0)
    }

    async fn soft_delete_user(&self, user_id: &str) -> DbResult<bool> {
        let rows = sqlx::query(
            "UPDATE users SET status = 'deleted', token = NULL, terminal = NULL, updated_at = ?1 \
             WHERE user_id = ?2 AND status = 'active'",
        )
        .bind(now_millis())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(rows.rows_affected() > 0)
    }

    async fn change_balance(&self, user_id: &str, delta: i64) -> DbResult<bool> {
        // Single guarded round trip; the balance can never go negative.
        let rows = sqlx::query(
            "UPDATE users SET balance = balance + ?1, updated_at = ?2 \
             WHERE user_id = ?3 AND status = 'active' AND balance + ?1 >= 0",
        )
        .bind(delta)
        .bind(now_millis())
        .bind(user_id)
        .execute(&self.pool)
        .await?;
        Ok(rows.rows_affected() > 0)
    }

    // ========== Stores & inventory ==========

    async fn insert_store(&self, store: &Bookstore) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO bookstores (store_id, owner_id, name, description, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&store.store_id)
        .bind(&store.owner_id)
        .bind(&store.name)
        .bind(&store.description)
        .bind(store.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_store(&self, store_id: &str) -> DbResult<Option<Bookstore>> {
        let store = sqlx::query_as::<_, Bookstore>("SELECT * FROM bookstores WHERE store_id = ?")
            .bind(store_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(store)
    }

    async fn insert_inventory(&self, inventory: &Inventory) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO inventories (store_id, book_id, book_info, stock_level, price, search_text, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&inventory.store_id)
        .bind(&inventory.book_id)
        .bind(&inventory.book_info)
        .bind(inventory.stock_level)
        .bind(inventory.price)
        .bind(&inventory.search_text)
        .bind(inventory.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_inventory(&self, store_id: &str, book_id: &str) -> DbResult<Option<Inventory>> {
        let inventory = sqlx::query_as::<_, Inventory>(
            "SELECT * FROM inventories WHERE store_id = ? AND book_id = ?",
        )
        .bind(store_id)
        .bind(book_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(inventory)
    }

    async fn adjust_stock(
        &self,
        store_id: &str,
        items: &[(String, i64)],
        direction: StockDirection,
    ) -> DbResult<bool> {
        if items.is_empty() {
            return Ok(true);
        }
        let now = now_millis();
        let mut tx = self.pool.begin().await?;
        for (book_id, count) in items {
            let sql = match direction {
                StockDirection::Decrease => {
                    "UPDATE inventories SET stock_level = stock_level - ?1, updated_at = ?2 \
                     WHERE store_id = ?3 AND book_id = ?4 AND stock_level >= ?1"
                }
                StockDirection::Increase => {
                    "UPDATE inventories SET stock_level = stock_level + ?1, updated_at = ?2 \
                     WHERE store_id = ?3 AND book_id = ?4"
                }
            };
            let rows = sqlx::query(sql)
                .bind(count)
                .bind(now)
                .bind(store_id)
                .bind(book_id)
                .execute(&mut *tx)
                .await?;
            if rows.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(false);
            }
        }
        tx.commit().await?;
        Ok(true)
    }

    // ========== Orders ==========

    async fn place_order(&self, order: &Order, items: &[OrderItem]) -> DbResult<PlaceOrderOutcome> {
        let mut tx = self.pool.begin().await?;

        // Reserve stock for every line; any shortfall aborts the whole
        // transaction and reports the offending book.
        for item in items {
            let rows = sqlx::query(
                "UPDATE inventories SET stock_level = stock_level - ?1, updated_at = ?2 \
                 WHERE store_id = ?3 AND book_id = ?4 AND stock_level >= ?1",
            )
            .bind(item.count)
            .bind(order.created_at)
            .bind(&order.store_id)
            .bind(&item.book_id)
            .execute(&mut *tx)
            .await?;
            if rows.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(PlaceOrderOutcome::OutOfStock(item.book_id.clone()));
            }
        }

        sqlx::query(
            "INSERT INTO orders (order_id, user_id, store_id, status, total_price, \
             created_at, updated_at, payment_time, shipment_time, delivery_time, expires_at, cancelled_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, NULL, NULL, NULL, ?8, NULL)",
        )
        .bind(&order.order_id)
        .bind(&order.user_id)
        .bind(&order.store_id)
        .bind(order.status.as_str())
        .bind(order.total_price)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.expires_at)
        .execute(&mut *tx)
        .await?;

        for item in items {
            sqlx::query(
                "INSERT INTO order_items (order_id, book_id, count, unit_price) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(&item.order_id)
            .bind(&item.book_id)
            .bind(item.count)
            .bind(item.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(PlaceOrderOutcome::Placed)
    }

    async fn get_order(&self, order_id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_id = ?")
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(order)
    }

    async fn get_order_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT order_id, book_id, count, unit_price FROM order_items WHERE order_id = ? ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    async fn transition_order(
        &self,
        order_id: &str,
        expected: OrderStatus,
        new_status: OrderStatus,
        updated_at: i64,
        stamp: TransitionStamp,
    ) -> DbResult<bool> {
        let mut sets = vec!["status = ?", "updated_at = ?"];
        if stamp.payment_time.is_some() {
            sets.push("payment_time = ?");
        }
        if stamp.shipment_time.is_some() {
            sets.push("shipment_time = ?");
        }
        if stamp.delivery_time.is_some() {
            sets.push("delivery_time = ?");
        }
        if stamp.cancelled_at.is_some() {
            sets.push("cancelled_at = ?");
        }
        let sql = format!(
            "UPDATE orders SET {} WHERE order_id = ? AND status = ?",
            sets.join(", ")
        );

        let mut query = sqlx::query(&sql).bind(new_status.as_str()).bind(updated_at);
        for value in [
            stamp.payment_time,
            stamp.shipment_time,
            stamp.delivery_time,
            stamp.cancelled_at,
        ]
        .into_iter()
        .flatten()
        {
            query = query.bind(value);
        }
        let rows = query
            .bind(order_id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;
        Ok(rows.rows_affected() > 0)
    }

    async fn settle_payment(
        &self,
        order_id: &str,
        buyer_id: &str,
        seller_id: &str,
        amount: i64,
        now: i64,
    ) -> DbResult<SettleOutcome> {
        let mut tx = self.pool.begin().await?;

        let debited = sqlx::query(
            "UPDATE users SET balance = balance - ?1, updated_at = ?2 \
             WHERE user_id = ?3 AND status = 'active' AND balance >= ?1",
        )
        .bind(amount)
        .bind(now)
        .bind(buyer_id)
        .execute(&mut *tx)
        .await?;
        if debited.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(SettleOutcome::InsufficientFunds);
        }

        let credited = sqlx::query(
            "UPDATE users SET balance = balance + ?1, updated_at = ?2 \
             WHERE user_id = ?3 AND status = 'active'",
        )
        .bind(amount)
        .bind(now)
        .bind(seller_id)
        .execute(&mut *tx)
        .await?;
        if credited.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(SettleOutcome::SellerMissing);
        }

        let flipped = sqlx::query(
            "UPDATE orders SET status = 'paid', payment_time = ?1, updated_at = ?1 \
             WHERE order_id = ?2 AND status = 'pending'",
        )
        .bind(now)
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
        if flipped.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(SettleOutcome::StatusConflict);
        }

        tx.commit().await?;
        Ok(SettleOutcome::Settled)
    }

    async fn find_expired_pending(&self, now: i64, legacy_cutoff: i64) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE status = 'pending' AND \
             ((expires_at IS NOT NULL AND expires_at <= ?1) OR \
              (expires_at IS NULL AND created_at <= ?2))",
        )
        .bind(now)
        .bind(legacy_cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    async fn list_orders(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> DbResult<(i64, Vec<Order>)> {
        let (count_sql, list_sql) = match status {
            Some(_) => (
                "SELECT COUNT(*) FROM orders WHERE user_id = ?1 AND status = ?2",
                "SELECT * FROM orders WHERE user_id = ?1 AND status = ?2 \
                 ORDER BY updated_at DESC LIMIT ?3 OFFSET ?4",
            ),
            None => (
                "SELECT COUNT(*) FROM orders WHERE user_id = ?1",
                "SELECT * FROM orders WHERE user_id = ?1 \
                 ORDER BY updated_at DESC LIMIT ?2 OFFSET ?3",
            ),
        };

        let offset = (page - 1) * page_size;
        let total: i64 = {
            let mut query = sqlx::query_scalar(count_sql).bind(user_id);
            if let Some(status) = status {
                query = query.bind(status.as_str());
            }
            query.fetch_one(&self.pool).await?
        };
        let orders = {
            let mut query = sqlx::query_as::<_, Order>(list_sql).bind(user_id);
            if let Some(status) = status {
                query = query.bind(status.as_str());
            }
            query
                .bind(page_size)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
        };
        Ok((total, orders))
    }

    // ========== Search ==========

    async fn search_books(
        &self,
        keyword: Option<&str>,
        store_id: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> DbResult<(i64, Vec<Inventory>)> {
        let mut conditions = Vec::new();
        if store_id.is_some() {
            conditions.push("store_id = ?1");
        }
        if keyword.is_some() {
            conditions.push(if store_id.is_some() {
                "search_text LIKE ?2"
            } else {
                "search_text LIKE ?1"
            });
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let pattern = keyword.map(|k| format!("%{k}%"));
        let offset = (page - 1) * page_size;

        let count_sql = format!("SELECT COUNT(*) FROM inventories{where_clause}");
        let total: i64 = {
            let mut query = sqlx::query_scalar(&count_sql);
            if let Some(sid) = store_id {
                query = query.bind(sid);
            }
            if let Some(pattern) = &pattern {
                query = query.bind(pattern);
            }
            query.fetch_one(&self.pool).await?
        };

        let list_sql = format!(
            "SELECT * FROM inventories{where_clause} ORDER BY updated_at DESC LIMIT {page_size} OFFSET {offset}"
        );
        let rows = {
            let mut query = sqlx::query_as::<_, Inventory>(&list_sql);
            if let Some(sid) = store_id {
                query = query.bind(sid);
            }
            if let Some(pattern) = &pattern {
                query = query.bind(pattern);
            }
            query.fetch_all(&self.pool).await?
        };
        Ok((total, rows))
    }
}
