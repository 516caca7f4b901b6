//! Document datastore adapter (embedded SurrealDB)
//!
//! Documents mirror the relational schema: `user`, `store`, `inventory`
//! and `order` tables with unique indexes on the business keys; order
//! items are embedded in the order document.
//!
//! There is no cross-document transaction here. Guards are conditional
//! `UPDATE ... WHERE` statements (compare-and-swap on the matched
//! fields), and multi-document operations apply writes in a safe order
//! and compensate the already-applied ones when a later step fails, so
//! an overall failure leaves state equivalent to "no call happened".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem, RocksDb};

use shared::models::{Bookstore, Inventory, Order, OrderItem, OrderStatus, User};
use shared::util::now_millis;

use super::{
    Datastore, DbError, DbResult, PlaceOrderOutcome, SettleOutcome, StockDirection,
    TransitionStamp,
};

/// Schema bootstrap: unique business keys plus the sweep/list indexes
const DEFINE_SCHEMA: &str = "
    DEFINE TABLE IF NOT EXISTS user SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS uniq_user_id ON TABLE user COLUMNS user_id UNIQUE;
    DEFINE TABLE IF NOT EXISTS store SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS uniq_store_id ON TABLE store COLUMNS store_id UNIQUE;
    DEFINE TABLE IF NOT EXISTS inventory SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS uniq_inventory ON TABLE inventory COLUMNS store_id, book_id UNIQUE;
    DEFINE TABLE IF NOT EXISTS order SCHEMALESS;
    DEFINE INDEX IF NOT EXISTS uniq_order_id ON TABLE order COLUMNS order_id UNIQUE;
    DEFINE INDEX IF NOT EXISTS idx_order_user_status ON TABLE order COLUMNS user_id, status;
    DEFINE INDEX IF NOT EXISTS idx_order_status_expires ON TABLE order COLUMNS status, expires_at;
";

/// Order document: the order entity with its items embedded
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OrderDoc {
    #[serde(flatten)]
    order: Order,
    items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
struct ItemsRow {
    items: Vec<OrderItem>,
}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: i64,
}

/// SurrealDB-backed datastore
#[derive(Clone)]
pub struct SurrealDatastore {
    db: Surreal<Db>,
}

impl SurrealDatastore {
    /// Open (or create) a RocksDB-backed database at the given path
    pub async fn new(db_path: &str) -> DbResult<Self> {
        let db = Surreal::new::<RocksDb>(db_path).await?;
        Self::init(db).await
    }

    /// In-memory database (tests)
    pub async fn open_in_memory() -> DbResult<Self> {
        let db = Surreal::new::<Mem>(()).await?;
        Self::init(db).await
    }

    async fn init(db: Surreal<Db>) -> DbResult<Self> {
        db.use_ns("bookstore").use_db("bookstore").await?;
        db.query(DEFINE_SCHEMA).await?.check()?;
        tracing::debug!("SurrealDB schema defined");
        Ok(Self { db })
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }

    /// Best-effort stock restoration for compensation paths
    async fn restore_stock(&self, store_id: &str, items: &[(String, i64)]) {
        for (book_id, count) in items {
            let result = self
                .db
                .query(
                    "UPDATE inventory SET stock_level += $count, updated_at = $now \
                     WHERE store_id = $sid AND book_id = $bid",
                )
                .bind(("count", *count))
                .bind(("now", now_millis()))
                .bind(("sid", store_id.to_string()))
                .bind(("bid", book_id.clone()))
                .await
                .and_then(|res| res.check());
            if let Err(e) = result {
                tracing::error!(
                    store_id = %store_id,
                    book_id = %book_id,
                    error = %e,
                    "Stock restoration failed, inventory left short"
                );
            }
        }
    }

    /// Hand a reserved order back to `pending` after a failed settlement
    async fn revert_payment_reservation(&self, order_id: &str) {
        let reverted = self
            .db
            .query(
                "UPDATE order SET status = 'pending', payment_time = NONE, updated_at = $now \
                 WHERE order_id = $oid AND status = 'paid' RETURN AFTER",
            )
            .bind(("now", now_millis()))
            .bind(("oid", order_id.to_string()))
            .await
            .and_then(|res| res.check());
        if let Err(e) = reverted {
            tracing::error!(order_id = %order_id, error = %e, "Payment revert failed, order stuck in paid");
        }
    }

    /// Conditional decrement for one line; true when the guard matched
    async fn try_decrement(&self, store_id: &str, book_id: &str, count: i64) -> DbResult<bool> {
        let mut res = self
            .db
            .query(
                "UPDATE inventory SET stock_level -= $count, updated_at = $now \
                 WHERE store_id = $sid AND book_id = $bid AND stock_level >= $count \
                 RETURN AFTER",
            )
            .bind(("count", count))
            .bind(("now", now_millis()))
            .bind(("sid", store_id.to_string()))
            .bind(("bid", book_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<Inventory> = res.take(0)?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl Datastore for SurrealDatastore {
    // ========== Users ==========

    async fn insert_user(&self, user: &User) -> DbResult<()> {
        self.db
            .query("CREATE user CONTENT $data")
            .bind(("data", user.clone()))
            .await?
            .check()?;
        Ok(())
    }

    async fn get_user(&self, user_id: &str, include_deleted: bool) -> DbResult<Option<User>> {
        let sql = if include_deleted {
            "SELECT * FROM user WHERE user_id = $uid"
        } else {
            "SELECT * FROM user WHERE user_id = $uid AND status = 'active'"
        };
        let mut res = self
            .db
            .query(sql)
            .bind(("uid", user_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<User> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn revive_user(
        &self,
        user_id: &str,
        password: &str,
        token: &str,
        terminal: &str,
    ) -> DbResult<bool> {
        let mut res = self
            .db
            .query(
                "UPDATE user SET password = $password, balance = 0, token = $token, \
                 terminal = $terminal, status = 'active', updated_at = $now \
                 WHERE user_id = $uid AND status = 'deleted' RETURN AFTER",
            )
            .bind(("password", password.to_string()))
            .bind(("token", token.to_string()))
            .bind(("terminal", terminal.to_string()))
            .bind(("now", now_millis()))
            .bind(("uid", user_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<User> = res.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn update_token(&self, user_id: &str, token: &str, terminal: &str) -> DbResult<bool> {
        let mut res = self
            .db
            .query(
                "UPDATE user SET token = $token, terminal = $terminal, updated_at = $now \
                 WHERE user_id = $uid AND status = 'active' RETURN AFTER",
            )
            .bind(("token", token.to_string()))
            .bind(("terminal", terminal.to_string()))
            .bind(("now", now_millis()))
            .bind(("uid", user_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<User> = res.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn update_password(
        &self,
        user_id: &str,
        password: &str,
        token: &str,
        terminal: &str,
    ) -> DbResult<bool> {
        let mut res = self
            .db
            .query(
                "UPDATE user SET password = $password, token = $token, terminal = $terminal, \
                 updated_at = $now WHERE user_id = $uid AND status = 'active' RETURN AFTER",
            )
            .bind(("password", password.to_string()))
            .bind(("token", token.to_string()))
            .bind(("terminal", terminal.to_string()))
            .bind(("now", now_millis()))
            .bind(("uid", user_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<User> = res.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn soft_delete_user(&self, user_id: &str) -> DbResult<bool> {
        let mut res = self
            .db
            .query(
                "UPDATE user SET status = 'deleted', token = NONE, terminal = NONE, \
                 updated_at = $now WHERE user_id = $uid AND status = 'active' RETURN AFTER",
            )
            .bind(("now", now_millis()))
            .bind(("uid", user_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<User> = res.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn change_balance(&self, user_id: &str, delta: i64) -> DbResult<bool> {
        // Conditional update: the `balance + $delta >= 0` guard is
        // evaluated on the stored value, so concurrent calls cannot
        // take the balance negative.
        let mut res = self
            .db
            .query(
                "UPDATE user SET balance += $delta, updated_at = $now \
                 WHERE user_id = $uid AND status = 'active' AND balance + $delta >= 0 \
                 RETURN AFTER",
            )
            .bind(("delta", delta))
            .bind(("now", now_millis()))
            .bind(("uid", user_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<User> = res.take(0)?;
        Ok(!rows.is_empty())
    }

    // ========== Stores & inventory ==========

    async fn insert_store(&self, store: &Bookstore) -> DbResult<()> {
        self.db
            .query("CREATE store CONTENT $data")
            .bind(("data", store.clone()))
            .await?
            .check()?;
        Ok(())
    }

    async fn get_store(&self, store_id: &str) -> DbResult<Option<Bookstore>> {
        let mut res = self
            .db
            .query("SELECT * FROM store WHERE store_id = $sid")
            .bind(("sid", store_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<Bookstore> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn insert_inventory(&self, inventory: &Inventory) -> DbResult<()> {
        self.db
            .query("CREATE inventory CONTENT $data")
            .bind(("data", inventory.clone()))
            .await?
            .check()?;
        Ok(())
    }

    async fn get_inventory(&self, store_id: &str, book_id: &str) -> DbResult<Option<Inventory>> {
        let mut res = self
            .db
            .query("SELECT * FROM inventory WHERE store_id = $sid AND book_id = $bid")
            .bind(("sid", store_id.to_string()))
            .bind(("bid", book_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<Inventory> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn adjust_stock(
        &self,
        store_id: &str,
        items: &[(String, i64)],
        direction: StockDirection,
    ) -> DbResult<bool> {
        match direction {
            StockDirection::Decrease => {
                // Conditional per-item decrement; restore the already
                // applied lines when a later line's guard fails.
                let mut applied: Vec<(String, i64)> = Vec::new();
                for (book_id, count) in items {
                    match self.try_decrement(store_id, book_id, *count).await {
                        Ok(true) => applied.push((book_id.clone(), *count)),
                        Ok(false) => {
                            self.restore_stock(store_id, &applied).await;
                            return Ok(false);
                        }
                        Err(e) => {
                            self.restore_stock(store_id, &applied).await;
                            return Err(e);
                        }
                    }
                }
                Ok(true)
            }
            StockDirection::Increase => {
                for (book_id, count) in items {
                    let mut res = self
                        .db
                        .query(
                            "UPDATE inventory SET stock_level += $count, updated_at = $now \
                             WHERE store_id = $sid AND book_id = $bid RETURN AFTER",
                        )
                        .bind(("count", *count))
                        .bind(("now", now_millis()))
                        .bind(("sid", store_id.to_string()))
                        .bind(("bid", book_id.clone()))
                        .await?
                        .check()?;
                    let rows: Vec<Inventory> = res.take(0)?;
                    if rows.is_empty() {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    // ========== Orders ==========

    async fn place_order(&self, order: &Order, items: &[OrderItem]) -> DbResult<PlaceOrderOutcome> {
        // Reserve stock line by line before the order document exists;
        // a shortfall (or a failed create) hands every reserved line
        // back.
        let mut applied: Vec<(String, i64)> = Vec::new();
        for item in items {
            match self
                .try_decrement(&order.store_id, &item.book_id, item.count)
                .await
            {
                Ok(true) => applied.push((item.book_id.clone(), item.count)),
                Ok(false) => {
                    self.restore_stock(&order.store_id, &applied).await;
                    return Ok(PlaceOrderOutcome::OutOfStock(item.book_id.clone()));
                }
                Err(e) => {
                    self.restore_stock(&order.store_id, &applied).await;
                    return Err(e);
                }
            }
        }

        let doc = OrderDoc {
            order: order.clone(),
            items: items.to_vec(),
        };
        let created = self
            .db
            .query("CREATE order CONTENT $data")
            .bind(("data", doc))
            .await
            .map_err(DbError::from)
            .and_then(|res| res.check().map_err(DbError::from));
        if let Err(e) = created {
            self.restore_stock(&order.store_id, &applied).await;
            return Err(e);
        }
        Ok(PlaceOrderOutcome::Placed)
    }

    async fn get_order(&self, order_id: &str) -> DbResult<Option<Order>> {
        let mut res = self
            .db
            .query("SELECT * FROM order WHERE order_id = $oid")
            .bind(("oid", order_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<Order> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn get_order_items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let mut res = self
            .db
            .query("SELECT items FROM order WHERE order_id = $oid")
            .bind(("oid", order_id.to_string()))
            .await?
            .check()?;
        let rows: Vec<ItemsRow> = res.take(0)?;
        Ok(rows.into_iter().next().map(|r| r.items).unwrap_or_default())
    }

    async fn transition_order(
        &self,
        order_id: &str,
        expected: OrderStatus,
        new_status: OrderStatus,
        updated_at: i64,
        stamp: TransitionStamp,
    ) -> DbResult<bool> {
        let mut sets = String::from("status = $new, updated_at = $now");
        if stamp.payment_time.is_some() {
            sets.push_str(", payment_time = $payment_time");
        }
        if stamp.shipment_time.is_some() {
            sets.push_str(", shipment_time = $shipment_time");
        }
        if stamp.delivery_time.is_some() {
            sets.push_str(", delivery_time = $delivery_time");
        }
        if stamp.cancelled_at.is_some() {
            sets.push_str(", cancelled_at = $cancelled_at");
        }
        let sql = format!(
            "UPDATE order SET {sets} WHERE order_id = $oid AND status = $expected RETURN AFTER"
        );

        let mut query = self
            .db
            .query(sql)
            .bind(("new", new_status.as_str()))
            .bind(("now", updated_at))
            .bind(("oid", order_id.to_string()))
            .bind(("expected", expected.as_str()));
        if let Some(t) = stamp.payment_time {
            query = query.bind(("payment_time", t));
        }
        if let Some(t) = stamp.shipment_time {
            query = query.bind(("shipment_time", t));
        }
        if let Some(t) = stamp.delivery_time {
            query = query.bind(("delivery_time", t));
        }
        if let Some(t) = stamp.cancelled_at {
            query = query.bind(("cancelled_at", t));
        }

        let mut res = query.await?.check()?;
        let rows: Vec<Order> = res.take(0)?;
        Ok(!rows.is_empty())
    }

    async fn settle_payment(
        &self,
        order_id: &str,
        buyer_id: &str,
        seller_id: &str,
        amount: i64,
        now: i64,
    ) -> DbResult<SettleOutcome> {
        // Reserve-then-commit: winning the status guard first means a
        // racing sweep or second payment sees `paid` and backs off;
        // the money writes are then compensated on failure.
        let reserved = self
            .transition_order(
                order_id,
                OrderStatus::Pending,
                OrderStatus::Paid,
                now,
                TransitionStamp {
                    payment_time: Some(now),
                    ..Default::default()
                },
            )
            .await?;
        if !reserved {
            return Ok(SettleOutcome::StatusConflict);
        }

        let mut res = self
            .db
            .query(
                "UPDATE user SET balance -= $amount, updated_at = $now \
                 WHERE user_id = $uid AND status = 'active' AND balance >= $amount \
                 RETURN AFTER",
            )
            .bind(("amount", amount))
            .bind(("now", now))
            .bind(("uid", buyer_id.to_string()))
            .await?
            .check()?;
        let debited: Vec<User> = res.take(0)?;
        if debited.is_empty() {
            self.revert_payment_reservation(order_id).await;
            return Ok(SettleOutcome::InsufficientFunds);
        }

        let mut res = self
            .db
            .query(
                "UPDATE user SET balance += $amount, updated_at = $now \
                 WHERE user_id = $uid AND status = 'active' RETURN AFTER",
            )
            .bind(("amount", amount))
            .bind(("now", now))
            .bind(("uid", seller_id.to_string()))
            .await?
            .check()?;
        let credited: Vec<User> = res.take(0)?;
        if credited.is_empty() {
            // Refund the buyer before handing the order back.
            if let Err(e) = self.change_balance(buyer_id, amount).await {
                tracing::error!(order_id = %order_id, error = %e, "Buyer refund failed after missing seller");
            }
            self.revert_payment_reservation(order_id).await;
            return Ok(SettleOutcome::SellerMissing);
        }

        Ok(SettleOutcome::Settled)
    }

    async fn find_expired_pending(&self, now: i64, legacy_cutoff: i64) -> DbResult<Vec<Order>> {
        let mut res = self
            .db
            .query(
                "SELECT * FROM order WHERE status = 'pending' AND \
                 ((expires_at != NONE AND expires_at <= $now) OR \
                  (expires_at = NONE AND created_at <= $cutoff))",
            )
            .bind(("now", now))
            .bind(("cutoff", legacy_cutoff))
            .await?
            .check()?;
        let rows: Vec<Order> = res.take(0)?;
        Ok(rows)
    }

    async fn list_orders(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: i64,
        page_size: i64,
    ) -> DbResult<(i64, Vec<Order>)> {
        let status_filter = if status.is_some() {
            " AND status = $status"
        } else {
            ""
        };
        let start = (page - 1) * page_size;

        let count_sql =
            format!("SELECT count() FROM order WHERE user_id = $uid{status_filter} GROUP ALL");
        let mut query = self.db.query(count_sql).bind(("uid", user_id.to_string()));
        if let Some(status) = status {
            query = query.bind(("status", status.as_str()));
        }
        let mut res = query.await?.check()?;
        let counts: Vec<CountRow> = res.take(0)?;
        let total = counts.first().map(|c| c.count).unwrap_or(0);

        let list_sql = format!(
            "SELECT * FROM order WHERE user_id = $uid{status_filter} \
             ORDER BY updated_at DESC LIMIT {page_size} START {start}"
        );
        let mut query = self.db.query(list_sql).bind(("uid", user_id.to_string()));
        if let Some(status) = status {
            query = query.bind(("status", status.as_str()));
        }
        let mut res = query.await?.check()?;
        let orders: Vec<Order> = res.take(0)?;
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
        let mut conditions: Vec<&str> = Vec::new();
        if store_id.is_some() {
            conditions.push("store_id = $sid");
        }
        if keyword.is_some() {
            conditions.push("string::contains(search_text ?? '', $kw)");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let start = (page - 1) * page_size;

        let count_sql = format!("SELECT count() FROM inventory{where_clause} GROUP ALL");
        let mut query = self.db.query(count_sql);
        if let Some(sid) = store_id {
            query = query.bind(("sid", sid.to_string()));
        }
        if let Some(kw) = keyword {
            query = query.bind(("kw", kw.to_string()));
        }
        let mut res = query.await?.check()?;
        let counts: Vec<CountRow> = res.take(0)?;
        let total = counts.first().map(|c| c.count).unwrap_or(0);

        let list_sql = format!(
            "SELECT * FROM inventory{where_clause} \
             ORDER BY updated_at DESC LIMIT {page_size} START {start}"
        );
        let mut query = self.db.query(list_sql);
        if let Some(sid) = store_id {
            query = query.bind(("sid", sid.to_string()));
        }
        if let Some(kw) = keyword {
            query = query.bind(("kw", kw.to_string()));
        }
        let mut res = query.await?.check()?;
        let rows: Vec<Inventory> = res.take(0)?;
        Ok((total, rows))
    }
}
