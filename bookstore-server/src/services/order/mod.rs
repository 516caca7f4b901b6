//! 订单引擎 - 订单生命周期与库存预留
//!
//! The order lifecycle state machine and the inventory-reservation
//! engine:
//!
//! ```text
//! new_order ──▶ pending ──payment──▶ paid ──ship──▶ shipped ──confirm──▶ delivered
//!                  │
//!                  ├── cancel_order ───────▶ cancelled
//!                  └── cancel_expired_orders ▶ cancelled_timeout
//! ```
//!
//! Every transition is a guarded compare-and-set on the expected prior
//! status, so racing operations (payment vs. the expiry sweep, double
//! confirmations) have exactly one winner. The sweep is lazy: it runs
//! as a prefix of payment, cancel and list instead of on a timer.
//!
//! Inventory restoration is gated on winning the cancel CAS, which
//! makes the sweep idempotent and safe to invoke redundantly from
//! parallel request paths.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use shared::error::{ApiError, ApiResult};
use shared::models::{Order, OrderDetail, OrderItem, OrderPage, OrderStatus};
use shared::util::{self, now_millis};

use crate::db::{Datastore, PlaceOrderOutcome, SettleOutcome, StockDirection, TransitionStamp};

/// Order lifecycle engine
///
/// `pending_timeout` is injected at construction and fixed for the
/// lifetime of the engine.
pub struct OrderService {
    store: Arc<dyn Datastore>,
    pending_timeout: Duration,
}

impl OrderService {
    pub fn new(store: Arc<dyn Datastore>, pending_timeout: Duration) -> Self {
        Self {
            store,
            pending_timeout,
        }
    }

    fn timeout_millis(&self) -> i64 {
        self.pending_timeout.as_millis() as i64
    }

    /// Place an order: validate, snapshot prices, reserve stock and
    /// persist the order atomically.
    ///
    /// Returns the new order id. Any missing entity or stock shortfall
    /// aborts before (or rolls back) every mutation.
    pub async fn new_order(
        &self,
        user_id: &str,
        store_id: &str,
        id_and_count: &[(String, i64)],
    ) -> ApiResult<String> {
        if self.store.get_user(user_id, false).await?.is_none() {
            return Err(ApiError::NonExistUserId(user_id.to_string()));
        }
        if self.store.get_store(store_id).await?.is_none() {
            return Err(ApiError::NonExistStoreId(store_id.to_string()));
        }

        let order_id = util::order_id(user_id, store_id);
        let now = now_millis();

        let mut items = Vec::with_capacity(id_and_count.len());
        for (book_id, count) in id_and_count {
            if *count <= 0 {
                return Err(ApiError::internal(format!(
                    "invalid count {count} for book {book_id}"
                )));
            }
            let Some(inventory) = self.store.get_inventory(store_id, book_id).await? else {
                return Err(ApiError::NonExistBookId(book_id.to_string()));
            };
            if inventory.stock_level < *count {
                return Err(ApiError::StockLevelLow(book_id.to_string()));
            }
            items.push(OrderItem {
                order_id: order_id.clone(),
                book_id: book_id.clone(),
                count: *count,
                unit_price: inventory.unit_price(),
            });
        }

        let total_price = items.iter().map(|i| i.count * i.unit_price).sum();
        let order = Order {
            order_id: order_id.clone(),
            user_id: user_id.to_string(),
            store_id: store_id.to_string(),
            status: OrderStatus::Pending,
            total_price,
            created_at: now,
            updated_at: now,
            payment_time: None,
            shipment_time: None,
            delivery_time: None,
            expires_at: Some(now + self.timeout_millis()),
            cancelled_at: None,
        };

        // The datastore re-checks every stock guard at commit time;
        // the reads above only produce the specific error early.
        match self.store.place_order(&order, &items).await? {
            PlaceOrderOutcome::Placed => {
                tracing::info!(
                    order_id = %order_id,
                    user_id = %user_id,
                    store_id = %store_id,
                    total_price,
                    "Order placed"
                );
                Ok(order_id)
            }
            PlaceOrderOutcome::OutOfStock(book_id) => Err(ApiError::StockLevelLow(book_id)),
        }
    }

    /// Pay for a pending order.
    ///
    /// The buyer debit, seller credit and `pending -> paid` transition
    /// are settled as one atomic unit by the datastore, so a lost race
    /// against the expiry sweep can never leave a transferred balance
    /// behind.
    pub async fn payment(&self, user_id: &str, password: &str, order_id: &str) -> ApiResult<()> {
        self.cancel_expired_orders().await?;

        let Some(order) = self.store.get_order(order_id).await? else {
            return Err(ApiError::InvalidOrderId(order_id.to_string()));
        };
        if order.user_id != user_id {
            return Err(ApiError::AuthorizationFail);
        }
        if order.status != OrderStatus::Pending {
            return Err(ApiError::InvalidOrderStatus(order_id.to_string()));
        }

        let Some(buyer) = self.store.get_user(user_id, false).await? else {
            return Err(ApiError::NonExistUserId(user_id.to_string()));
        };
        if buyer.password != password {
            return Err(ApiError::AuthorizationFail);
        }

        let Some(store) = self.store.get_store(&order.store_id).await? else {
            return Err(ApiError::NonExistStoreId(order.store_id.clone()));
        };
        if self.store.get_user(&store.owner_id, false).await?.is_none() {
            return Err(ApiError::NonExistUserId(store.owner_id.clone()));
        }

        let outcome = self
            .store
            .settle_payment(
                order_id,
                user_id,
                &store.owner_id,
                order.total_price,
                now_millis(),
            )
            .await?;
        match outcome {
            SettleOutcome::Settled => {
                tracing::info!(order_id = %order_id, amount = order.total_price, "Order paid");
                Ok(())
            }
            SettleOutcome::InsufficientFunds => {
                Err(ApiError::NotSufficientFunds(order_id.to_string()))
            }
            SettleOutcome::SellerMissing => Err(ApiError::NonExistUserId(store.owner_id.clone())),
            SettleOutcome::StatusConflict => {
                Err(ApiError::InvalidOrderStatus(order_id.to_string()))
            }
        }
    }

    /// Top up a buyer balance
    pub async fn add_funds(&self, user_id: &str, password: &str, add_value: i64) -> ApiResult<()> {
        match self.store.get_user(user_id, false).await? {
            Some(user) if user.password == password => {}
            _ => return Err(ApiError::AuthorizationFail),
        }
        let applied = self.store.change_balance(user_id, add_value).await?;
        if !applied {
            return Err(ApiError::NonExistUserId(user_id.to_string()));
        }
        Ok(())
    }

    /// Seller ships a paid order
    pub async fn ship_order(
        &self,
        seller_id: &str,
        store_id: &str,
        order_id: &str,
    ) -> ApiResult<()> {
        if self.store.get_user(seller_id, true).await?.is_none() {
            return Err(ApiError::NonExistUserId(seller_id.to_string()));
        }
        let Some(store) = self.store.get_store(store_id).await? else {
            return Err(ApiError::NonExistStoreId(store_id.to_string()));
        };
        if store.owner_id != seller_id {
            return Err(ApiError::AuthorizationFail);
        }

        let Some(order) = self.store.get_order(order_id).await? else {
            return Err(ApiError::InvalidOrderId(order_id.to_string()));
        };
        if order.store_id != store_id {
            return Err(ApiError::AuthorizationFail);
        }
        if order.status != OrderStatus::Paid {
            return Err(ApiError::InvalidOrderStatus(order_id.to_string()));
        }

        let now = now_millis();
        let shipped = self
            .store
            .transition_order(
                order_id,
                OrderStatus::Paid,
                OrderStatus::Shipped,
                now,
                TransitionStamp::shipped(now),
            )
            .await?;
        if !shipped {
            return Err(ApiError::InvalidOrderStatus(order_id.to_string()));
        }
        tracing::info!(order_id = %order_id, "Order shipped");
        Ok(())
    }

    /// Buyer confirms delivery of a shipped order
    pub async fn confirm_receipt(&self, user_id: &str, order_id: &str) -> ApiResult<()> {
        let Some(order) = self.store.get_order(order_id).await? else {
            return Err(ApiError::InvalidOrderId(order_id.to_string()));
        };
        if order.user_id != user_id {
            return Err(ApiError::AuthorizationFail);
        }
        if order.status != OrderStatus::Shipped {
            return Err(ApiError::InvalidOrderStatus(order_id.to_string()));
        }

        let now = now_millis();
        let delivered = self
            .store
            .transition_order(
                order_id,
                OrderStatus::Shipped,
                OrderStatus::Delivered,
                now,
                TransitionStamp::delivered(now),
            )
            .await?;
        if !delivered {
            return Err(ApiError::InvalidOrderStatus(order_id.to_string()));
        }
        tracing::info!(order_id = %order_id, "Order delivered");
        Ok(())
    }

    /// Buyer cancels a pending order.
    ///
    /// The password is optional: the sweep path cancels without
    /// interactive re-authentication, and self-service cancel carries
    /// no extra auth burden either. Winning the CAS gates the stock
    /// restoration, so racing cancels restore at most once.
    pub async fn cancel_order(
        &self,
        user_id: &str,
        password: Option<&str>,
        order_id: &str,
    ) -> ApiResult<()> {
        self.cancel_expired_orders().await?;

        let Some(order) = self.store.get_order(order_id).await? else {
            return Err(ApiError::InvalidOrderId(order_id.to_string()));
        };
        if order.user_id != user_id {
            return Err(ApiError::AuthorizationFail);
        }
        if order.status != OrderStatus::Pending {
            return Err(ApiError::InvalidOrderStatus(order_id.to_string()));
        }
        if let Some(password) = password {
            match self.store.get_user(user_id, false).await? {
                Some(user) if user.password == password => {}
                _ => return Err(ApiError::AuthorizationFail),
            }
        }

        let now = now_millis();
        let cancelled = self
            .store
            .transition_order(
                order_id,
                OrderStatus::Pending,
                OrderStatus::Cancelled,
                now,
                TransitionStamp::cancelled(now),
            )
            .await?;
        if !cancelled {
            return Err(ApiError::InvalidOrderStatus(order_id.to_string()));
        }

        self.restore_order_stock(&order).await?;
        tracing::info!(order_id = %order_id, "Order cancelled");
        Ok(())
    }

    /// Lazily cancel pending orders past their deadline.
    ///
    /// Invoked as a prefix of payment, cancel and list operations.
    /// Returns the number of orders this caller actually flipped;
    /// redundant concurrent sweeps lose the CAS and count nothing.
    pub async fn cancel_expired_orders(&self) -> ApiResult<i64> {
        let now = now_millis();
        let legacy_cutoff = now - self.timeout_millis();
        let expired = self.store.find_expired_pending(now, legacy_cutoff).await?;

        let mut cancelled = 0;
        for order in expired {
            let won = self
                .store
                .transition_order(
                    &order.order_id,
                    OrderStatus::Pending,
                    OrderStatus::CancelledTimeout,
                    now,
                    TransitionStamp::cancelled(now),
                )
                .await?;
            if !won {
                continue;
            }
            self.restore_order_stock(&order).await?;
            cancelled += 1;
        }
        if cancelled > 0 {
            tracing::info!(cancelled, "Expired pending orders cancelled");
        }
        Ok(cancelled)
    }

    /// Paginated order listing for a buyer, `updated_at` descending
    pub async fn list_orders(
        &self,
        user_id: &str,
        status: Option<&str>,
        page: i64,
        page_size: i64,
    ) -> ApiResult<OrderPage> {
        self.cancel_expired_orders().await?;

        if self.store.get_user(user_id, false).await?.is_none() {
            return Err(ApiError::NonExistUserId(user_id.to_string()));
        }

        let page = page.max(1);
        let page_size = if page_size == 0 {
            20
        } else {
            page_size.clamp(1, 50)
        };

        // An unknown status filter matches nothing, same as filtering
        // on the raw string would.
        let filter = match status.filter(|s| !s.is_empty()) {
            None => None,
            Some(s) => match OrderStatus::parse(s) {
                Some(status) => Some(status),
                None => {
                    return Ok(OrderPage {
                        page,
                        page_size,
                        total: 0,
                        orders: Vec::new(),
                    });
                }
            },
        };

        let (total, orders) = self
            .store
            .list_orders(user_id, filter, page, page_size)
            .await?;

        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.store.get_order_items(&order.order_id).await?;
            details.push(OrderDetail {
                order,
                items: items.into_iter().map(Into::into).collect(),
            });
        }

        Ok(OrderPage {
            page,
            page_size,
            total,
            orders: details,
        })
    }

    /// Hand an order's reserved stock back to its store
    async fn restore_order_stock(&self, order: &Order) -> ApiResult<()> {
        let items = self.store.get_order_items(&order.order_id).await?;
        if items.is_empty() {
            return Ok(());
        }
        let tuples: Vec<(String, i64)> = items
            .into_iter()
            .map(|item| (item.book_id, item.count))
            .collect();
        let restored = self
            .store
            .adjust_stock(&order.store_id, &tuples, StockDirection::Increase)
            .await?;
        if !restored {
            // A delisted book cannot absorb the restoration; the order
            // is already cancelled, so record the loss and move on.
            tracing::warn!(
                order_id = %order.order_id,
                store_id = %order.store_id,
                "Stock restoration skipped missing inventory rows"
            );
        }
        Ok(())
    }
}
