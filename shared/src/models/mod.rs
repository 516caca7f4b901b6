//! Domain models
//!
//! Four entity collections: users, stores, inventory, orders (+items).
//! All timestamps are UTC Unix milliseconds.

mod inventory;
mod order;
mod store;
mod user;

pub use inventory::{BookListing, Inventory, SearchPage};
pub use order::{Order, OrderDetail, OrderItem, OrderItemView, OrderPage, OrderStatus};
pub use store::Bookstore;
pub use user::{User, UserStatus};
