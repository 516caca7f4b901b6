//! 业务服务层
//!
//! Business rules live here, written once against the
//! [`Datastore`](crate::db::Datastore) contract:
//!
//! - [`UserService`]: account lifecycle and credential checks
//! - [`SellerService`]: stores and inventory listings
//! - [`OrderService`]: the order lifecycle engine
//! - [`SearchService`]: read-only book search

pub mod order;
pub mod search;
pub mod seller;
pub mod user;

pub use order::OrderService;
pub use search::SearchService;
pub use seller::SellerService;
pub use user::UserService;
