//! Shared types for the bookstore backend
//!
//! Common types used across crates: domain models, the unified error
//! type with its wire codes, the API response envelope, and small
//! time/ID utilities.

pub mod error;
pub mod models;
pub mod response;
pub mod util;

// Re-exports
pub use error::{ApiError, ApiResult};
pub use response::ApiResponse;
pub use serde::{Deserialize, Serialize};
