//! Unified error system
//!
//! Every public operation returns a stable `(code, message)` pair. The
//! codes are part of the wire contract and double as HTTP status codes:
//!
//! - 401: authorization fail
//! - 511–520: business/validation errors
//! - 528: datastore error
//! - 530: internal error
//!
//! Validation errors are returned, not thrown; unexpected errors are
//! caught at the service boundary and mapped to [`ApiError::Database`]
//! or [`ApiError::Internal`] with the underlying message preserved.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Application-level error type
///
/// The `Display` text is the user-visible message; it may include the
/// offending identifier for debuggability but never internal stack
/// traces.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    // ========== Authorization ==========
    #[error("authorization fail.")]
    AuthorizationFail,

    // ========== Accounts ==========
    #[error("non exist user id {0}")]
    NonExistUserId(String),

    #[error("exist user id {0}")]
    ExistUserId(String),

    // ========== Stores ==========
    #[error("non exist store id {0}")]
    NonExistStoreId(String),

    #[error("exist store id {0}")]
    ExistStoreId(String),

    // ========== Books / Inventory ==========
    #[error("non exist book id {0}")]
    NonExistBookId(String),

    #[error("exist book id {0}")]
    ExistBookId(String),

    #[error("stock level low, book id {0}")]
    StockLevelLow(String),

    // ========== Orders ==========
    #[error("invalid order id {0}")]
    InvalidOrderId(String),

    #[error("not sufficient funds, order id {0}")]
    NotSufficientFunds(String),

    #[error("invalid order status, order id {0}")]
    InvalidOrderStatus(String),

    // ========== Infrastructure ==========
    #[error("{0}")]
    Database(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Wire code for this error (also used as the HTTP status)
    pub fn code(&self) -> u16 {
        match self {
            ApiError::AuthorizationFail => 401,
            ApiError::NonExistUserId(_) => 511,
            ApiError::ExistUserId(_) => 512,
            ApiError::NonExistStoreId(_) => 513,
            ApiError::ExistStoreId(_) => 514,
            ApiError::NonExistBookId(_) => 515,
            ApiError::ExistBookId(_) => 516,
            ApiError::StockLevelLow(_) => 517,
            ApiError::InvalidOrderId(_) => 518,
            ApiError::NotSufficientFunds(_) => 519,
            ApiError::InvalidOrderStatus(_) => 520,
            ApiError::Database(_) => 528,
            ApiError::Internal(_) => 530,
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }

    /// Create a Database error
    pub fn database(message: impl Into<String>) -> Self {
        ApiError::Database(message.into())
    }
}

/// Result type for service-level operations
pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code();
        if code >= 528 {
            tracing::error!(target: "api", code = code, error = %self, "Request failed");
        }
        // Codes are chosen from the valid HTTP range; fall back defensively.
        let status =
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(ApiResponse::<()>::error(code, self.to_string()));
        (status, body).into_response()
    }
}
