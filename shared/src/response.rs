//! API Response types
//!
//! Standardized response envelope for the HTTP surface.

use serde::{Deserialize, Serialize};

/// Wire code for a successful response
pub const API_CODE_SUCCESS: u16 = 200;

/// Unified API response structure
///
/// All API responses follow this format:
/// ```json
/// {
///     "code": 200,
///     "message": "ok",
///     "data": { ... }
/// }
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Response code (200 = success, others = error codes)
    pub code: u16,
    /// Human-readable message
    pub message: String,
    /// Response data (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response
    pub fn ok(data: T) -> Self {
        Self {
            code: API_CODE_SUCCESS,
            message: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create a successful response without a payload
    pub fn ok_empty() -> Self {
        Self {
            code: API_CODE_SUCCESS,
            message: "ok".to_string(),
            data: None,
        }
    }

    /// Create an error response
    pub fn error(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}
