//! User Model

use serde::{Deserialize, Serialize};

/// Account lifecycle status
///
/// Unregister flips the status to `deleted` and clears the credentials;
/// user rows are never hard-deleted while orders reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "snake_case"))]
pub enum UserStatus {
    Active,
    Deleted,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Deleted => "deleted",
        }
    }
}

/// User entity
///
/// `balance` is kept in the smallest currency unit and is only mutated
/// through the guarded balance operations (never read-modify-write
/// across round trips).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct User {
    pub user_id: String,
    pub password: String,
    pub balance: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal: Option<String>,
    pub status: UserStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl User {
    /// Fresh active user with zero balance
    pub fn new(
        user_id: impl Into<String>,
        password: impl Into<String>,
        token: impl Into<String>,
        terminal: impl Into<String>,
    ) -> Self {
        let now = crate::util::now_millis();
        Self {
            user_id: user_id.into(),
            password: password.into(),
            balance: 0,
            token: Some(token.into()),
            terminal: Some(terminal.into()),
            status: UserStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}
