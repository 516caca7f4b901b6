//! 用户服务 - 账户生命周期
//!
//! Registration, login, logout, password changes and soft deletion.
//! Credential checks fail closed: a missing or deleted user and a
//! wrong password are indistinguishable to the caller.

use std::sync::Arc;

use shared::error::{ApiError, ApiResult};
use shared::models::{User, UserStatus};
use shared::util;

use crate::auth::jwt;
use crate::db::{Datastore, DbError};

/// Account service
pub struct UserService {
    store: Arc<dyn Datastore>,
    /// Terminal token freshness window (seconds)
    token_lifetime_secs: i64,
}

impl UserService {
    pub fn new(store: Arc<dyn Datastore>, token_lifetime_secs: i64) -> Self {
        Self {
            store,
            token_lifetime_secs,
        }
    }

    /// Register a new account, or revive a soft-deleted one.
    ///
    /// A previously unregistered id comes back with a fresh password,
    /// zero balance and a new terminal token.
    pub async fn register(&self, user_id: &str, password: &str) -> ApiResult<()> {
        let terminal = util::terminal_id();
        let token = jwt::encode_token(user_id, &terminal)
            .map_err(|e| ApiError::internal(e.to_string()))?;

        match self.store.get_user(user_id, true).await? {
            Some(user) if user.status == UserStatus::Active => {
                Err(ApiError::ExistUserId(user_id.to_string()))
            }
            Some(_) => {
                self.store
                    .revive_user(user_id, password, &token, &terminal)
                    .await?;
                Ok(())
            }
            None => {
                let user = User::new(user_id, password, token, terminal);
                match self.store.insert_user(&user).await {
                    Ok(()) => Ok(()),
                    // Lost a concurrent registration race.
                    Err(DbError::Duplicate(_)) => Err(ApiError::ExistUserId(user_id.to_string())),
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Password check against the active user row; fails closed
    pub async fn check_password(&self, user_id: &str, password: &str) -> ApiResult<()> {
        match self.store.get_user(user_id, false).await? {
            Some(user) if user.password == password => Ok(()),
            _ => Err(ApiError::AuthorizationFail),
        }
    }

    /// Token check: stored-token equality, signature, freshness window
    pub async fn check_token(&self, user_id: &str, token: &str) -> ApiResult<()> {
        let Some(user) = self.store.get_user(user_id, false).await? else {
            return Err(ApiError::AuthorizationFail);
        };
        if user.token.as_deref() != Some(token) {
            return Err(ApiError::AuthorizationFail);
        }
        let claims = jwt::decode_token(token, user_id).map_err(|e| {
            tracing::debug!(user_id = %user_id, error = %e, "Token decode failed");
            ApiError::AuthorizationFail
        })?;
        if !jwt::is_fresh(&claims, self.token_lifetime_secs) {
            return Err(ApiError::AuthorizationFail);
        }
        Ok(())
    }

    /// Login: validate the password, then issue and persist a new token
    pub async fn login(&self, user_id: &str, password: &str, terminal: &str) -> ApiResult<String> {
        self.check_password(user_id, password).await?;
        let token = jwt::encode_token(user_id, terminal)
            .map_err(|e| ApiError::internal(e.to_string()))?;
        let updated = self.store.update_token(user_id, &token, terminal).await?;
        if !updated {
            return Err(ApiError::AuthorizationFail);
        }
        Ok(token)
    }

    /// Logout: validate the current token, then rotate it away
    pub async fn logout(&self, user_id: &str, token: &str) -> ApiResult<()> {
        self.check_token(user_id, token).await?;
        let terminal = util::terminal_id();
        let dummy_token = jwt::encode_token(user_id, &terminal)
            .map_err(|e| ApiError::internal(e.to_string()))?;
        let updated = self
            .store
            .update_token(user_id, &dummy_token, &terminal)
            .await?;
        if !updated {
            return Err(ApiError::AuthorizationFail);
        }
        Ok(())
    }

    /// Unregister: soft-delete; the row stays while orders reference it
    pub async fn unregister(&self, user_id: &str, password: &str) -> ApiResult<()> {
        self.check_password(user_id, password).await?;
        let deleted = self.store.soft_delete_user(user_id).await?;
        if !deleted {
            return Err(ApiError::AuthorizationFail);
        }
        Ok(())
    }

    /// Change password; invalidates the old token
    pub async fn change_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> ApiResult<()> {
        self.check_password(user_id, old_password).await?;
        let terminal = util::terminal_id();
        let token = jwt::encode_token(user_id, &terminal)
            .map_err(|e| ApiError::internal(e.to_string()))?;
        let updated = self
            .store
            .update_password(user_id, new_password, &token, &terminal)
            .await?;
        if !updated {
            return Err(ApiError::AuthorizationFail);
        }
        Ok(())
    }
}
