//! JWT 终端令牌
//!
//! Terminal tokens follow the original scheme: HS256 signed with a
//! per-user key, carrying the user id, terminal id and issue time. The
//! freshness window is checked against the claim's `timestamp` rather
//! than an `exp` claim, because the stored token is the source of
//! truth and logout rotates it.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Claims carried in a terminal token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 ID
    pub user_id: String,
    /// 终端标识
    pub terminal: String,
    /// 签发时间 (Unix seconds)
    pub timestamp: i64,
}

/// JWT 错误
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),
}

/// Sign a terminal token for `user_id`
pub fn encode_token(user_id: &str, terminal: &str) -> Result<String, JwtError> {
    let claims = Claims {
        user_id: user_id.to_string(),
        terminal: terminal.to_string(),
        timestamp: chrono::Utc::now().timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(user_id.as_bytes()),
    )
    .map_err(|e| JwtError::GenerationFailed(e.to_string()))
}

/// Verify the signature and decode the claims of a terminal token
pub fn decode_token(token: &str, user_id: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Lifetime is enforced against the claim timestamp, not `exp`.
    validation.required_spec_claims.clear();
    validation.validate_exp = false;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(user_id.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken(e.to_string()),
    })?;

    Ok(token_data.claims)
}

/// Whether a decoded token is still inside the freshness window
pub fn is_fresh(claims: &Claims, lifetime_secs: i64) -> bool {
    let age = chrono::Utc::now().timestamp() - claims.timestamp;
    (0..lifetime_secs).contains(&age)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let token = encode_token("alice", "terminal_1").unwrap();
        let claims = decode_token(&token, "alice").unwrap();
        assert_eq!(claims.user_id, "alice");
        assert_eq!(claims.terminal, "terminal_1");
        assert!(is_fresh(&claims, 3600));
    }

    #[test]
    fn wrong_key_rejected() {
        let token = encode_token("alice", "terminal_1").unwrap();
        assert!(decode_token(&token, "mallory").is_err());
    }

    #[test]
    fn stale_token_rejected() {
        let claims = Claims {
            user_id: "alice".into(),
            terminal: "t".into(),
            timestamp: chrono::Utc::now().timestamp() - 7200,
        };
        assert!(!is_fresh(&claims, 3600));
    }
}
