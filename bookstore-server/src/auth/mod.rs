//! 认证模块 - JWT 终端令牌

pub mod jwt;

pub use jwt::{Claims, JwtError, decode_token, encode_token, is_fresh};
