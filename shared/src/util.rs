/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a globally unique order ID.
///
/// Concatenates buyer and store identifiers with a random suffix so an
/// order ID is self-describing in logs while staying collision-free.
pub fn order_id(user_id: &str, store_id: &str) -> String {
    format!("{}_{}_{}", user_id, store_id, uuid::Uuid::new_v4())
}

/// Generate a terminal identifier for a login session
pub fn terminal_id() -> String {
    format!("terminal_{}", now_millis())
}
