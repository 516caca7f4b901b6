//! Auth API Handlers

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::core::ServerState;
use shared::error::ApiResult;
use shared::response::ApiResponse;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub user_id: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub user_id: String,
    pub password: String,
    pub terminal: String,
}

#[derive(Serialize)]
pub struct LoginData {
    pub token: String,
}

#[derive(Deserialize)]
pub struct LogoutRequest {
    pub user_id: String,
    pub token: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub user_id: String,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct UnregisterRequest {
    pub user_id: String,
    pub password: String,
}

/// POST /auth/register - 注册用户
pub async fn register(
    State(state): State<ServerState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.users.register(&req.user_id, &req.password).await?;
    Ok(Json(ApiResponse::ok_empty()))
}

/// POST /auth/login - 登录并签发终端令牌
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<ApiResponse<LoginData>>> {
    let token = state
        .users
        .login(&req.user_id, &req.password, &req.terminal)
        .await?;
    Ok(Json(ApiResponse::ok(LoginData { token })))
}

/// POST /auth/logout - 登出并作废令牌
pub async fn logout(
    State(state): State<ServerState>,
    Json(req): Json<LogoutRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.users.logout(&req.user_id, &req.token).await?;
    Ok(Json(ApiResponse::ok_empty()))
}

/// POST /auth/password - 修改密码
pub async fn change_password(
    State(state): State<ServerState>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state
        .users
        .change_password(&req.user_id, &req.old_password, &req.new_password)
        .await?;
    Ok(Json(ApiResponse::ok_empty()))
}

/// POST /auth/unregister - 注销账户（软删除）
pub async fn unregister(
    State(state): State<ServerState>,
    Json(req): Json<UnregisterRequest>,
) -> ApiResult<Json<ApiResponse<()>>> {
    state.users.unregister(&req.user_id, &req.password).await?;
    Ok(Json(ApiResponse::ok_empty()))
}
