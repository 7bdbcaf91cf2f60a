//! Admin Auth Routes
//!
//! - POST /api/admin/auth/login - Username/password login, returns a bearer token
//! - PUT /api/admin/auth/change-password - Change the caller's password

use axum::{extract::State, Extension, Json};
use std::sync::Arc;

use crate::api::dto::{ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::ApiJson;
use crate::api::state::AppState;
use crate::auth::{hash_password, verify_password, AuthError, Claims};
use crate::models::STATUS_ENABLED;

/// Shortest password accepted by change-password
pub const MIN_PASSWORD_LEN: usize = 6;

/// POST /api/admin/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let user = state
        .db
        .find_backend_user_by_username(req.username.trim())?
        .ok_or(AuthError::InvalidCredentials)?;

    if user.status != STATUS_ENABLED {
        tracing::info!(backend_user_id = user.id, "Login refused for disabled account");
        return Err(AuthError::AccountDisabled.into());
    }
    if !verify_password(&req.password, &user.password_hash) {
        tracing::info!(backend_user_id = user.id, "Login refused, wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let token = state.jwt.issue(&user)?;
    tracing::info!(backend_user_id = user.id, "Backend user logged in");
    Ok(Json(LoginResponse { token, user }))
}

/// PUT /api/admin/auth/change-password
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<ChangePasswordRequest>,
) -> ApiResult<Json<MessageResponse>> {
    if req.new_password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "new password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let user = state.db.get_backend_user(claims.user_id)?;
    if !verify_password(&req.old_password, &user.password_hash) {
        return Err(ApiError::Validation("old password is incorrect".to_string()));
    }

    state
        .db
        .set_backend_user_password(user.id, &hash_password(&req.new_password))?;
    tracing::info!(backend_user_id = user.id, "Password changed");
    Ok(Json(MessageResponse::new("password changed")))
}
