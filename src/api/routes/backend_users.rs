//! Backend User Routes (admin)
//!
//! - GET /api/admin/backend-users/ - Paginated list with role names
//! - POST /api/admin/backend-users/ - Create an account with a generated password
//! - GET/PUT/DELETE /api/admin/backend-users/:id
//! - PUT /api/admin/backend-users/:id/status - Enable or disable
//! - PUT /api/admin/backend-users/:id/reset-password - Generate a new password
//! - GET /api/admin/backend-users/current/menus - Caller's menu tree

use axum::{extract::State, http::StatusCode, Extension, Json};
use std::sync::Arc;

use crate::api::dto::{CreatedBackendUser, PageParams, PasswordReset};
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::routes::ADMIN_PAGE_SIZE;
use crate::api::state::AppState;
use crate::auth::{generate_password, hash_password, Claims};
use crate::models::{BackendUser, BackendUserInput, Menu, Paged, StatusInput};

pub async fn list_backend_users(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Paged<BackendUser>>> {
    Ok(Json(
        state.db.list_backend_users(params.page_request(ADMIN_PAGE_SIZE))?,
    ))
}

/// The plain password appears only in this response
pub async fn create_backend_user(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<BackendUserInput>,
) -> ApiResult<(StatusCode, Json<CreatedBackendUser>)> {
    if !req.email.contains('@') {
        return Err(ApiError::Validation("email is invalid".to_string()));
    }

    let password = generate_password();
    let user = state.db.create_backend_user(&req, &hash_password(&password))?;
    Ok((StatusCode::CREATED, Json(CreatedBackendUser { user, password })))
}

pub async fn get_backend_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<BackendUser>> {
    Ok(Json(state.db.get_backend_user(id)?))
}

pub async fn update_backend_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<BackendUserInput>,
) -> ApiResult<Json<BackendUser>> {
    if !req.email.contains('@') {
        return Err(ApiError::Validation("email is invalid".to_string()));
    }
    Ok(Json(state.db.update_backend_user(id, &req)?))
}

pub async fn delete_backend_user(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    if id == claims.user_id {
        return Err(ApiError::Validation(
            "cannot delete the signed-in account".to_string(),
        ));
    }
    state.db.delete_backend_user(id)?;
    tracing::info!(backend_user_id = id, by = claims.user_id, "Deleted backend user");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_backend_user_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<StatusInput>,
) -> ApiResult<Json<BackendUser>> {
    state.db.set_backend_user_status(id, req.status)?;
    Ok(Json(state.db.get_backend_user(id)?))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<PasswordReset>> {
    let password = generate_password();
    state.db.set_backend_user_password(id, &hash_password(&password))?;
    tracing::info!(backend_user_id = id, by = claims.user_id, "Reset backend user password");
    Ok(Json(PasswordReset { id, password }))
}

pub async fn current_user_menus(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Menu>>> {
    Ok(Json(state.db.backend_user_menus(claims.user_id)?))
}
