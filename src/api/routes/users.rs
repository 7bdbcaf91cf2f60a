//! Mini-program User Routes (admin)
//!
//! - GET /api/admin/users/ - List users
//! - GET /api/admin/users/:id - Get a user
//! - PUT /api/admin/users/:id - Update a user
//! - DELETE /api/admin/users/:id - Delete a user

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::state::AppState;
use crate::models::{User, UserUpdate};

pub async fn list_users(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.list_users()?))
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.db.get_user(id)?))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UserUpdate>,
) -> ApiResult<Json<User>> {
    let user = state.db.update_user(id, &req)?;
    tracing::info!(user_id = id, "Updated mini-program user");
    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db.delete_user(id)?;
    tracing::info!(user_id = id, "Deleted mini-program user");
    Ok(StatusCode::NO_CONTENT)
}
