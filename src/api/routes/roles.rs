//! Role Routes (admin)
//!
//! - GET /api/admin/roles/ - Paginated list
//! - POST /api/admin/roles/ - Create a role
//! - GET/PUT/DELETE /api/admin/roles/:id
//! - PUT /api/admin/roles/:id/status - Enable or disable
//! - GET/PUT /api/admin/roles/:id/menus - Read or replace menu grants

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{MenuIdsResponse, PageParams};
use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::routes::ADMIN_PAGE_SIZE;
use crate::api::state::AppState;
use crate::models::{Paged, Role, RoleInput, RoleMenus, StatusInput};

pub async fn list_roles(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Paged<Role>>> {
    Ok(Json(state.db.list_roles(params.page_request(ADMIN_PAGE_SIZE))?))
}

pub async fn create_role(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RoleInput>,
) -> ApiResult<(StatusCode, Json<Role>)> {
    Ok((StatusCode::CREATED, Json(state.db.create_role(&req)?)))
}

pub async fn get_role(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Role>> {
    Ok(Json(state.db.get_role(id)?))
}

pub async fn update_role(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<RoleInput>,
) -> ApiResult<Json<Role>> {
    Ok(Json(state.db.update_role(id, &req)?))
}

pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db.delete_role(id)?;
    tracing::info!(role_id = id, "Deleted role");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_role_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<StatusInput>,
) -> ApiResult<Json<Role>> {
    state.db.set_role_status(id, req.status)?;
    Ok(Json(state.db.get_role(id)?))
}

pub async fn get_role_menus(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<MenuIdsResponse>> {
    Ok(Json(MenuIdsResponse {
        menu_ids: state.db.role_menu_ids(id)?,
    }))
}

pub async fn update_role_menus(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<RoleMenus>,
) -> ApiResult<Json<MenuIdsResponse>> {
    state.db.set_role_menus(id, &req.menu_ids)?;
    Ok(Json(MenuIdsResponse {
        menu_ids: state.db.role_menu_ids(id)?,
    }))
}
