//! Menu Routes (admin)
//!
//! - GET /api/admin/menus/ - Flat list, all statuses
//! - GET /api/admin/menus/tree - Enabled menus as a tree
//! - POST /api/admin/menus/ - Create a menu
//! - GET/PUT/DELETE /api/admin/menus/:id
//! - PUT /api/admin/menus/:id/status - Enable or disable

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::state::AppState;
use crate::models::{Menu, MenuInput, StatusInput};

pub async fn list_menus(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Menu>>> {
    Ok(Json(state.db.list_menus()?))
}

pub async fn menu_tree(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Menu>>> {
    Ok(Json(state.db.menu_tree()?))
}

pub async fn create_menu(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<MenuInput>,
) -> ApiResult<(StatusCode, Json<Menu>)> {
    let menu = state.db.create_menu(&req)?;
    tracing::info!(menu_id = menu.id, name = %menu.name, "Created menu");
    Ok((StatusCode::CREATED, Json(menu)))
}

pub async fn get_menu(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Menu>> {
    Ok(Json(state.db.get_menu(id)?))
}

pub async fn update_menu(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<MenuInput>,
) -> ApiResult<Json<Menu>> {
    Ok(Json(state.db.update_menu(id, &req)?))
}

pub async fn delete_menu(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db.delete_menu(id)?;
    tracing::info!(menu_id = id, "Deleted menu");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_menu_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<StatusInput>,
) -> ApiResult<Json<Menu>> {
    state.db.set_menu_status(id, req.status)?;
    Ok(Json(state.db.get_menu(id)?))
}
