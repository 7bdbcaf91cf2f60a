//! Column Routes (admin)
//!
//! - GET /api/admin/columns/ - List columns
//! - POST /api/admin/columns/ - Create a column
//! - GET /api/admin/columns/:id - Get a column
//! - PUT /api/admin/columns/:id - Update a column
//! - DELETE /api/admin/columns/:id - Delete a column without articles

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, ApiPath};
use crate::api::state::AppState;
use crate::models::{Column, ColumnInput};

fn validate(req: &ColumnInput) -> ApiResult<()> {
    if req.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".to_string()));
    }
    Ok(())
}

pub async fn list_columns(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Column>>> {
    Ok(Json(state.db.list_columns()?))
}

pub async fn create_column(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ColumnInput>,
) -> ApiResult<(StatusCode, Json<Column>)> {
    validate(&req)?;
    let column = state.db.create_column(&req)?;
    tracing::info!(column_id = column.id, name = %column.name, "Created column");
    Ok((StatusCode::CREATED, Json(column)))
}

pub async fn get_column(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Column>> {
    Ok(Json(state.db.get_column(id)?))
}

pub async fn update_column(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ColumnInput>,
) -> ApiResult<Json<Column>> {
    validate(&req)?;
    Ok(Json(state.db.update_column(id, &req)?))
}

pub async fn delete_column(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db.delete_column(id)?;
    tracing::info!(column_id = id, "Deleted column");
    Ok(StatusCode::NO_CONTENT)
}
