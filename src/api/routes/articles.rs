//! Article Routes (admin)
//!
//! - GET /api/admin/articles/ - Paginated list, `?column_id=&status=&page=&page_size=`
//! - POST /api/admin/articles/ - Create an article
//! - GET /api/admin/articles/:id - Get an article (drafts included, no view counting)
//! - PUT /api/admin/articles/:id - Update an article
//! - DELETE /api/admin/articles/:id - Delete an article
//! - PUT /api/admin/articles/:id/status - Publish or withdraw

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::ArticleListParams;
use crate::api::error::ApiResult;
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::routes::ADMIN_PAGE_SIZE;
use crate::api::state::AppState;
use crate::models::{Article, ArticleInput, Paged, StatusInput};

pub async fn list_articles(
    State(state): State<Arc<AppState>>,
    ApiQuery(params): ApiQuery<ArticleListParams>,
) -> ApiResult<Json<Paged<Article>>> {
    let page = params.page_request(ADMIN_PAGE_SIZE);
    Ok(Json(state.db.list_articles(params.filter(), page)?))
}

pub async fn create_article(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ArticleInput>,
) -> ApiResult<(StatusCode, Json<Article>)> {
    let article = state.db.create_article(&req)?;
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Article>> {
    Ok(Json(state.db.get_article(id)?))
}

pub async fn update_article(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<ArticleInput>,
) -> ApiResult<Json<Article>> {
    let article = state.db.update_article(id, &req)?;
    tracing::info!(article_id = id, "Updated article");
    Ok(Json(article))
}

pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<StatusCode> {
    state.db.delete_article(id)?;
    tracing::info!(article_id = id, "Deleted article");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_article_status(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<StatusInput>,
) -> ApiResult<Json<Article>> {
    state.db.set_article_status(id, req.status)?;
    tracing::info!(article_id = id, status = req.status, "Changed article status");
    Ok(Json(state.db.get_article(id)?))
}
