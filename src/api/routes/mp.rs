//! Mini-program Routes
//!
//! Public endpoints used by the mini-program front end.
//!
//! - POST /api/mp/login - Exchange a `wx.login` code for the user record
//! - POST /api/mp/register - Bind phone and name to an openid
//! - GET /api/mp/columns/ - List columns
//! - GET /api/mp/articles/column/:column_id - Published articles of a column
//! - GET /api/mp/articles/:id - Published article detail

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::PageParams;
use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{ApiJson, ApiPath, ApiQuery};
use crate::api::state::AppState;
use crate::models::{Article, ArticleSummary, Column, LoginCode, Paged, Registration, User};

/// Default page size of the reader feed
pub const MP_PAGE_SIZE: u32 = 10;

/// POST /api/mp/login
///
/// Finds the user for the exchanged openid, creating a bare record on first
/// login. The client checks `phone` to decide whether to show registration.
pub async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginCode>,
) -> ApiResult<Json<User>> {
    let session = state.wechat.exchange(&req.code).await?;
    let user = state.db.login_or_create_user(&session.openid)?;

    tracing::info!(user_id = user.id, registered = user.has_phone(), "Mini-program login");
    Ok(Json(user))
}

/// POST /api/mp/register
///
/// 201 when a new user row was created, 200 when an existing one was bound.
pub async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<Registration>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if req.phone.trim().is_empty() {
        return Err(ApiError::Validation("phone is required".to_string()));
    }
    if req.openid.trim().is_empty() {
        return Err(ApiError::Validation("openid is required".to_string()));
    }

    let (user, created) = state.db.register_user(&req)?;
    tracing::info!(user_id = user.id, created, "Registered mini-program user");

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(user)))
}

/// GET /api/mp/columns/
pub async fn list_columns(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Column>>> {
    Ok(Json(state.db.list_columns()?))
}

/// GET /api/mp/articles/column/:column_id
pub async fn list_column_articles(
    State(state): State<Arc<AppState>>,
    ApiPath(column_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> ApiResult<Json<Paged<ArticleSummary>>> {
    let page = params.page_request(MP_PAGE_SIZE);
    Ok(Json(state.db.list_published_by_column(column_id, page)?))
}

/// GET /api/mp/articles/:id
///
/// Counts a view. Drafts answer 404.
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
) -> ApiResult<Json<Article>> {
    Ok(Json(state.db.get_published_article(id)?))
}
