//! Admin authentication middleware

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use super::error::ApiError;
use super::state::AppState;
use crate::auth::bearer_token;

/// Require `Authorization: Bearer <jwt>`; on success the decoded
/// [`Claims`](crate::auth::Claims) are available as a request extension.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .map(|v| v.to_str().map_err(|_| ApiError::Unauthorized("invalid authorization header".to_string())))
        .transpose()?;

    let token = bearer_token(header)?;
    let claims = state.jwt.verify(token)?;

    tracing::debug!(user_id = claims.user_id, "Authenticated admin request");
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}
