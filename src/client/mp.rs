//! Mini-program API client
//!
//! Calls the public `/api/mp` endpoints. Each call maps non-success statuses
//! to [`ClientError::Api`](super::ClientError) carrying the server's `error`
//! text or a per-call default message.

use reqwest::StatusCode;

use super::error::ClientResult;
use super::http::{api_base, build_http, read_json};
use crate::config::ClientConfig;
use crate::models::{Article, ArticleSummary, Column, LoginCode, Paged, Registration, User};

/// Page size the reader feed asks for
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Client for the mini-program endpoints
#[derive(Debug, Clone)]
pub struct MpClient {
    http: reqwest::Client,
    base: String,
}

impl MpClient {
    /// `base_url` is the server root, e.g. `http://localhost:8080`
    pub fn new(base_url: &str, timeout_ms: u64) -> ClientResult<Self> {
        Ok(Self {
            http: build_http(timeout_ms)?,
            base: api_base(base_url, "/api/mp"),
        })
    }

    pub fn from_config(config: &ClientConfig) -> ClientResult<Self> {
        Self::new(&config.base_url, config.request_timeout_ms)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// POST /login; only 200 counts as success
    pub async fn login(&self, code: &str) -> ClientResult<User> {
        let response = self
            .http
            .post(format!("{}/login", self.base))
            .json(&LoginCode {
                code: code.to_string(),
            })
            .send()
            .await?;
        read_json(response, &[StatusCode::OK], "login failed").await
    }

    /// POST /register; 200 (bound) and 201 (created) both succeed
    pub async fn register(&self, phone: &str, openid: &str, name: &str) -> ClientResult<User> {
        let body = Registration {
            phone: phone.to_string(),
            openid: openid.to_string(),
            name: name.to_string(),
        };
        let response = self
            .http
            .post(format!("{}/register", self.base))
            .json(&body)
            .send()
            .await?;
        read_json(
            response,
            &[StatusCode::OK, StatusCode::CREATED],
            "registration failed",
        )
        .await
    }

    /// GET /columns/
    pub async fn columns(&self) -> ClientResult<Vec<Column>> {
        let response = self.http.get(format!("{}/columns/", self.base)).send().await?;
        read_json(response, &[StatusCode::OK], "failed to load columns").await
    }

    /// GET /articles/column/:column_id
    pub async fn column_articles(
        &self,
        column_id: i64,
        page: u32,
        page_size: u32,
    ) -> ClientResult<Paged<ArticleSummary>> {
        let response = self
            .http
            .get(format!("{}/articles/column/{}", self.base, column_id))
            .query(&[("page", page), ("page_size", page_size)])
            .send()
            .await?;
        read_json(response, &[StatusCode::OK], "failed to load articles").await
    }

    /// GET /articles/:id (the server counts a view)
    pub async fn article(&self, id: i64) -> ClientResult<Article> {
        let response = self
            .http
            .get(format!("{}/articles/{}", self.base, id))
            .send()
            .await?;
        read_json(response, &[StatusCode::OK], "failed to load article").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{spawn_api, spawn_router};
    use crate::client::ClientError;
    use axum::{routing::get, Json, Router};
    use serde_json::json;

    #[tokio::test]
    async fn test_login_returns_body_unchanged() {
        let server = spawn_api().await;
        let client = MpClient::new(&server.base_url, 5_000).unwrap();

        let user = client.login("xyz").await.unwrap();
        assert_eq!(user.openid, "openid-xyz");
        assert!(!user.has_phone());

        let again = client.login("xyz").await.unwrap();
        assert_eq!(again.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failure_uses_server_message() {
        let server = spawn_api().await;
        let client = MpClient::new(&server.base_url, 5_000).unwrap();

        match client.login("bad").await {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 502);
                assert!(message.contains("invalid code"));
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_without_error_field_uses_default() {
        let server = spawn_api().await;
        let client = MpClient::new(&format!("{}/missing", server.base_url), 5_000).unwrap();

        match client.login("abc").await {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "login failed");
            }
            other => panic!("expected api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_accepts_created_and_ok() {
        let server = spawn_api().await;
        let client = MpClient::new(&server.base_url, 5_000).unwrap();

        let created = client.register("13800000000", "fresh-openid", "A").await.unwrap();
        assert_eq!(created.phone.as_deref(), Some("13800000000"));

        let bound = client.register("13900000000", "fresh-openid", "B").await.unwrap();
        assert_eq!(bound.id, created.id);
        assert_eq!(bound.name.as_deref(), Some("B"));

        let err = client.register("", "fresh-openid", "B").await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.to_string(), "phone is required");
    }

    #[tokio::test]
    async fn test_missing_article_is_not_found() {
        let server = spawn_api().await;
        let client = MpClient::new(&server.base_url, 5_000).unwrap();

        assert!(client.columns().await.unwrap().is_empty());
        let err = client.article(12345).await.unwrap_err();
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn test_listings_reject_other_success_codes() {
        let page = json!({"list": [], "total": 0, "page": 1, "page_size": 10});
        let router = Router::new()
            .route(
                "/api/mp/articles/column/:id",
                get(move || {
                    let page = page.clone();
                    async move { (axum::http::StatusCode::ACCEPTED, Json(page)) }
                }),
            )
            .route(
                "/api/mp/columns/",
                get(|| async { (axum::http::StatusCode::ACCEPTED, Json(json!([]))) }),
            );
        let base_url = spawn_router(router).await;
        let client = MpClient::new(&base_url, 5_000).unwrap();

        let err = client.column_articles(1, 1, DEFAULT_PAGE_SIZE).await.unwrap_err();
        assert_eq!(err.status(), Some(202));
        assert_eq!(err.to_string(), "failed to load articles");

        let err = client.columns().await.unwrap_err();
        assert_eq!(err.status(), Some(202));
    }
}
