//! Mountain REST API
//!
//! HTTP API layer for the CMS, built with Axum.
//!
//! # Endpoints
//!
//! ## Mini-program (public)
//! - `POST /api/mp/login` - Exchange a login code for the user
//! - `POST /api/mp/register` - Bind phone and name to an openid
//! - `GET /api/mp/columns/` - List columns
//! - `GET /api/mp/articles/column/:column_id` - Published articles of a column
//! - `GET /api/mp/articles/:id` - Published article detail
//!
//! ## Admin auth
//! - `POST /api/admin/auth/login` - Returns `{token, user}`
//! - `PUT /api/admin/auth/change-password` - Change own password
//!
//! ## Admin resources (Bearer token required)
//! - `/api/admin/users/`, `/api/admin/columns/`, `/api/admin/articles/`
//! - `/api/admin/roles/`, `/api/admin/menus/`, `/api/admin/backend-users/`
//! - `POST /api/admin/upload/image`, `POST /api/admin/upload/video`
//!
//! ## Health
//! - `GET /api/ping` - Connectivity check
//! - `GET /health/live` - Liveness probe
//! - `GET /health/ready` - Readiness probe
//! - `GET /health` - Full health status
//!
//! Uploaded files are served from `/uploads`.
//!
//! # Example
//!
//! ```rust,ignore
//! use mountain::api::{self, ApiConfig, AppState};
//! use mountain::db::Database;
//! use mountain::wechat::WechatClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = mountain::config::Config::load_default();
//!     let db = Arc::new(Database::open(config.database.path.as_ref())?);
//!     let wechat = Arc::new(WechatClient::new(config.wechat.clone())?);
//!
//!     let api_config = ApiConfig::from_config(&config);
//!     let state = AppState::new(db, api::jwt_keys(&config), wechat, api_config.clone());
//!     api::serve(state, &api_config).await?;
//!     Ok(())
//! }
//! ```

pub mod dto;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ApiError, ApiResult};
pub use state::{jwt_keys, ApiConfig, AppState};

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

type SharedState = Arc<AppState>;

/// Register `path` with and without a trailing slash
fn collection(router: Router<SharedState>, path: &str, handler: MethodRouter<SharedState>) -> Router<SharedState> {
    router
        .route(path, handler.clone())
        .route(&format!("{path}/"), handler)
}

fn mp_routes() -> Router<SharedState> {
    let router = Router::new()
        .route("/login", post(routes::mp::login))
        .route("/register", post(routes::mp::register))
        .route("/articles/column/:column_id", get(routes::mp::list_column_articles))
        .route("/articles/:id", get(routes::mp::get_article));
    collection(router, "/columns", get(routes::mp::list_columns))
}

fn admin_routes(state: &SharedState) -> Router<SharedState> {
    use routes::{articles, backend_users, columns, menus, roles, users};

    let mut protected = Router::new()
        .route("/auth/change-password", put(routes::auth::change_password))
        // Mini-program users
        .route("/users/:id", get(users::get_user).put(users::update_user).delete(users::delete_user))
        // Columns
        .route("/columns/:id", get(columns::get_column).put(columns::update_column).delete(columns::delete_column))
        // Articles
        .route("/articles/:id", get(articles::get_article).put(articles::update_article).delete(articles::delete_article))
        .route("/articles/:id/status", put(articles::update_article_status))
        // Roles
        .route("/roles/:id", get(roles::get_role).put(roles::update_role).delete(roles::delete_role))
        .route("/roles/:id/status", put(roles::update_role_status))
        .route("/roles/:id/menus", get(roles::get_role_menus).put(roles::update_role_menus))
        // Menus
        .route("/menus/tree", get(menus::menu_tree))
        .route("/menus/:id", get(menus::get_menu).put(menus::update_menu).delete(menus::delete_menu))
        .route("/menus/:id/status", put(menus::update_menu_status))
        // Backend users
        .route("/backend-users/current/menus", get(backend_users::current_user_menus))
        .route(
            "/backend-users/:id",
            get(backend_users::get_backend_user)
                .put(backend_users::update_backend_user)
                .delete(backend_users::delete_backend_user),
        )
        .route("/backend-users/:id/status", put(backend_users::update_backend_user_status))
        .route("/backend-users/:id/reset-password", put(backend_users::reset_password));

    protected = collection(protected, "/users", get(users::list_users));
    protected = collection(protected, "/columns", get(columns::list_columns).post(columns::create_column));
    protected = collection(protected, "/articles", get(articles::list_articles).post(articles::create_article));
    protected = collection(protected, "/roles", get(roles::list_roles).post(roles::create_role));
    protected = collection(protected, "/menus", get(menus::list_menus).post(menus::create_menu));
    protected = collection(
        protected,
        "/backend-users",
        get(backend_users::list_backend_users).post(backend_users::create_backend_user),
    );

    // Multipart uploads need more than the default 2 MB body limit
    let body_limit = state.config.max_image_bytes.max(state.config.max_video_bytes) + 1024 * 1024;
    let uploads = Router::new()
        .route("/upload/image", post(routes::upload::upload_image))
        .route("/upload/video", post(routes::upload::upload_video))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .merge(protected)
        .merge(uploads)
        .route_layer(from_fn_with_state(Arc::clone(state), middleware::require_admin))
        .route("/auth/login", post(routes::auth::login))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/ready", get(routes::health::readiness))
        .route("/", get(routes::health::full_health));

    let api_routes = Router::new()
        .route("/ping", get(routes::health::ping))
        .nest("/mp", mp_routes())
        .nest("/admin", admin_routes(&shared_state));

    let cors = cors_layer(&shared_state.config.cors_origins);
    let uploads = ServeDir::new(&shared_state.config.upload_dir);

    Router::new()
        .nest("/api", api_routes)
        .nest("/health", health_routes)
        .nest_service("/uploads", uploads)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(shared_state)
}

/// Start the API server
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Mountain API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Mountain API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

#[cfg(test)]
mod tests {
    use super::testing::{test_state, ADMIN_PASSWORD, ADMIN_USERNAME};
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use tower::util::ServiceExt;

    struct TestApp {
        router: Router,
        dir: tempfile::TempDir,
    }

    impl TestApp {
        fn new() -> Self {
            let dir = tempdir().unwrap();
            let router = build_router(test_state(dir.path()));
            Self { router, dir }
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap_or(Value::Null)
            };
            (status, body)
        }

        async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
            self.send(request("GET", uri, token, None)).await
        }

        async fn json(&self, method: &str, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
            self.send(request(method, uri, token, Some(body))).await
        }

        async fn admin_token(&self) -> String {
            let (status, body) = self
                .json(
                    "POST",
                    "/api/admin/auth/login",
                    None,
                    json!({"username": ADMIN_USERNAME, "password": ADMIN_PASSWORD}),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
            body["token"].as_str().unwrap().to_string()
        }
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_health_and_ping() {
        let app = TestApp::new();
        assert_eq!(app.get("/health/live", None).await.0, StatusCode::OK);
        assert_eq!(app.get("/health/ready", None).await.0, StatusCode::OK);

        let (status, body) = app.get("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["database"], "ok");

        let (_, body) = app.get("/api/ping", None).await;
        assert_eq!(body["message"], "pong");
    }

    #[tokio::test]
    async fn test_mp_login_then_register() {
        let app = TestApp::new();

        let (status, user) = app.json("POST", "/api/mp/login", None, json!({"code": "abc"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["openid"], "openid-abc");
        assert!(user["phone"].is_null());

        let (status, registered) = app
            .json(
                "POST",
                "/api/mp/register",
                None,
                json!({"phone": "13800000000", "openid": "openid-abc", "name": "Li"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(registered["id"], user["id"]);
        assert_eq!(registered["phone"], "13800000000");

        let (status, _) = app
            .json(
                "POST",
                "/api/mp/register",
                None,
                json!({"phone": "13900000000", "openid": "never-logged-in", "name": ""}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_mp_errors_use_error_field() {
        let app = TestApp::new();

        let (status, body) = app.json("POST", "/api/mp/login", None, json!({"code": "bad"})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("40029"));

        let response = app
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/mp/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let (status, body) = app.get("/api/mp/articles/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, body) = app.get("/api/mp/articles/999", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "article not found");
    }

    #[tokio::test]
    async fn test_admin_requires_token() {
        let app = TestApp::new();

        let (status, body) = app.get("/api/admin/columns/", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());

        let (status, _) = app.get("/api/admin/columns/", Some("not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .json(
                "POST",
                "/api/admin/auth/login",
                None,
                json!({"username": ADMIN_USERNAME, "password": "wrong"}),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "invalid username or password");
    }

    #[tokio::test]
    async fn test_publish_flow_reaches_reader() {
        let app = TestApp::new();
        let token = app.admin_token().await;
        let token = Some(token.as_str());

        let (status, column) = app
            .json("POST", "/api/admin/columns/", token, json!({"name": "News", "sort_order": 1}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let column_id = column["id"].as_i64().unwrap();

        let (status, article) = app
            .json(
                "POST",
                "/api/admin/articles",
                token,
                json!({
                    "column_id": column_id,
                    "title": "Hello",
                    "content": "<p>hi</p><img src=\"/uploads/images/x.png\">"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let article_id = article["id"].as_i64().unwrap();

        // Drafts stay hidden from readers
        let (_, feed) = app.get(&format!("/api/mp/articles/column/{column_id}"), None).await;
        assert_eq!(feed["total"], 0);
        assert_eq!(feed["page_size"], 10);

        let (status, _) = app
            .json("PUT", &format!("/api/admin/articles/{article_id}/status"), token, json!({"status": 1}))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, feed) = app.get(&format!("/api/mp/articles/column/{column_id}?page=1&page_size=5"), None).await;
        assert_eq!(feed["total"], 1);
        assert_eq!(feed["list"][0]["title"], "Hello");

        let (status, detail) = app.get(&format!("/api/mp/articles/{article_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["view_count"], 1);
        assert_eq!(detail["column_name"], "News");
        assert_eq!(detail["images"][0], "/uploads/images/x.png");

        let (_, listing) = app.get("/api/admin/articles/?status=1&column_id=", token).await;
        assert_eq!(listing["total"], 1);
        assert_eq!(listing["page_size"], 20);

        let (status, body) = app
            .send(request("DELETE", &format!("/api/admin/columns/{column_id}"), token, None))
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_backend_user_lifecycle() {
        let app = TestApp::new();
        let token = app.admin_token().await;
        let token = Some(token.as_str());

        let (_, roles) = app.get("/api/admin/roles/", token).await;
        let editor_id = roles["list"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["name"] == "editor")
            .unwrap()["id"]
            .as_i64()
            .unwrap();

        let (status, created) = app
            .json(
                "POST",
                "/api/admin/backend-users/",
                token,
                json!({"username": "ed", "email": "ed@example.com", "role_id": editor_id}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["user"].get("password_hash").is_none());
        let password = created["password"].as_str().unwrap().to_string();
        assert_eq!(password.len(), 8);

        let (status, login) = app
            .json("POST", "/api/admin/auth/login", None, json!({"username": "ed", "password": password}))
            .await;
        assert_eq!(status, StatusCode::OK);
        let ed_token = login["token"].as_str().unwrap().to_string();
        assert_eq!(login["user"]["role_name"], "editor");

        // Editor has no grants yet
        let (_, menus) = app.get("/api/admin/backend-users/current/menus", Some(&ed_token)).await;
        assert_eq!(menus, json!([]));

        let (status, _) = app
            .json(
                "PUT",
                "/api/admin/auth/change-password",
                Some(&ed_token),
                json!({"old_password": password, "new_password": "longer-secret"}),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let ed_id = created["user"]["id"].as_i64().unwrap();
        let (status, _) = app
            .json("PUT", &format!("/api/admin/backend-users/{ed_id}/status"), token, json!({"status": 0}))
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .json("POST", "/api/admin/auth/login", None, json!({"username": "ed", "password": "longer-secret"}))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "account is disabled");
    }

    #[tokio::test]
    async fn test_role_menus_and_tree() {
        let app = TestApp::new();
        let token = app.admin_token().await;
        let token = Some(token.as_str());

        let (_, menus) = app.get("/api/admin/menus", token).await;
        let first = menus[0]["id"].as_i64().unwrap();

        let (status, child) = app
            .json("POST", "/api/admin/menus/", token, json!({"parent_id": first, "name": "drafts", "title": "Drafts"}))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(child["type"], 1);

        let (_, tree) = app.get("/api/admin/menus/tree", token).await;
        assert_eq!(tree[0]["children"][0]["name"], "drafts");

        let (status, body) = app
            .json("PUT", "/api/admin/roles/2/menus", token, json!({"menu_ids": [first]}))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["menu_ids"], json!([first]));

        let (status, _) = app
            .json("PUT", &format!("/api/admin/menus/{first}/status"), token, json!({"status": 3}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    fn multipart_body(boundary: &str, filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n").as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
        body
    }

    fn upload_request(uri: &str, token: &str, filename: &str, content: &[u8]) -> Request<Body> {
        let boundary = "mountain-test-boundary";
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(multipart_body(boundary, filename, content)))
            .unwrap()
    }

    #[tokio::test]
    async fn test_upload_image_is_served() {
        let app = TestApp::new();
        let token = app.admin_token().await;

        let (status, body) = app
            .send(upload_request("/api/admin/upload/image", &token, "photo.PNG", b"fake-png"))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["size"], 8);
        let url = body["url"].as_str().unwrap().to_string();
        assert!(url.starts_with("/uploads/images/image_"));
        assert!(url.ends_with(".png"));

        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri(&url).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"fake-png");
    }

    #[tokio::test]
    async fn test_upload_rejects_wrong_type() {
        let app = TestApp::new();
        let token = app.admin_token().await;

        let (status, body) = app
            .send(upload_request("/api/admin/upload/video", &token, "clip.png", b"x"))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("video"));
    }

    #[tokio::test]
    async fn test_oversize_image_is_rejected_and_removed() {
        let app = TestApp::new();
        let token = app.admin_token().await;

        let content = vec![0u8; 5 * 1024 * 1024 + 1];
        let (status, body) = app
            .send(upload_request("/api/admin/upload/image", &token, "big.jpg", &content))
            .await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"], "image must not exceed 5 MB");

        let images = app.dir.path().join("images");
        let left = std::fs::read_dir(&images).map(|d| d.count()).unwrap_or(0);
        assert_eq!(left, 0);
    }
}
