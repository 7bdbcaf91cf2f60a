//! Admin API client
//!
//! Wraps the `/api/admin` endpoints. The bearer token comes from the
//! [`Session`] at call time; a 401 answer clears the session so the route
//! guard sends the user back to the login view.

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use super::editor::{PastedFile, UploadHandler};
use super::error::ClientResult;
use super::http::{api_base, build_http, ensure_status, read_json, ANY_SUCCESS};
use super::session::Session;
use crate::api::dto::{
    ChangePasswordRequest, CreatedBackendUser, LoginRequest, LoginResponse, MenuIdsResponse,
    MessageResponse, PasswordReset, UploadResponse,
};
use crate::config::ClientConfig;
use crate::models::{
    Article, ArticleFilter, ArticleInput, BackendUser, BackendUserInput, Column, ColumnInput, Menu,
    MenuInput, Paged, Role, RoleInput, RoleMenus, StatusInput, User, UserUpdate,
};

/// Session type held by the admin console
pub type AdminSession = Session<BackendUser>;

/// Client for the admin endpoints
#[derive(Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base: String,
    session: Arc<AdminSession>,
}

impl AdminClient {
    pub fn new(base_url: &str, timeout_ms: u64, session: Arc<AdminSession>) -> ClientResult<Self> {
        Ok(Self {
            http: build_http(timeout_ms)?,
            base: api_base(base_url, "/api/admin"),
            session,
        })
    }

    pub fn from_config(config: &ClientConfig, session: Arc<AdminSession>) -> ClientResult<Self> {
        Self::new(&config.base_url, config.request_timeout_ms, session)
    }

    pub fn session(&self) -> &Arc<AdminSession> {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        default_message: &str,
    ) -> ClientResult<T> {
        let response = self.authorized(request).send().await?;
        let result = read_json(response, ANY_SUCCESS, default_message).await;
        self.on_result(result)
    }

    async fn call_empty(&self, request: RequestBuilder, default_message: &str) -> ClientResult<()> {
        let response = self.authorized(request).send().await?;
        let result = ensure_status(response, ANY_SUCCESS, default_message)
            .await
            .map(|_| ());
        self.on_result(result)
    }

    fn on_result<T>(&self, result: ClientResult<T>) -> ClientResult<T> {
        if let Err(e) = &result {
            if e.is_unauthorized() {
                tracing::info!("Token rejected, clearing session");
                if let Err(clear_err) = self.session.clear() {
                    tracing::warn!(error = %clear_err, "Failed to clear session");
                }
            }
        }
        result
    }

    // ============================================
    // Auth
    // ============================================

    /// Log in and persist the returned token
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.http.post(self.url("/auth/login")).json(&body).send().await?;
        let login: LoginResponse = read_json(response, &[StatusCode::OK], "login failed").await?;
        self.session.establish(login.user.clone(), Some(&login.token))?;
        tracing::info!(username = %login.user.username, "Logged in");
        Ok(login)
    }

    pub fn logout(&self) -> ClientResult<()> {
        self.session.clear()
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> ClientResult<MessageResponse> {
        let body = ChangePasswordRequest {
            old_password: old_password.to_string(),
            new_password: new_password.to_string(),
        };
        self.call(
            self.http.put(self.url("/auth/change-password")).json(&body),
            "failed to change password",
        )
        .await
    }

    // ============================================
    // Mini-program users
    // ============================================

    pub async fn users(&self) -> ClientResult<Vec<User>> {
        self.call(self.http.get(self.url("/users/")), "failed to load users").await
    }

    pub async fn user(&self, id: i64) -> ClientResult<User> {
        self.call(self.http.get(self.url(&format!("/users/{id}"))), "failed to load user")
            .await
    }

    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> ClientResult<User> {
        self.call(
            self.http.put(self.url(&format!("/users/{id}"))).json(update),
            "failed to update user",
        )
        .await
    }

    pub async fn delete_user(&self, id: i64) -> ClientResult<()> {
        self.call_empty(self.http.delete(self.url(&format!("/users/{id}"))), "failed to delete user")
            .await
    }

    // ============================================
    // Columns
    // ============================================

    pub async fn columns(&self) -> ClientResult<Vec<Column>> {
        self.call(self.http.get(self.url("/columns/")), "failed to load columns").await
    }

    pub async fn create_column(&self, input: &ColumnInput) -> ClientResult<Column> {
        self.call(self.http.post(self.url("/columns/")).json(input), "failed to create column")
            .await
    }

    pub async fn update_column(&self, id: i64, input: &ColumnInput) -> ClientResult<Column> {
        self.call(
            self.http.put(self.url(&format!("/columns/{id}"))).json(input),
            "failed to update column",
        )
        .await
    }

    pub async fn delete_column(&self, id: i64) -> ClientResult<()> {
        self.call_empty(
            self.http.delete(self.url(&format!("/columns/{id}"))),
            "failed to delete column",
        )
        .await
    }

    // ============================================
    // Articles
    // ============================================

    pub async fn articles(&self, filter: ArticleFilter, page: u32, page_size: u32) -> ClientResult<Paged<Article>> {
        let mut query = vec![("page", page.to_string()), ("page_size", page_size.to_string())];
        if let Some(column_id) = filter.column_id {
            query.push(("column_id", column_id.to_string()));
        }
        if let Some(status) = filter.status {
            query.push(("status", status.to_string()));
        }
        self.call(
            self.http.get(self.url("/articles/")).query(&query),
            "failed to load articles",
        )
        .await
    }

    pub async fn article(&self, id: i64) -> ClientResult<Article> {
        self.call(self.http.get(self.url(&format!("/articles/{id}"))), "failed to load article")
            .await
    }

    pub async fn create_article(&self, input: &ArticleInput) -> ClientResult<Article> {
        self.call(self.http.post(self.url("/articles/")).json(input), "failed to create article")
            .await
    }

    pub async fn update_article(&self, id: i64, input: &ArticleInput) -> ClientResult<Article> {
        self.call(
            self.http.put(self.url(&format!("/articles/{id}"))).json(input),
            "failed to update article",
        )
        .await
    }

    pub async fn set_article_status(&self, id: i64, status: i64) -> ClientResult<Article> {
        self.call(
            self.http
                .put(self.url(&format!("/articles/{id}/status")))
                .json(&StatusInput { status }),
            "failed to update article status",
        )
        .await
    }

    pub async fn delete_article(&self, id: i64) -> ClientResult<()> {
        self.call_empty(
            self.http.delete(self.url(&format!("/articles/{id}"))),
            "failed to delete article",
        )
        .await
    }

    // ============================================
    // Roles
    // ============================================

    pub async fn roles(&self, page: u32, page_size: u32) -> ClientResult<Paged<Role>> {
        self.call(
            self.http
                .get(self.url("/roles/"))
                .query(&[("page", page), ("page_size", page_size)]),
            "failed to load roles",
        )
        .await
    }

    pub async fn create_role(&self, input: &RoleInput) -> ClientResult<Role> {
        self.call(self.http.post(self.url("/roles/")).json(input), "failed to create role")
            .await
    }

    pub async fn update_role(&self, id: i64, input: &RoleInput) -> ClientResult<Role> {
        self.call(
            self.http.put(self.url(&format!("/roles/{id}"))).json(input),
            "failed to update role",
        )
        .await
    }

    pub async fn set_role_status(&self, id: i64, status: i64) -> ClientResult<Role> {
        self.call(
            self.http
                .put(self.url(&format!("/roles/{id}/status")))
                .json(&StatusInput { status }),
            "failed to update role status",
        )
        .await
    }

    pub async fn delete_role(&self, id: i64) -> ClientResult<()> {
        self.call_empty(self.http.delete(self.url(&format!("/roles/{id}"))), "failed to delete role")
            .await
    }

    pub async fn role_menus(&self, id: i64) -> ClientResult<Vec<i64>> {
        let response: MenuIdsResponse = self
            .call(
                self.http.get(self.url(&format!("/roles/{id}/menus"))),
                "failed to load role permissions",
            )
            .await?;
        Ok(response.menu_ids)
    }

    pub async fn set_role_menus(&self, id: i64, menu_ids: &[i64]) -> ClientResult<Vec<i64>> {
        let body = RoleMenus {
            menu_ids: menu_ids.to_vec(),
        };
        let response: MenuIdsResponse = self
            .call(
                self.http.put(self.url(&format!("/roles/{id}/menus"))).json(&body),
                "failed to update role permissions",
            )
            .await?;
        Ok(response.menu_ids)
    }

    // ============================================
    // Menus
    // ============================================

    pub async fn menus(&self) -> ClientResult<Vec<Menu>> {
        self.call(self.http.get(self.url("/menus/")), "failed to load menus").await
    }

    pub async fn menu_tree(&self) -> ClientResult<Vec<Menu>> {
        self.call(self.http.get(self.url("/menus/tree")), "failed to load menu tree")
            .await
    }

    pub async fn create_menu(&self, input: &MenuInput) -> ClientResult<Menu> {
        self.call(self.http.post(self.url("/menus/")).json(input), "failed to create menu")
            .await
    }

    pub async fn update_menu(&self, id: i64, input: &MenuInput) -> ClientResult<Menu> {
        self.call(
            self.http.put(self.url(&format!("/menus/{id}"))).json(input),
            "failed to update menu",
        )
        .await
    }

    pub async fn set_menu_status(&self, id: i64, status: i64) -> ClientResult<Menu> {
        self.call(
            self.http
                .put(self.url(&format!("/menus/{id}/status")))
                .json(&StatusInput { status }),
            "failed to update menu status",
        )
        .await
    }

    pub async fn delete_menu(&self, id: i64) -> ClientResult<()> {
        self.call_empty(self.http.delete(self.url(&format!("/menus/{id}"))), "failed to delete menu")
            .await
    }

    // ============================================
    // Backend users
    // ============================================

    pub async fn backend_users(&self, page: u32, page_size: u32) -> ClientResult<Paged<BackendUser>> {
        self.call(
            self.http
                .get(self.url("/backend-users/"))
                .query(&[("page", page), ("page_size", page_size)]),
            "failed to load backend users",
        )
        .await
    }

    /// The generated password is only returned here
    pub async fn create_backend_user(&self, input: &BackendUserInput) -> ClientResult<CreatedBackendUser> {
        self.call(
            self.http.post(self.url("/backend-users/")).json(input),
            "failed to create backend user",
        )
        .await
    }

    pub async fn update_backend_user(&self, id: i64, input: &BackendUserInput) -> ClientResult<BackendUser> {
        self.call(
            self.http.put(self.url(&format!("/backend-users/{id}"))).json(input),
            "failed to update backend user",
        )
        .await
    }

    pub async fn set_backend_user_status(&self, id: i64, status: i64) -> ClientResult<BackendUser> {
        self.call(
            self.http
                .put(self.url(&format!("/backend-users/{id}/status")))
                .json(&StatusInput { status }),
            "failed to update backend user status",
        )
        .await
    }

    pub async fn reset_password(&self, id: i64) -> ClientResult<PasswordReset> {
        self.call(
            self.http.put(self.url(&format!("/backend-users/{id}/reset-password"))),
            "failed to reset password",
        )
        .await
    }

    pub async fn delete_backend_user(&self, id: i64) -> ClientResult<()> {
        self.call_empty(
            self.http.delete(self.url(&format!("/backend-users/{id}"))),
            "failed to delete backend user",
        )
        .await
    }

    /// Menu tree the logged-in account may see
    pub async fn current_menus(&self) -> ClientResult<Vec<Menu>> {
        self.call(
            self.http.get(self.url("/backend-users/current/menus")),
            "failed to load menus",
        )
        .await
    }

    // ============================================
    // Uploads
    // ============================================

    pub async fn upload_image(&self, filename: &str, bytes: Vec<u8>) -> ClientResult<UploadResponse> {
        self.send_upload("/upload/image", filename, bytes, "image upload failed").await
    }

    pub async fn upload_video(&self, filename: &str, bytes: Vec<u8>) -> ClientResult<UploadResponse> {
        self.send_upload("/upload/video", filename, bytes, "video upload failed").await
    }

    async fn send_upload(
        &self,
        path: &str,
        filename: &str,
        bytes: Vec<u8>,
        default_message: &str,
    ) -> ClientResult<UploadResponse> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.call(self.http.post(self.url(path)).multipart(form), default_message)
            .await
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient").field("base", &self.base).finish()
    }
}

#[async_trait]
impl UploadHandler for AdminClient {
    async fn upload(&self, file: &PastedFile) -> ClientResult<String> {
        let response = self.upload_image(&file.name, file.bytes.clone()).await?;
        Ok(response.url)
    }
}
