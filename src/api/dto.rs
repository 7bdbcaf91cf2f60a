//! Data Transfer Objects
//!
//! Request and response shapes that exist only on the wire. Entities and
//! create/update payloads live in [`crate::models`].

use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

use crate::models::{ArticleFilter, BackendUser, PageRequest};

// ============================================
// Query strings
// ============================================

/// `?page=&page_size=`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page_size: Option<u32>,
}

impl PageParams {
    pub fn page_request(&self, default_size: u32) -> PageRequest {
        PageRequest::new(self.page, self.page_size, default_size)
    }
}

/// Admin article listing query
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ArticleListParams {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page_size: Option<u32>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub column_id: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub status: Option<i64>,
}

impl ArticleListParams {
    pub fn filter(&self) -> ArticleFilter {
        ArticleFilter {
            column_id: self.column_id,
            status: self.status,
        }
    }

    pub fn page_request(&self, default_size: u32) -> PageRequest {
        PageRequest::new(self.page, self.page_size, default_size)
    }
}

/// Treat `?x=` the same as an absent parameter
fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

// ============================================
// Admin auth
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: BackendUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// New account together with its generated password, shown once
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedBackendUser {
    pub user: BackendUser,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordReset {
    pub id: i64,
    pub password: String,
}

// ============================================
// Misc responses
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuIdsResponse {
    pub menu_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
    pub filename: String,
    pub size: u64,
}

/// Full health status
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
    pub uptime_seconds: u64,
    pub version: String,
}
