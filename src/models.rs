//! Resource Model
//!
//! Entities and request payloads shared by the server and the client library.
//! Field names match the JSON wire contract used by both front ends.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Enabled/disabled flag used by roles, menus and backend users
pub const STATUS_DISABLED: i64 = 0;
pub const STATUS_ENABLED: i64 = 1;

/// Article publication state
pub const ARTICLE_DRAFT: i64 = 0;
pub const ARTICLE_PUBLISHED: i64 = 1;

/// Mini-program user, identified by the platform openid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub openid: String,
    #[serde(default)]
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// A user counts as registered once a non-empty phone number is bound
    pub fn has_phone(&self) -> bool {
        self.phone.as_deref().is_some_and(|p| !p.trim().is_empty())
    }
}

/// A named grouping of articles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full article record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub column_id: i64,
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    /// 0 = draft, 1 = published
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    /// Image sources found in `content`, filled in for detail views
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

/// Article row as listed in a column feed (no body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Admin role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    pub status: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Admin console menu entry, optionally nested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Menu {
    pub id: i64,
    #[serde(default)]
    pub parent_id: i64,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub sort: i64,
    /// 1 = menu, 2 = button
    #[serde(rename = "type", default = "default_menu_type")]
    pub menu_type: i64,
    #[serde(default = "default_status")]
    pub status: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Menu>,
}

/// Admin console account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role_id: i64,
    pub status: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_display: Option<String>,
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paged<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

/// Page coordinates for listing queries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl PageRequest {
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Normalise raw query values: page starts at 1, size falls back to `default_size`
    pub fn new(page: Option<u32>, page_size: Option<u32>, default_size: u32) -> Self {
        let page = page.filter(|p| *p >= 1).unwrap_or(1);
        let page_size = page_size
            .filter(|s| *s >= 1)
            .unwrap_or(default_size)
            .min(Self::MAX_PAGE_SIZE);
        Self { page, page_size }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn wrap<T>(&self, list: Vec<T>, total: u64) -> Paged<T> {
        Paged {
            list,
            total,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

// ============================================
// Request payloads
// ============================================

/// Mini-program login: one-time code from the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginCode {
    pub code: String,
}

/// Bind a phone number (and display name) to an openid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub openid: String,
    #[serde(default)]
    pub name: String,
}

/// Column create/update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ColumnInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub sort_order: i64,
}

/// Article create/update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleInput {
    pub column_id: i64,
    pub title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub status: i64,
}

/// Optional filters for the admin article listing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArticleFilter {
    pub column_id: Option<i64>,
    pub status: Option<i64>,
}

/// Role create/update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleInput {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

/// Menu create/update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MenuInput {
    #[serde(default)]
    pub parent_id: i64,
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub component: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub sort: i64,
    /// 0 means "not given" and is stored as 1 (menu)
    #[serde(rename = "type", default)]
    pub menu_type: i64,
}

/// Backend user create/update payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendUserInput {
    pub username: String,
    pub email: String,
    pub role_id: i64,
}

/// Mini-program user update payload (admin)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub openid: String,
    #[serde(default)]
    pub name: String,
}

/// Status toggle payload
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusInput {
    pub status: i64,
}

/// Role permission assignment payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleMenus {
    #[serde(default)]
    pub menu_ids: Vec<i64>,
}

fn default_menu_type() -> i64 {
    1
}

fn default_status() -> i64 {
    STATUS_ENABLED
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_normalises() {
        let page = PageRequest::new(None, None, 10);
        assert_eq!(page, PageRequest { page: 1, page_size: 10 });
        assert_eq!(page.offset(), 0);

        let page = PageRequest::new(Some(0), Some(0), 20);
        assert_eq!(page, PageRequest { page: 1, page_size: 20 });

        let page = PageRequest::new(Some(3), Some(500), 20);
        assert_eq!(page.page_size, PageRequest::MAX_PAGE_SIZE);
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn test_user_has_phone() {
        let json = r#"{"id":1,"openid":"o-1","phone":null,"name":null,
            "created_at":"2024-03-01T08:00:00Z","updated_at":"2024-03-01T08:00:00Z"}"#;
        let mut user: User = serde_json::from_str(json).unwrap();
        assert!(!user.has_phone());

        user.phone = Some("  ".to_string());
        assert!(!user.has_phone());

        user.phone = Some("13800000000".to_string());
        assert!(user.has_phone());
    }

    #[test]
    fn test_backend_user_hides_password() {
        let now = Utc::now();
        let user = BackendUser {
            id: 1,
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password_hash: "secret-hash".to_string(),
            role_id: 1,
            status: STATUS_ENABLED,
            created_at: now,
            updated_at: now,
            role_name: Some("admin".to_string()),
            role_display: None,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("role_display"));
    }

    #[test]
    fn test_menu_type_field_name() {
        let input: MenuInput = serde_json::from_str(r#"{"name":"a","title":"A","type":2}"#).unwrap();
        assert_eq!(input.menu_type, 2);

        let input: MenuInput = serde_json::from_str(r#"{"name":"a","title":"A"}"#).unwrap();
        assert_eq!(input.menu_type, 0);
    }
}
