//! Shared fixtures for router and client tests

use async_trait::async_trait;
use chrono::Duration;
use std::sync::Arc;

use super::state::{ApiConfig, AppState};
use crate::auth::{hash_password, JwtKeys};
use crate::db::Database;
use crate::models::BackendUserInput;
use crate::wechat::{SessionExchange, WechatError, WechatSession};

pub const ADMIN_USERNAME: &str = "root";
pub const ADMIN_PASSWORD: &str = "root-pass";

/// Maps code `c` to openid `openid-c`; the code `bad` fails like the platform would
pub struct StubExchange;

#[async_trait]
impl SessionExchange for StubExchange {
    async fn exchange(&self, code: &str) -> Result<WechatSession, WechatError> {
        match code.trim() {
            "" => Err(WechatError::EmptyCode),
            "bad" => Err(WechatError::Api {
                code: 40029,
                message: "invalid code".to_string(),
            }),
            code => Ok(WechatSession {
                openid: format!("openid-{code}"),
                session_key: None,
                unionid: None,
            }),
        }
    }
}

/// In-memory state with one admin account ([`ADMIN_USERNAME`] / [`ADMIN_PASSWORD`])
pub fn test_state(upload_dir: &std::path::Path) -> AppState {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let admin_role = db.find_role_by_name("admin").unwrap().unwrap();
    db.create_backend_user(
        &BackendUserInput {
            username: ADMIN_USERNAME.to_string(),
            email: "root@example.com".to_string(),
            role_id: admin_role.id,
        },
        &hash_password(ADMIN_PASSWORD),
    )
    .unwrap();
    db.grant_all_menus("admin").unwrap();

    let config = ApiConfig {
        upload_dir: upload_dir.to_path_buf(),
        ..ApiConfig::default()
    };
    AppState::new(
        db,
        JwtKeys::new("test-secret", Duration::hours(1)),
        Arc::new(StubExchange),
        config,
    )
}
