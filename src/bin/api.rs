//! Mountain API Server
//!
//! Run with: cargo run --bin mountain-api [-- path/to/config.toml]
//!
//! # Configuration
//!
//! Without an explicit path the config is read from the default locations
//! (see [`mountain::config::Config::load_default`]). Environment variables:
//! - `MOUNTAIN_HOST`, `MOUNTAIN_PORT`: Bind address (default: 0.0.0.0:8080)
//! - `MOUNTAIN_DB_PATH`: SQLite file
//! - `MOUNTAIN_UPLOAD_DIR`: Upload directory (default: ./uploads)
//! - `MOUNTAIN_JWT_SECRET`: Admin token signing secret
//! - `MOUNTAIN_WECHAT_APP_ID`, `MOUNTAIN_WECHAT_SECRET`: Mini-program credentials
//! - `RUST_LOG`: Log filter (default: mountain=info,tower_http=debug)

use anyhow::Context;
use mountain::api::{self, serve, ApiConfig, AppState};
use mountain::config::Config;
use mountain::db::Database;
use mountain::wechat::WechatClient;
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = Config::resolve(config_path.as_deref())?;

    config.logging.init_tracing();
    tracing::info!("Starting Mountain API server v{}", env!("CARGO_PKG_VERSION"));

    if config.jwt.uses_default_secret() {
        tracing::warn!("Using the default JWT secret; set MOUNTAIN_JWT_SECRET in production");
    }

    // Initialize database
    let db_path = PathBuf::from(&config.database.path);
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    tracing::info!("Database: {:?}", db_path);
    let db = Arc::new(Database::open(&db_path)?);

    let api_config = ApiConfig::from_config(&config);
    std::fs::create_dir_all(&api_config.upload_dir)
        .with_context(|| format!("creating upload directory {}", api_config.upload_dir.display()))?;
    tracing::info!("Upload directory: {:?}", api_config.upload_dir);

    if config.wechat.app_id.is_empty() {
        tracing::warn!("WeChat app_id not configured, mini-program login will fail");
    }
    let wechat = Arc::new(WechatClient::new(config.wechat.clone())?);

    let state = AppState::new(db, api::jwt_keys(&config), wechat, api_config.clone());

    // Run server
    tracing::info!("Starting server on {}:{}", api_config.host, api_config.port);
    serve(state, &api_config).await?;

    tracing::info!("Mountain API server stopped");
    Ok(())
}
