//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use chrono::Duration;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::auth::JwtKeys;
use crate::config::Config;
use crate::db::Database;
use crate::wechat::SessionExchange;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// CMS database
    pub db: Arc<Database>,
    /// Admin token keys
    pub jwt: JwtKeys,
    /// Mini-program login exchange
    pub wechat: Arc<dyn SessionExchange>,
    /// API configuration
    pub config: Arc<ApiConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        jwt: JwtKeys,
        wechat: Arc<dyn SessionExchange>,
        config: ApiConfig,
    ) -> Self {
        Self {
            db,
            jwt,
            wechat,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Root of the upload tree, served under `/uploads`
    pub upload_dir: PathBuf,
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Largest accepted image upload in bytes
    pub max_image_bytes: usize,
    /// Largest accepted video upload in bytes
    pub max_video_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            upload_dir: PathBuf::from("./uploads"),
            cors_origins: Vec::new(),
            max_image_bytes: 5 * 1024 * 1024,  // 5MB
            max_video_bytes: 50 * 1024 * 1024, // 50MB
        }
    }
}

impl ApiConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            upload_dir: PathBuf::from(&config.server.upload_dir),
            cors_origins: config.server.cors_origins.clone(),
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Token keys from the `[jwt]` section
pub fn jwt_keys(config: &Config) -> JwtKeys {
    JwtKeys::new(&config.jwt.secret, Duration::hours(config.jwt.ttl_hours.max(1)))
}
