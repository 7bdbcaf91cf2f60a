//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and `MOUNTAIN_*` environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub jwt: JwtConfig,

    #[serde(default)]
    pub wechat: WechatConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// API server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Root directory for uploaded images and videos, served under `/uploads`
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_upload_dir() -> String {
    "./uploads".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upload_dir: default_upload_dir(),
            cors_origins: Vec::new(),
        }
    }
}

/// SQLite database location
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("mountain").join("mountain.db").to_string_lossy().to_string())
        .unwrap_or_else(|| "./mountain.db".to_string())
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Signing secret used when none is configured; fine for development only
pub const DEFAULT_JWT_SECRET: &str = "change-me";

/// Admin token signing
#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    #[serde(default = "default_jwt_secret")]
    pub secret: String,

    #[serde(default = "default_jwt_ttl")]
    pub ttl_hours: i64,
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_jwt_ttl() -> i64 {
    24
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: default_jwt_secret(),
            ttl_hours: default_jwt_ttl(),
        }
    }
}

impl JwtConfig {
    pub fn uses_default_secret(&self) -> bool {
        self.secret == DEFAULT_JWT_SECRET
    }
}

/// Mini-program credentials for the code-to-session exchange
#[derive(Debug, Clone, Deserialize)]
pub struct WechatConfig {
    #[serde(default)]
    pub app_id: String,

    #[serde(default)]
    pub secret: String,

    #[serde(default = "default_wechat_api_base")]
    pub api_base: String,

    #[serde(default = "default_wechat_timeout")]
    pub request_timeout_ms: u64,
}

fn default_wechat_api_base() -> String {
    "https://api.weixin.qq.com".to_string()
}

fn default_wechat_timeout() -> u64 {
    5000
}

impl Default for WechatConfig {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            secret: String::new(),
            api_base: default_wechat_api_base(),
            request_timeout_ms: default_wechat_timeout(),
        }
    }
}

/// Bootstrap admin account created by `mountain create-admin`
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,

    #[serde(default = "default_admin_email")]
    pub email: String,
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_email() -> String {
    "admin@example.com".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            email: default_admin_email(),
        }
    }
}

/// Settings for the client library and `mountain-cli`
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// Server root; the clients append `/api/mp` and `/api/admin`
    #[serde(default = "default_client_base")]
    pub base_url: String,

    /// File holding the persisted admin token
    #[serde(default = "default_token_path")]
    pub token_path: String,

    #[serde(default = "default_client_timeout")]
    pub request_timeout_ms: u64,
}

fn default_client_base() -> String {
    "http://localhost:8080".to_string()
}

fn default_token_path() -> String {
    dirs::config_dir()
        .map(|p| p.join("mountain").join("session.json").to_string_lossy().to_string())
        .unwrap_or_else(|| "./session.json".to_string())
}

fn default_client_timeout() -> u64 {
    10_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_client_base(),
            token_path: default_token_path(),
            request_timeout_ms: default_client_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    /// Filter used when `RUST_LOG` is unset
    pub fn default_filter(&self) -> String {
        format!("mountain={},tower_http=debug", self.level)
    }

    /// Install the global subscriber: `RUST_LOG` wins over `level`, and
    /// `format = "json"` switches to JSON lines
    pub fn init_tracing(&self) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| self.default_filter().into());

        let registry = tracing_subscriber::registry().with(filter);
        if self.is_json() {
            registry.with(tracing_subscriber::fmt::layer().json()).init();
        } else {
            registry.with(tracing_subscriber::fmt::layer()).init();
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Explicit path when given, else the default locations
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::load_default()),
        }
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("mountain").join("config.toml")),
            Some(PathBuf::from("/etc/mountain/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply `MOUNTAIN_*` environment variable overrides to an existing config
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = lookup("MOUNTAIN_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("MOUNTAIN_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid MOUNTAIN_PORT"),
            }
        }
        if let Some(dir) = lookup("MOUNTAIN_UPLOAD_DIR") {
            self.server.upload_dir = dir;
        }

        // Database overrides
        if let Some(path) = lookup("MOUNTAIN_DB_PATH") {
            self.database.path = path;
        }

        // Auth overrides
        if let Some(secret) = lookup("MOUNTAIN_JWT_SECRET") {
            self.jwt.secret = secret;
        }

        // WeChat overrides
        if let Some(app_id) = lookup("MOUNTAIN_WECHAT_APP_ID") {
            self.wechat.app_id = app_id;
        }
        if let Some(secret) = lookup("MOUNTAIN_WECHAT_SECRET") {
            self.wechat.secret = secret;
        }

        // Client overrides
        if let Some(base) = lookup("MOUNTAIN_API_BASE") {
            self.client.base_url = base;
        }

        // Logging overrides
        if let Some(level) = lookup("MOUNTAIN_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("MOUNTAIN_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Mountain CMS Configuration
#
# Environment variables override these settings:
# - MOUNTAIN_HOST, MOUNTAIN_PORT, MOUNTAIN_UPLOAD_DIR
# - MOUNTAIN_DB_PATH
# - MOUNTAIN_JWT_SECRET
# - MOUNTAIN_WECHAT_APP_ID, MOUNTAIN_WECHAT_SECRET
# - MOUNTAIN_API_BASE
# - MOUNTAIN_LOG_LEVEL, MOUNTAIN_LOG_FORMAT

[server]
host = "0.0.0.0"
port = 8080

# Uploaded files are stored here and served under /uploads
upload_dir = "./uploads"

# Allowed CORS origins (empty allows any origin)
cors_origins = []

[database]
# SQLite database file, created on first start
path = "./mountain.db"

[jwt]
# Secret used to sign admin tokens. Change this in production.
secret = "change-me"

# Token lifetime in hours
ttl_hours = 24

[wechat]
# Mini-program credentials for jscode2session
app_id = ""
secret = ""
api_base = "https://api.weixin.qq.com"
request_timeout_ms = 5000

[admin]
# Account created by `mountain create-admin`
username = "admin"
email = "admin@example.com"

[client]
# Server root used by mountain-cli
base_url = "http://localhost:8080"

# Where mountain-cli keeps the admin token
token_path = "./session.json"

request_timeout_ms = 10000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
