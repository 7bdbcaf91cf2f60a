//! # Mountain
//!
//! A small CMS for a mini-program front end and a web admin console: users,
//! columns, articles, roles and menus behind a REST API, plus the client
//! library both front ends are built on.
//!
//! ## Modules
//!
//! - [`db`]: SQLite repository for every resource
//! - [`auth`]: password digests and admin bearer tokens
//! - [`wechat`]: mini-program login code exchange
//! - [`api`]: REST API server with Axum
//! - [`client`]: API clients, session, route guard, editor helper, page state
//! - [`config`]: TOML configuration with `MOUNTAIN_*` overrides
//! - [`setup`]: first admin account and default role permissions
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mountain::db::Database;
//! use mountain::models::ColumnInput;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open_in_memory()?;
//!
//!     let column = db.create_column(&ColumnInput {
//!         name: "News".to_string(),
//!         ..ColumnInput::default()
//!     })?;
//!     println!("Created column {} ({})", column.name, column.id);
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod models;
pub mod setup;
pub mod wechat;

// Re-export top-level types for convenience
pub use api::{build_router, serve, ApiConfig, ApiError, AppState};

pub use auth::{AuthError, Claims, JwtKeys};

pub use client::{AdminClient, ClientError, MpClient, Session};

pub use config::{Config, ConfigError, LoggingConfig};

pub use db::{Database, StorageError, StorageResult};

pub use models::{
    Article, ArticleSummary, BackendUser, Column, Menu, PageRequest, Paged, Role, User,
};

pub use wechat::{SessionExchange, WechatClient, WechatError};
