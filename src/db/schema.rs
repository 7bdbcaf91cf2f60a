//! Schema migrations and seed data

use chrono::Utc;
use rusqlite::{params, Connection};

use super::StorageResult;

const MIGRATIONS: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        phone TEXT,
        open_id TEXT,
        name TEXT,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_users_open_id ON users(open_id);

    CREATE TABLE IF NOT EXISTS columns (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        sort_order INTEGER NOT NULL DEFAULT 0,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS articles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        column_id INTEGER NOT NULL,
        title TEXT NOT NULL,
        thumbnail TEXT NOT NULL DEFAULT '',
        content TEXT NOT NULL DEFAULT '',
        author TEXT NOT NULL DEFAULT '',
        status INTEGER NOT NULL DEFAULT 0,
        view_count INTEGER NOT NULL DEFAULT 0,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_articles_column ON articles(column_id, status);

    CREATE TABLE IF NOT EXISTS roles (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT UNIQUE NOT NULL,
        display_name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        status INTEGER NOT NULL DEFAULT 1,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS role_menus (
        role_id INTEGER NOT NULL,
        menu_id INTEGER NOT NULL,
        PRIMARY KEY (role_id, menu_id)
    );

    CREATE TABLE IF NOT EXISTS menus (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        parent_id INTEGER NOT NULL DEFAULT 0,
        name TEXT NOT NULL,
        title TEXT NOT NULL,
        path TEXT NOT NULL DEFAULT '',
        component TEXT NOT NULL DEFAULT '',
        icon TEXT NOT NULL DEFAULT '',
        sort INTEGER NOT NULL DEFAULT 0,
        type INTEGER NOT NULL DEFAULT 1,
        status INTEGER NOT NULL DEFAULT 1,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS backend_users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT UNIQUE NOT NULL,
        email TEXT UNIQUE NOT NULL,
        password TEXT NOT NULL,
        role_id INTEGER NOT NULL,
        status INTEGER NOT NULL DEFAULT 1,
        created_at DATETIME NOT NULL,
        updated_at DATETIME NOT NULL
    );
";

/// (name, title, path, component, icon, sort)
const DEFAULT_MENUS: &[(&str, &str, &str, &str, &str, i64)] = &[
    ("articles", "Articles", "/admin/articles", "ArticleList", "Document", 1),
    ("columns", "Columns", "/admin/columns", "ColumnList", "Menu", 2),
    ("mp-users", "Mini-program Users", "/admin/users", "UserList", "User", 3),
    ("backend-users", "Backend Users", "/admin/backend-users", "BackendUserList", "UserFilled", 4),
    ("roles", "Roles", "/admin/roles", "RoleList", "Key", 5),
    ("menus", "Menus", "/admin/menus", "MenuList", "Grid", 6),
];

/// (name, display_name, description)
const DEFAULT_ROLES: &[(&str, &str, &str)] = &[
    ("admin", "Administrator", "Full access"),
    ("editor", "Editor", "Edits articles and columns"),
    ("viewer", "Viewer", "Read-only access"),
];

/// Create every table that does not exist yet
pub(super) fn migrate(conn: &Connection) -> StorageResult<()> {
    conn.execute_batch(MIGRATIONS)?;
    Ok(())
}

/// Insert default menus and roles into empty tables
pub(super) fn seed_defaults(conn: &Connection) -> StorageResult<()> {
    let now = Utc::now();

    let menu_count: i64 = conn.query_row("SELECT COUNT(*) FROM menus", [], |r| r.get(0))?;
    if menu_count == 0 {
        let mut stmt = conn.prepare(
            "INSERT INTO menus (parent_id, name, title, path, component, icon, sort, type, status, created_at, updated_at)
             VALUES (0, ?1, ?2, ?3, ?4, ?5, ?6, 1, 1, ?7, ?7)",
        )?;
        for (name, title, path, component, icon, sort) in DEFAULT_MENUS {
            stmt.execute(params![name, title, path, component, icon, sort, now])?;
        }
        tracing::info!(count = DEFAULT_MENUS.len(), "Seeded default menus");
    }

    let role_count: i64 = conn.query_row("SELECT COUNT(*) FROM roles", [], |r| r.get(0))?;
    if role_count == 0 {
        let mut stmt = conn.prepare(
            "INSERT INTO roles (name, display_name, description, status, created_at, updated_at)
             VALUES (?1, ?2, ?3, 1, ?4, ?4)",
        )?;
        for (name, display_name, description) in DEFAULT_ROLES {
            stmt.execute(params![name, display_name, description, now])?;
        }
        tracing::info!(count = DEFAULT_ROLES.len(), "Seeded default roles");
    }

    Ok(())
}
