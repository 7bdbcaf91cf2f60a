//! CMS Database
//!
//! SQLite-backed persistence for the content system:
//!
//! - **users**: mini-program accounts keyed by openid
//! - **columns / articles**: the published content
//! - **roles / menus / role_menus**: admin console permissions
//! - **backend_users**: admin console accounts
//!
//! One connection is shared behind a `std::sync::Mutex` because
//! `rusqlite::Connection` is not `Sync`. Queries are short, so handlers call
//! the repository methods directly instead of hopping to a blocking pool.

mod articles;
mod backend_users;
mod columns;
mod error;
mod menus;
mod roles;
mod schema;
mod users;

pub use error::{StorageError, StorageResult};
pub use articles::extract_image_sources;
pub use menus::build_menu_tree;
pub use roles::GrantReport;

use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::sync::Mutex;

/// Handle to the CMS database
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database file and bring its schema up to date
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
            ",
        )?;

        tracing::debug!(path = %path.display(), "Opened database");
        Self::from_connection(conn)
    }

    /// Private in-memory database, used by tests and dry runs
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        schema::migrate(&conn)?;
        schema::seed_defaults(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with exclusive access to the connection
    pub(crate) fn with_conn<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T>,
    {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        f(&mut conn)
    }

    /// Cheap round trip used by readiness probes
    pub fn ping(&self) -> StorageResult<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
    }
}

/// Reject anything other than the two status values
pub(crate) fn check_status(status: i64) -> StorageResult<()> {
    if status == crate::models::STATUS_DISABLED || status == crate::models::STATUS_ENABLED {
        Ok(())
    } else {
        Err(StorageError::Validation(
            "status must be 0 or 1".to_string(),
        ))
    }
}

/// Map "no row touched" to a NotFound error
pub(crate) fn expect_affected(affected: usize, what: &str) -> StorageResult<()> {
    if affected == 0 {
        Err(StorageError::NotFound(what.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_creates_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("mountain.db");
        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        db.ping().unwrap();
    }

    #[test]
    fn test_reopen_keeps_seed_data_single() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("mountain.db");

        let first = Database::open(&path).unwrap().list_menus().unwrap().len();
        let second = Database::open(&path).unwrap().list_menus().unwrap().len();
        assert_eq!(first, second);
        assert!(first > 0);
    }

    #[test]
    fn test_check_status() {
        assert!(check_status(0).is_ok());
        assert!(check_status(1).is_ok());
        assert!(matches!(check_status(2), Err(StorageError::Validation(_))));
    }
}
