//! Backend (admin console) user repository

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::menus::{menu_from_row, MENU_COLUMNS};
use super::{build_menu_tree, check_status, expect_affected, Database, StorageError, StorageResult};
use crate::models::{BackendUser, BackendUserInput, Menu, PageRequest, Paged, STATUS_ENABLED};

const BACKEND_USER_SELECT: &str = "SELECT u.id, u.username, u.email, u.password, u.role_id, u.status,
        u.created_at, u.updated_at, r.name, r.display_name
     FROM backend_users u
     LEFT JOIN roles r ON u.role_id = r.id";

fn backend_user_from_row(row: &Row<'_>) -> rusqlite::Result<BackendUser> {
    Ok(BackendUser {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        role_id: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
        role_name: row.get(8)?,
        role_display: row.get(9)?,
    })
}

fn validate_input(conn: &Connection, input: &BackendUserInput) -> StorageResult<()> {
    if input.username.trim().is_empty() || input.email.trim().is_empty() {
        return Err(StorageError::Validation(
            "username and email are required".to_string(),
        ));
    }

    let role_usable: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM roles WHERE id = ?1 AND status = ?2)",
        params![input.role_id, STATUS_ENABLED],
        |r| r.get(0),
    )?;
    if !role_usable {
        return Err(StorageError::Validation("invalid role".to_string()));
    }
    Ok(())
}

fn identity_taken(err: StorageError) -> StorageError {
    if err.is_unique_violation() {
        StorageError::Conflict("username or email already exists".to_string())
    } else {
        err
    }
}

impl Database {
    /// Newest accounts first, with role name and display name
    pub fn list_backend_users(&self, page: PageRequest) -> StorageResult<Paged<BackendUser>> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM backend_users", [], |r| r.get(0))?;
            let mut stmt = conn.prepare(&format!(
                "{BACKEND_USER_SELECT} ORDER BY u.created_at DESC, u.id DESC LIMIT ?1 OFFSET ?2"
            ))?;
            let list = stmt
                .query_map(
                    params![i64::from(page.page_size), page.offset() as i64],
                    backend_user_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(page.wrap(list, total.max(0) as u64))
        })
    }

    /// Insert an enabled account; the role must exist and be enabled
    pub fn create_backend_user(
        &self,
        input: &BackendUserInput,
        password_hash: &str,
    ) -> StorageResult<BackendUser> {
        let now = Utc::now();
        let id = self
            .with_conn(|conn| {
                validate_input(conn, input)?;
                conn.execute(
                    "INSERT INTO backend_users (username, email, password, role_id, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
                    params![
                        input.username.trim(),
                        input.email.trim(),
                        password_hash,
                        input.role_id,
                        STATUS_ENABLED,
                        now
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .map_err(identity_taken)?;

        tracing::info!(backend_user_id = id, username = %input.username, "Created backend user");
        self.get_backend_user(id)
    }

    pub fn get_backend_user(&self, id: i64) -> StorageResult<BackendUser> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{BACKEND_USER_SELECT} WHERE u.id = ?1"),
                params![id],
                backend_user_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound("backend user".to_string()))
        })
    }

    /// Account lookup for login; the returned record carries the password hash
    pub fn find_backend_user_by_username(&self, username: &str) -> StorageResult<Option<BackendUser>> {
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    &format!("{BACKEND_USER_SELECT} WHERE u.username = ?1"),
                    params![username],
                    backend_user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    pub fn update_backend_user(&self, id: i64, input: &BackendUserInput) -> StorageResult<BackendUser> {
        self.with_conn(|conn| {
            validate_input(conn, input)?;
            let affected = conn.execute(
                "UPDATE backend_users SET username = ?1, email = ?2, role_id = ?3, updated_at = ?4 WHERE id = ?5",
                params![input.username.trim(), input.email.trim(), input.role_id, Utc::now(), id],
            )?;
            expect_affected(affected, "backend user")
        })
        .map_err(identity_taken)?;
        self.get_backend_user(id)
    }

    pub fn set_backend_user_status(&self, id: i64, status: i64) -> StorageResult<()> {
        check_status(status)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE backend_users SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status, Utc::now(), id],
            )?;
            expect_affected(affected, "backend user")
        })
    }

    pub fn set_backend_user_password(&self, id: i64, password_hash: &str) -> StorageResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE backend_users SET password = ?1, updated_at = ?2 WHERE id = ?3",
                params![password_hash, Utc::now(), id],
            )?;
            expect_affected(affected, "backend user")
        })
    }

    pub fn delete_backend_user(&self, id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM backend_users WHERE id = ?1", params![id])?;
            expect_affected(affected, "backend user")
        })
    }

    /// Number of accounts holding the given role
    pub fn count_backend_users_with_role(&self, role_id: i64) -> StorageResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM backend_users WHERE role_id = ?1",
                params![role_id],
                |r| r.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
    }

    /// Enabled menus granted to the user's role, as a tree
    pub fn backend_user_menus(&self, user_id: i64) -> StorageResult<Vec<Menu>> {
        let user = self.get_backend_user(user_id)?;
        let granted = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MENU_COLUMNS}
                 FROM menus m
                 INNER JOIN role_menus rm ON m.id = rm.menu_id
                 WHERE rm.role_id = ?1 AND m.status = ?2
                 ORDER BY m.sort, m.id"
            ))?;
            let menus = stmt
                .query_map(params![user.role_id, STATUS_ENABLED], menu_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(menus)
        })?;
        Ok(build_menu_tree(granted))
    }
}
