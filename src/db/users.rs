//! Mini-program user repository

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use super::{expect_affected, Database, StorageResult};
use crate::models::{Registration, User, UserUpdate};

const USER_COLUMNS: &str = "id, phone, open_id, name, created_at, updated_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        phone: row.get(1)?,
        openid: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        name: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn user_by_openid(conn: &Connection, openid: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE open_id = ?1 ORDER BY id LIMIT 1"),
        params![openid],
        user_from_row,
    )
    .optional()
}

fn blank_to_none(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

impl Database {
    /// Look up a user by platform openid
    pub fn find_user_by_openid(&self, openid: &str) -> StorageResult<Option<User>> {
        self.with_conn(|conn| Ok(user_by_openid(conn, openid)?))
    }

    /// Return the user bound to `openid`, creating a bare one on first login.
    ///
    /// Lookup and insert share one transaction so concurrent first logins
    /// end up with a single row.
    pub fn login_or_create_user(&self, openid: &str) -> StorageResult<User> {
        let (user, created) = self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if let Some(user) = user_by_openid(&tx, openid)? {
                return Ok((user, false));
            }

            let now = Utc::now();
            tx.execute(
                "INSERT INTO users (open_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
                params![openid, now],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            Ok((
                User {
                    id,
                    phone: None,
                    openid: openid.to_string(),
                    name: None,
                    created_at: now,
                    updated_at: now,
                },
                true,
            ))
        })?;

        if created {
            tracing::info!(user_id = user.id, "Created mini-program user on first login");
        }
        Ok(user)
    }

    /// Bind phone and name to an openid.
    ///
    /// Updates the existing user for that openid when there is one; otherwise
    /// inserts a new row. The flag is `true` when a row was created.
    pub fn register_user(&self, reg: &Registration) -> StorageResult<(User, bool)> {
        let phone = blank_to_none(&reg.phone);
        let name = blank_to_none(&reg.name);
        let openid = reg.openid.trim();

        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let now = Utc::now();

            let existing = match blank_to_none(openid) {
                Some(o) => user_by_openid(&tx, o)?,
                None => None,
            };

            if let Some(existing) = existing {
                tx.execute(
                    "UPDATE users SET phone = ?1, name = ?2, updated_at = ?3 WHERE id = ?4",
                    params![phone, name, now, existing.id],
                )?;
                tx.commit()?;
                let user = User {
                    phone: phone.map(str::to_string),
                    name: name.map(str::to_string),
                    updated_at: now,
                    ..existing
                };
                return Ok((user, false));
            }

            tx.execute(
                "INSERT INTO users (phone, open_id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                params![phone, openid, name, now],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            Ok((
                User {
                    id,
                    phone: phone.map(str::to_string),
                    openid: openid.to_string(),
                    name: name.map(str::to_string),
                    created_at: now,
                    updated_at: now,
                },
                true,
            ))
        })
    }

    /// All mini-program users, oldest first
    pub fn list_users(&self) -> StorageResult<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
            let users = stmt
                .query_map([], user_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(users)
        })
    }

    pub fn get_user(&self, id: i64) -> StorageResult<User> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?
            .ok_or_else(|| super::StorageError::NotFound("user".to_string()))
        })
    }

    pub fn update_user(&self, id: i64, update: &UserUpdate) -> StorageResult<User> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE users SET phone = ?1, open_id = ?2, name = ?3, updated_at = ?4 WHERE id = ?5",
                params![
                    blank_to_none(&update.phone),
                    update.openid.trim(),
                    blank_to_none(&update.name),
                    now,
                    id
                ],
            )?;
            expect_affected(affected, "user")
        })?;
        self.get_user(id)
    }

    pub fn delete_user(&self, id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
            expect_affected(affected, "user")
        })
    }
}
