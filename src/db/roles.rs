//! Role repository and role → menu grants

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{check_status, expect_affected, Database, StorageError, StorageResult};
use crate::models::{PageRequest, Paged, Role, RoleInput, STATUS_ENABLED};

const ROLE_COLUMNS: &str = "id, name, display_name, description, status, created_at, updated_at";

fn role_from_row(row: &Row<'_>) -> rusqlite::Result<Role> {
    Ok(Role {
        id: row.get(0)?,
        name: row.get(1)?,
        display_name: row.get(2)?,
        description: row.get(3)?,
        status: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn validate_input(input: &RoleInput) -> StorageResult<()> {
    if input.name.trim().is_empty() || input.display_name.trim().is_empty() {
        return Err(StorageError::Validation(
            "name and display_name are required".to_string(),
        ));
    }
    Ok(())
}

fn name_taken(err: StorageError, name: &str) -> StorageError {
    if err.is_unique_violation() {
        StorageError::Conflict(format!("role name '{name}' already exists"))
    } else {
        err
    }
}

/// Outcome of granting menus by name
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GrantReport {
    pub granted: usize,
    pub missing: Vec<String>,
}

impl Database {
    pub fn list_roles(&self, page: PageRequest) -> StorageResult<Paged<Role>> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM roles", [], |r| r.get(0))?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {ROLE_COLUMNS} FROM roles ORDER BY id LIMIT ?1 OFFSET ?2"
            ))?;
            let list = stmt
                .query_map(
                    params![i64::from(page.page_size), page.offset() as i64],
                    role_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(page.wrap(list, total.max(0) as u64))
        })
    }

    pub fn create_role(&self, input: &RoleInput) -> StorageResult<Role> {
        validate_input(input)?;
        let now = Utc::now();
        let id = self
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO roles (name, display_name, description, status, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                    params![input.name, input.display_name, input.description, STATUS_ENABLED, now],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .map_err(|e| name_taken(e, &input.name))?;

        tracing::info!(role_id = id, name = %input.name, "Created role");
        Ok(Role {
            id,
            name: input.name.clone(),
            display_name: input.display_name.clone(),
            description: input.description.clone(),
            status: STATUS_ENABLED,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_role(&self, id: i64) -> StorageResult<Role> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = ?1"),
                params![id],
                role_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound("role".to_string()))
        })
    }

    pub fn find_role_by_name(&self, name: &str) -> StorageResult<Option<Role>> {
        self.with_conn(|conn| {
            let role = conn
                .query_row(
                    &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = ?1"),
                    params![name],
                    role_from_row,
                )
                .optional()?;
            Ok(role)
        })
    }

    /// Return the role called `input.name`, creating it when absent
    pub fn ensure_role(&self, input: &RoleInput) -> StorageResult<Role> {
        match self.find_role_by_name(&input.name)? {
            Some(role) => Ok(role),
            None => self.create_role(input),
        }
    }

    pub fn update_role(&self, id: i64, input: &RoleInput) -> StorageResult<Role> {
        validate_input(input)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE roles SET name = ?1, display_name = ?2, description = ?3, updated_at = ?4 WHERE id = ?5",
                params![input.name, input.display_name, input.description, Utc::now(), id],
            )?;
            expect_affected(affected, "role")
        })
        .map_err(|e| name_taken(e, &input.name))?;
        self.get_role(id)
    }

    pub fn set_role_status(&self, id: i64, status: i64) -> StorageResult<()> {
        check_status(status)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE roles SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status, Utc::now(), id],
            )?;
            expect_affected(affected, "role")
        })
    }

    /// Delete an unused role and its menu grants
    pub fn delete_role(&self, id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            let users: i64 = conn.query_row(
                "SELECT COUNT(*) FROM backend_users WHERE role_id = ?1",
                params![id],
                |r| r.get(0),
            )?;
            if users > 0 {
                return Err(StorageError::Conflict(
                    "role is assigned to backend users".to_string(),
                ));
            }

            let tx = conn.transaction()?;
            tx.execute("DELETE FROM role_menus WHERE role_id = ?1", params![id])?;
            let affected = tx.execute("DELETE FROM roles WHERE id = ?1", params![id])?;
            expect_affected(affected, "role")?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Menu ids granted to a role, ascending
    pub fn role_menu_ids(&self, role_id: i64) -> StorageResult<Vec<i64>> {
        self.get_role(role_id)?;
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT menu_id FROM role_menus WHERE role_id = ?1 ORDER BY menu_id")?;
            let ids = stmt
                .query_map(params![role_id], |r| r.get(0))?
                .collect::<Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    /// Replace the role's grants with exactly `menu_ids`
    pub fn set_role_menus(&self, role_id: i64, menu_ids: &[i64]) -> StorageResult<()> {
        self.get_role(role_id)?;
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM role_menus WHERE role_id = ?1", params![role_id])?;
            {
                let mut exists = tx.prepare("SELECT EXISTS(SELECT 1 FROM menus WHERE id = ?1)")?;
                let mut insert =
                    tx.prepare("INSERT OR IGNORE INTO role_menus (role_id, menu_id) VALUES (?1, ?2)")?;
                for menu_id in menu_ids {
                    let known: bool = exists.query_row(params![menu_id], |r| r.get(0))?;
                    if !known {
                        return Err(StorageError::Validation(format!(
                            "menu {menu_id} does not exist"
                        )));
                    }
                    insert.execute(params![role_id, menu_id])?;
                }
            }
            tx.commit()?;
            Ok(())
        })?;

        tracing::info!(role_id, count = menu_ids.len(), "Updated role menus");
        Ok(())
    }

    /// Add every enabled menu to the named role, keeping existing grants
    pub fn grant_all_menus(&self, role_name: &str) -> StorageResult<usize> {
        let role = self
            .find_role_by_name(role_name)?
            .ok_or_else(|| StorageError::NotFound(format!("role '{role_name}'")))?;

        self.with_conn(|conn| {
            let affected = conn.execute(
                "INSERT OR IGNORE INTO role_menus (role_id, menu_id)
                 SELECT ?1, id FROM menus WHERE status = ?2",
                params![role.id, STATUS_ENABLED],
            )?;
            Ok(affected)
        })
    }

    /// Add the menus called `menu_names` to the named role; unknown names are reported back
    pub fn grant_menus(&self, role_name: &str, menu_names: &[&str]) -> StorageResult<GrantReport> {
        let role = self
            .find_role_by_name(role_name)?
            .ok_or_else(|| StorageError::NotFound(format!("role '{role_name}'")))?;

        self.with_conn(|conn| {
            let mut report = GrantReport::default();
            let mut lookup = conn.prepare("SELECT id FROM menus WHERE name = ?1 ORDER BY id LIMIT 1")?;
            let mut insert =
                conn.prepare("INSERT OR IGNORE INTO role_menus (role_id, menu_id) VALUES (?1, ?2)")?;

            for name in menu_names {
                match lookup.query_row(params![name], |r| r.get::<_, i64>(0)).optional()? {
                    Some(menu_id) => report.granted += insert.execute(params![role.id, menu_id])?,
                    None => report.missing.push((*name).to_string()),
                }
            }
            Ok(report)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendUserInput, STATUS_DISABLED};

    fn input(name: &str) -> RoleInput {
        RoleInput {
            name: name.to_string(),
            display_name: name.to_uppercase(),
            description: String::new(),
        }
    }

    #[test]
    fn test_seeded_roles_are_listed() {
        let db = Database::open_in_memory().unwrap();
        let page = db.list_roles(PageRequest::new(None, None, 20)).unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.list[0].name, "admin");
    }

    #[test]
    fn test_duplicate_name_conflicts() {
        let db = Database::open_in_memory().unwrap();
        db.create_role(&input("auditor")).unwrap();
        assert!(matches!(
            db.create_role(&input("auditor")),
            Err(StorageError::Conflict(_))
        ));

        let ensured = db.ensure_role(&input("auditor")).unwrap();
        assert_eq!(ensured.display_name, "AUDITOR");
    }

    #[test]
    fn test_set_role_menus_replaces() {
        let db = Database::open_in_memory().unwrap();
        let role = db.create_role(&input("auditor")).unwrap();
        let menus = db.list_menus().unwrap();

        db.set_role_menus(role.id, &[menus[0].id, menus[1].id]).unwrap();
        db.set_role_menus(role.id, &[menus[2].id]).unwrap();
        assert_eq!(db.role_menu_ids(role.id).unwrap(), vec![menus[2].id]);

        assert!(matches!(
            db.set_role_menus(role.id, &[menus[0].id, 9_999]),
            Err(StorageError::Validation(_))
        ));
        // A rejected replacement leaves the old grants in place
        assert_eq!(db.role_menu_ids(role.id).unwrap(), vec![menus[2].id]);

        db.set_role_menus(role.id, &[]).unwrap();
        assert!(db.role_menu_ids(role.id).unwrap().is_empty());
    }

    #[test]
    fn test_grants_by_name() {
        let db = Database::open_in_memory().unwrap();
        let all = db.grant_all_menus("admin").unwrap();
        assert_eq!(all, db.list_menus().unwrap().len());
        assert_eq!(db.grant_all_menus("admin").unwrap(), 0);

        let report = db.grant_menus("editor", &["articles", "columns", "reports"]).unwrap();
        assert_eq!(report.granted, 2);
        assert_eq!(report.missing, vec!["reports".to_string()]);

        assert!(matches!(
            db.grant_all_menus("nobody"),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_refused_while_assigned() {
        let db = Database::open_in_memory().unwrap();
        let role = db.create_role(&input("auditor")).unwrap();
        let user = db
            .create_backend_user(
                &BackendUserInput {
                    username: "a".to_string(),
                    email: "a@example.com".to_string(),
                    role_id: role.id,
                },
                "hash",
            )
            .unwrap();

        assert!(matches!(db.delete_role(role.id), Err(StorageError::Conflict(_))));
        db.delete_backend_user(user.id).unwrap();
        db.delete_role(role.id).unwrap();
        assert!(matches!(db.get_role(role.id), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_status_toggle() {
        let db = Database::open_in_memory().unwrap();
        let role = db.create_role(&input("auditor")).unwrap();
        db.set_role_status(role.id, STATUS_DISABLED).unwrap();
        assert_eq!(db.get_role(role.id).unwrap().status, STATUS_DISABLED);
        assert!(matches!(
            db.set_role_status(role.id, -1),
            Err(StorageError::Validation(_))
        ));
    }
}
