//! Menu repository and tree assembly

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use std::collections::HashMap;

use super::{check_status, expect_affected, Database, StorageError, StorageResult};
use crate::models::{Menu, MenuInput, STATUS_ENABLED};

pub(super) const MENU_COLUMNS: &str =
    "m.id, m.parent_id, m.name, m.title, m.path, m.component, m.icon, m.sort, m.type, m.status, m.created_at, m.updated_at";

pub(super) fn menu_from_row(row: &Row<'_>) -> rusqlite::Result<Menu> {
    Ok(Menu {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        name: row.get(2)?,
        title: row.get(3)?,
        path: row.get(4)?,
        component: row.get(5)?,
        icon: row.get(6)?,
        sort: row.get(7)?,
        menu_type: row.get(8)?,
        status: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
        children: Vec::new(),
    })
}

/// Nest a flat menu list by `parent_id`, starting from the roots (`parent_id = 0`).
///
/// Sibling order follows the input order. Entries whose parent is not in the
/// list are dropped.
pub fn build_menu_tree(menus: Vec<Menu>) -> Vec<Menu> {
    let mut by_parent: HashMap<i64, Vec<Menu>> = HashMap::new();
    for menu in menus {
        by_parent.entry(menu.parent_id).or_default().push(menu);
    }
    attach_children(&mut by_parent, 0)
}

fn attach_children(by_parent: &mut HashMap<i64, Vec<Menu>>, parent_id: i64) -> Vec<Menu> {
    // Taking the bucket out guarantees each node is visited once
    let Some(mut level) = by_parent.remove(&parent_id) else {
        return Vec::new();
    };
    for menu in &mut level {
        menu.children = attach_children(by_parent, menu.id);
    }
    level
}

fn menu_type_or_default(menu_type: i64) -> i64 {
    if menu_type == 0 {
        1
    } else {
        menu_type
    }
}

fn validate_input(input: &MenuInput) -> StorageResult<()> {
    if input.name.trim().is_empty() || input.title.trim().is_empty() {
        return Err(StorageError::Validation(
            "name and title are required".to_string(),
        ));
    }
    Ok(())
}

impl Database {
    /// Every menu, flat, in display order
    pub fn list_menus(&self) -> StorageResult<Vec<Menu>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MENU_COLUMNS} FROM menus m ORDER BY m.sort, m.id"
            ))?;
            let menus = stmt
                .query_map([], menu_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(menus)
        })
    }

    /// Enabled menus nested into a tree
    pub fn menu_tree(&self) -> StorageResult<Vec<Menu>> {
        let enabled = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MENU_COLUMNS} FROM menus m WHERE m.status = ?1 ORDER BY m.sort, m.id"
            ))?;
            let menus = stmt
                .query_map(params![STATUS_ENABLED], menu_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(menus)
        })?;
        Ok(build_menu_tree(enabled))
    }

    pub fn create_menu(&self, input: &MenuInput) -> StorageResult<Menu> {
        validate_input(input)?;
        let menu_type = menu_type_or_default(input.menu_type);
        let now = Utc::now();

        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO menus (parent_id, name, title, path, component, icon, sort, type, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
                params![
                    input.parent_id,
                    input.name,
                    input.title,
                    input.path,
                    input.component,
                    input.icon,
                    input.sort,
                    menu_type,
                    STATUS_ENABLED,
                    now
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(Menu {
            id,
            parent_id: input.parent_id,
            name: input.name.clone(),
            title: input.title.clone(),
            path: input.path.clone(),
            component: input.component.clone(),
            icon: input.icon.clone(),
            sort: input.sort,
            menu_type,
            status: STATUS_ENABLED,
            created_at: now,
            updated_at: now,
            children: Vec::new(),
        })
    }

    pub fn get_menu(&self, id: i64) -> StorageResult<Menu> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {MENU_COLUMNS} FROM menus m WHERE m.id = ?1"),
                params![id],
                menu_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound("menu".to_string()))
        })
    }

    pub fn update_menu(&self, id: i64, input: &MenuInput) -> StorageResult<Menu> {
        validate_input(input)?;
        if input.parent_id == id {
            return Err(StorageError::Validation(
                "a menu cannot be its own parent".to_string(),
            ));
        }

        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE menus
                 SET parent_id = ?1, name = ?2, title = ?3, path = ?4, component = ?5, icon = ?6, sort = ?7, type = ?8, updated_at = ?9
                 WHERE id = ?10",
                params![
                    input.parent_id,
                    input.name,
                    input.title,
                    input.path,
                    input.component,
                    input.icon,
                    input.sort,
                    menu_type_or_default(input.menu_type),
                    Utc::now(),
                    id
                ],
            )?;
            expect_affected(affected, "menu")
        })?;
        self.get_menu(id)
    }

    pub fn set_menu_status(&self, id: i64, status: i64) -> StorageResult<()> {
        check_status(status)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE menus SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status, Utc::now(), id],
            )?;
            expect_affected(affected, "menu")
        })
    }

    /// Delete a leaf menu together with its role grants
    pub fn delete_menu(&self, id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            let children: i64 = conn.query_row(
                "SELECT COUNT(*) FROM menus WHERE parent_id = ?1",
                params![id],
                |r| r.get(0),
            )?;
            if children > 0 {
                return Err(StorageError::Conflict(
                    "menu has child menus".to_string(),
                ));
            }

            let tx = conn.transaction()?;
            tx.execute("DELETE FROM role_menus WHERE menu_id = ?1", params![id])?;
            let affected = tx.execute("DELETE FROM menus WHERE id = ?1", params![id])?;
            expect_affected(affected, "menu")?;
            tx.commit()?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STATUS_DISABLED;

    fn input(parent_id: i64, name: &str, sort: i64) -> MenuInput {
        MenuInput {
            parent_id,
            name: name.to_string(),
            title: name.to_uppercase(),
            sort,
            ..Default::default()
        }
    }

    fn names(menus: &[Menu]) -> Vec<&str> {
        menus.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_create_defaults_type_to_menu() {
        let db = Database::open_in_memory().unwrap();
        let menu = db.create_menu(&input(0, "reports", 9)).unwrap();
        assert_eq!(menu.menu_type, 1);
        assert_eq!(menu.status, STATUS_ENABLED);
        assert_eq!(db.get_menu(menu.id).unwrap().menu_type, 1);

        let mut button = input(menu.id, "export", 1);
        button.menu_type = 2;
        assert_eq!(db.create_menu(&button).unwrap().menu_type, 2);
    }

    #[test]
    fn test_tree_nests_enabled_menus() {
        let db = Database::open_in_memory().unwrap();
        let root = db.create_menu(&input(0, "reports", 100)).unwrap();
        let daily = db.create_menu(&input(root.id, "daily", 2)).unwrap();
        db.create_menu(&input(root.id, "weekly", 1)).unwrap();
        db.create_menu(&input(daily.id, "export", 1)).unwrap();
        let hidden = db.create_menu(&input(root.id, "hidden", 3)).unwrap();
        db.set_menu_status(hidden.id, STATUS_DISABLED).unwrap();

        let tree = db.menu_tree().unwrap();
        let reports = tree.iter().find(|m| m.name == "reports").unwrap();
        assert_eq!(names(&reports.children), vec!["weekly", "daily"]);
        assert_eq!(names(&reports.children[1].children), vec!["export"]);
        assert_eq!(tree.last().unwrap().name, "reports");
    }

    #[test]
    fn test_build_tree_drops_orphans() {
        let db = Database::open_in_memory().unwrap();
        let mut flat = db.list_menus().unwrap();
        let mut orphan = flat[0].clone();
        orphan.id = 9_000;
        orphan.parent_id = 8_999;
        flat.push(orphan);

        let roots = flat.len() - 1;
        let tree = build_menu_tree(flat);
        assert_eq!(tree.len(), roots);
        assert!(tree.iter().all(|m| m.id != 9_000));
    }

    #[test]
    fn test_delete_rules() {
        let db = Database::open_in_memory().unwrap();
        let root = db.create_menu(&input(0, "reports", 1)).unwrap();
        let child = db.create_menu(&input(root.id, "daily", 1)).unwrap();

        assert!(matches!(db.delete_menu(root.id), Err(StorageError::Conflict(_))));
        db.delete_menu(child.id).unwrap();
        db.delete_menu(root.id).unwrap();
        assert!(matches!(db.delete_menu(root.id), Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_update_rejects_self_parent_and_bad_status() {
        let db = Database::open_in_memory().unwrap();
        let menu = db.create_menu(&input(0, "reports", 1)).unwrap();

        assert!(matches!(
            db.update_menu(menu.id, &input(menu.id, "reports", 1)),
            Err(StorageError::Validation(_))
        ));
        assert!(matches!(
            db.set_menu_status(menu.id, 5),
            Err(StorageError::Validation(_))
        ));

        let updated = db.update_menu(menu.id, &input(0, "stats", 4)).unwrap();
        assert_eq!(updated.name, "stats");
        assert_eq!(updated.title, "STATS");
    }
}
