//! Column repository

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};

use super::{expect_affected, Database, StorageError, StorageResult};
use crate::models::{Column, ColumnInput};

const COLUMN_COLUMNS: &str = "id, name, description, sort_order, created_at, updated_at";

fn column_from_row(row: &Row<'_>) -> rusqlite::Result<Column> {
    Ok(Column {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        sort_order: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

impl Database {
    /// All columns in display order
    pub fn list_columns(&self) -> StorageResult<Vec<Column>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMN_COLUMNS} FROM columns ORDER BY sort_order, id"
            ))?;
            let columns = stmt
                .query_map([], column_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(columns)
        })
    }

    pub fn create_column(&self, input: &ColumnInput) -> StorageResult<Column> {
        let now = Utc::now();
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO columns (name, description, sort_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                params![input.name, input.description, input.sort_order, now],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        Ok(Column {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            sort_order: input.sort_order,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_column(&self, id: i64) -> StorageResult<Column> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {COLUMN_COLUMNS} FROM columns WHERE id = ?1"),
                params![id],
                column_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound("column".to_string()))
        })
    }

    pub fn update_column(&self, id: i64, input: &ColumnInput) -> StorageResult<Column> {
        let now = Utc::now();
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE columns SET name = ?1, description = ?2, sort_order = ?3, updated_at = ?4 WHERE id = ?5",
                params![input.name, input.description, input.sort_order, now, id],
            )?;
            expect_affected(affected, "column")
        })?;
        self.get_column(id)
    }

    /// Delete a column; refused while any article still belongs to it
    pub fn delete_column(&self, id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            let articles: i64 = conn.query_row(
                "SELECT COUNT(*) FROM articles WHERE column_id = ?1",
                params![id],
                |r| r.get(0),
            )?;
            if articles > 0 {
                return Err(StorageError::Conflict(
                    "cannot delete column with articles".to_string(),
                ));
            }

            let affected = conn.execute("DELETE FROM columns WHERE id = ?1", params![id])?;
            expect_affected(affected, "column")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleInput;

    fn input(name: &str, sort_order: i64) -> ColumnInput {
        ColumnInput {
            name: name.to_string(),
            description: String::new(),
            sort_order,
        }
    }

    #[test]
    fn test_list_orders_by_sort_then_id() {
        let db = Database::open_in_memory().unwrap();
        db.create_column(&input("late", 5)).unwrap();
        db.create_column(&input("early", 1)).unwrap();
        db.create_column(&input("also-late", 5)).unwrap();

        let names: Vec<_> = db.list_columns().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["early", "late", "also-late"]);
    }

    #[test]
    fn test_update_column() {
        let db = Database::open_in_memory().unwrap();
        let column = db.create_column(&input("news", 0)).unwrap();

        let updated = db.update_column(column.id, &input("headlines", 3)).unwrap();
        assert_eq!(updated.name, "headlines");
        assert_eq!(updated.sort_order, 3);

        assert!(matches!(
            db.update_column(999, &input("x", 0)),
            Err(StorageError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_refused_while_articles_exist() {
        let db = Database::open_in_memory().unwrap();
        let column = db.create_column(&input("news", 0)).unwrap();
        let article = db
            .create_article(&ArticleInput {
                column_id: column.id,
                title: "hello".to_string(),
                ..Default::default()
            })
            .unwrap();

        assert!(matches!(
            db.delete_column(column.id),
            Err(StorageError::Conflict(_))
        ));

        db.delete_article(article.id).unwrap();
        db.delete_column(column.id).unwrap();
        assert!(db.list_columns().unwrap().is_empty());
    }
}
