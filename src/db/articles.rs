//! Article repository

use chrono::Utc;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::sync::OnceLock;

use super::{check_status, expect_affected, Database, StorageError, StorageResult};
use crate::models::{Article, ArticleFilter, ArticleInput, ArticleSummary, PageRequest, Paged, ARTICLE_PUBLISHED};

const ARTICLE_SELECT: &str = "SELECT a.id, a.column_id, a.title, a.thumbnail, a.content, a.author, a.status,
        a.view_count, a.created_at, a.updated_at, c.name
     FROM articles a
     LEFT JOIN columns c ON a.column_id = c.id";

fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
    Ok(Article {
        id: row.get(0)?,
        column_id: row.get(1)?,
        title: row.get(2)?,
        thumbnail: row.get(3)?,
        content: row.get(4)?,
        author: row.get(5)?,
        status: row.get(6)?,
        view_count: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
        column_name: row.get(10)?,
        images: Vec::new(),
    })
}

fn summary_from_row(row: &Row<'_>) -> rusqlite::Result<ArticleSummary> {
    Ok(ArticleSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        thumbnail: row.get(2)?,
        author: row.get(3)?,
        view_count: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Collect `src` attributes of `<img>` tags in document order
pub fn extract_image_sources(html: &str) -> Vec<String> {
    static IMG_SRC: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(re) = IMG_SRC
        .get_or_init(|| Regex::new(r#"(?i)<img\b[^>]*?\bsrc\s*=\s*["']([^"']+)["']"#).ok())
        .as_ref()
    else {
        return Vec::new();
    };

    re.captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

fn validate_input(conn: &Connection, input: &ArticleInput) -> StorageResult<()> {
    if input.title.trim().is_empty() {
        return Err(StorageError::Validation("title is required".to_string()));
    }
    check_status(input.status)?;

    let column_exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM columns WHERE id = ?1)",
        params![input.column_id],
        |r| r.get(0),
    )?;
    if !column_exists {
        return Err(StorageError::Validation(format!(
            "column {} does not exist",
            input.column_id
        )));
    }
    Ok(())
}

impl Database {
    /// Admin listing, newest first, with optional column and status filters
    pub fn list_articles(&self, filter: ArticleFilter, page: PageRequest) -> StorageResult<Paged<Article>> {
        let mut clauses = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(column_id) = filter.column_id.filter(|id| *id > 0) {
            clauses.push("a.column_id = ?");
            args.push(Value::Integer(column_id));
        }
        if let Some(status) = filter.status {
            clauses.push("a.status = ?");
            args.push(Value::Integer(status));
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM articles a{where_sql}"),
                params_from_iter(args.iter()),
                |r| r.get(0),
            )?;

            let mut page_args = args.clone();
            page_args.push(Value::Integer(i64::from(page.page_size)));
            page_args.push(Value::Integer(page.offset() as i64));

            let mut stmt = conn.prepare(&format!(
                "{ARTICLE_SELECT}{where_sql} ORDER BY a.created_at DESC, a.id DESC LIMIT ? OFFSET ?"
            ))?;
            let list = stmt
                .query_map(params_from_iter(page_args.iter()), article_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(page.wrap(list, total.max(0) as u64))
        })
    }

    pub fn create_article(&self, input: &ArticleInput) -> StorageResult<Article> {
        let now = Utc::now();
        let id = self.with_conn(|conn| {
            validate_input(conn, input)?;
            conn.execute(
                "INSERT INTO articles (column_id, title, thumbnail, content, author, status, view_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)",
                params![
                    input.column_id,
                    input.title,
                    input.thumbnail,
                    input.content,
                    input.author,
                    input.status,
                    now
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        tracing::info!(article_id = id, column_id = input.column_id, "Created article");
        self.get_article(id)
    }

    pub fn get_article(&self, id: i64) -> StorageResult<Article> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("{ARTICLE_SELECT} WHERE a.id = ?1"),
                params![id],
                article_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound("article".to_string()))
        })
    }

    pub fn update_article(&self, id: i64, input: &ArticleInput) -> StorageResult<Article> {
        let now = Utc::now();
        self.with_conn(|conn| {
            validate_input(conn, input)?;
            let affected = conn.execute(
                "UPDATE articles
                 SET column_id = ?1, title = ?2, thumbnail = ?3, content = ?4, author = ?5, status = ?6, updated_at = ?7
                 WHERE id = ?8",
                params![
                    input.column_id,
                    input.title,
                    input.thumbnail,
                    input.content,
                    input.author,
                    input.status,
                    now,
                    id
                ],
            )?;
            expect_affected(affected, "article")
        })?;
        self.get_article(id)
    }

    pub fn delete_article(&self, id: i64) -> StorageResult<()> {
        self.with_conn(|conn| {
            let affected = conn.execute("DELETE FROM articles WHERE id = ?1", params![id])?;
            expect_affected(affected, "article")
        })
    }

    /// Publish (1) or withdraw (0) an article
    pub fn set_article_status(&self, id: i64, status: i64) -> StorageResult<()> {
        check_status(status)?;
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE articles SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status, Utc::now(), id],
            )?;
            expect_affected(affected, "article")
        })
    }

    /// Published articles of one column, newest first, without bodies
    pub fn list_published_by_column(
        &self,
        column_id: i64,
        page: PageRequest,
    ) -> StorageResult<Paged<ArticleSummary>> {
        self.with_conn(|conn| {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM articles WHERE column_id = ?1 AND status = ?2",
                params![column_id, ARTICLE_PUBLISHED],
                |r| r.get(0),
            )?;

            let mut stmt = conn.prepare(
                "SELECT id, title, thumbnail, author, view_count, created_at
                 FROM articles
                 WHERE column_id = ?1 AND status = ?2
                 ORDER BY created_at DESC, id DESC
                 LIMIT ?3 OFFSET ?4",
            )?;
            let list = stmt
                .query_map(
                    params![
                        column_id,
                        ARTICLE_PUBLISHED,
                        i64::from(page.page_size),
                        page.offset() as i64
                    ],
                    summary_from_row,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(page.wrap(list, total.max(0) as u64))
        })
    }

    /// Reader-facing detail: counts the view, then returns the published article
    /// with its image sources filled in. Drafts are reported as missing.
    pub fn get_published_article(&self, id: i64) -> StorageResult<Article> {
        let mut article = self.with_conn(|conn| {
            let tx = conn.transaction()?;
            let affected = tx.execute(
                "UPDATE articles SET view_count = view_count + 1 WHERE id = ?1 AND status = ?2",
                params![id, ARTICLE_PUBLISHED],
            )?;
            expect_affected(affected, "article")?;

            let article = tx.query_row(
                &format!("{ARTICLE_SELECT} WHERE a.id = ?1"),
                params![id],
                article_from_row,
            )?;
            tx.commit()?;
            Ok(article)
        })?;

        article.images = extract_image_sources(&article.content);
        Ok(article)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnInput, ARTICLE_DRAFT};

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let column = db
            .create_column(&ColumnInput {
                name: "news".to_string(),
                ..Default::default()
            })
            .unwrap();
        (db, column.id)
    }

    fn article(column_id: i64, title: &str, status: i64) -> ArticleInput {
        ArticleInput {
            column_id,
            title: title.to_string(),
            content: format!("<p>{title}</p>"),
            author: "desk".to_string(),
            status,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_joins_column_name() {
        let (db, column_id) = setup();
        let created = db.create_article(&article(column_id, "first", ARTICLE_DRAFT)).unwrap();
        assert_eq!(created.column_name.as_deref(), Some("news"));
        assert_eq!(created.view_count, 0);
    }

    #[test]
    fn test_create_validates_input() {
        let (db, column_id) = setup();
        assert!(matches!(
            db.create_article(&article(column_id, "  ", ARTICLE_DRAFT)),
            Err(StorageError::Validation(_))
        ));
        assert!(matches!(
            db.create_article(&article(column_id + 100, "orphan", ARTICLE_DRAFT)),
            Err(StorageError::Validation(_))
        ));
        assert!(matches!(
            db.create_article(&article(column_id, "bad status", 7)),
            Err(StorageError::Validation(_))
        ));
    }

    #[test]
    fn test_list_filters_and_pages() {
        let (db, column_id) = setup();
        for i in 0..5 {
            let status = if i % 2 == 0 { ARTICLE_PUBLISHED } else { ARTICLE_DRAFT };
            db.create_article(&article(column_id, &format!("a{i}"), status)).unwrap();
        }

        let all = db
            .list_articles(ArticleFilter::default(), PageRequest::new(None, None, 20))
            .unwrap();
        assert_eq!(all.total, 5);
        assert_eq!(all.list[0].title, "a4");

        let published = db
            .list_articles(
                ArticleFilter {
                    column_id: Some(column_id),
                    status: Some(ARTICLE_PUBLISHED),
                },
                PageRequest::new(Some(1), Some(2), 20),
            )
            .unwrap();
        assert_eq!(published.total, 3);
        assert_eq!(published.list.len(), 2);
        assert_eq!(published.page_size, 2);

        let drafts = db
            .list_articles(
                ArticleFilter {
                    column_id: None,
                    status: Some(ARTICLE_DRAFT),
                },
                PageRequest::new(None, None, 20),
            )
            .unwrap();
        assert_eq!(drafts.total, 2);
    }

    #[test]
    fn test_published_feed_skips_drafts() {
        let (db, column_id) = setup();
        db.create_article(&article(column_id, "draft", ARTICLE_DRAFT)).unwrap();
        for i in 0..12 {
            db.create_article(&article(column_id, &format!("p{i}"), ARTICLE_PUBLISHED)).unwrap();
        }

        let first = db
            .list_published_by_column(column_id, PageRequest::new(Some(1), Some(10), 10))
            .unwrap();
        let second = db
            .list_published_by_column(column_id, PageRequest::new(Some(2), Some(10), 10))
            .unwrap();

        assert_eq!(first.total, 12);
        assert_eq!(first.list.len(), 10);
        assert_eq!(second.list.len(), 2);
        assert!(first.list.iter().chain(&second.list).all(|a| a.title != "draft"));
    }

    #[test]
    fn test_published_detail_counts_views() {
        let (db, column_id) = setup();
        let mut input = article(column_id, "pics", ARTICLE_PUBLISHED);
        input.content = r#"<p>x</p><img src="/uploads/images/a.png"><IMG alt="b" SRC='https://cdn/b.jpg'/>"#.to_string();
        let created = db.create_article(&input).unwrap();

        let seen = db.get_published_article(created.id).unwrap();
        assert_eq!(seen.view_count, 1);
        assert_eq!(seen.images, vec!["/uploads/images/a.png", "https://cdn/b.jpg"]);

        let seen = db.get_published_article(created.id).unwrap();
        assert_eq!(seen.view_count, 2);
    }

    #[test]
    fn test_draft_detail_is_not_found_and_not_counted() {
        let (db, column_id) = setup();
        let draft = db.create_article(&article(column_id, "hidden", ARTICLE_DRAFT)).unwrap();

        assert!(matches!(
            db.get_published_article(draft.id),
            Err(StorageError::NotFound(_))
        ));
        assert_eq!(db.get_article(draft.id).unwrap().view_count, 0);

        db.set_article_status(draft.id, ARTICLE_PUBLISHED).unwrap();
        assert_eq!(db.get_published_article(draft.id).unwrap().view_count, 1);
    }

    #[test]
    fn test_update_and_delete_missing() {
        let (db, column_id) = setup();
        assert!(matches!(
            db.update_article(42, &article(column_id, "x", ARTICLE_DRAFT)),
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(db.delete_article(42), Err(StorageError::NotFound(_))));
        assert!(matches!(
            db.set_article_status(42, ARTICLE_PUBLISHED),
            Err(StorageError::NotFound(_))
        ));
    }
}
