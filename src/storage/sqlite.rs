//! SQLite storage implementation.
//!
//! This module provides a SQLite-based implementation of the `ArticleStorage`
//! trait using rusqlite. The connection sits behind an async mutex so the store
//! can be shared by concurrent queries.

use std::path::Path;

use async_trait::async_trait;
use rusqlite::{params, Connection, Row};
use tokio::sync::Mutex;
use tracing::debug;

use super::{ArticleStorage, InsertOutcome, StorageError, StorageResult};
use crate::models::{Article, DateCoverage, DatedArticle};

/// SQLite-based article storage.
///
/// # Schema
/// `articles(id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT, authors TEXT,
/// pub_date TEXT, abstract TEXT, url TEXT UNIQUE)`
pub struct SqliteStorage {
    connection: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) the database file at `db_path`.
    pub fn open(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = db_path.as_ref();
        debug!("Opening SQLite database at {}", path.display());
        let connection = Connection::open(path)
            .map_err(|e| StorageError::ConnectionError(format!("{}: {}", path.display(), e)))?;
        Ok(Self::from_connection(connection))
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> StorageResult<Self> {
        let connection = Connection::open_in_memory()
            .map_err(|e| StorageError::ConnectionError(e.to_string()))?;
        Ok(Self::from_connection(connection))
    }

    fn from_connection(connection: Connection) -> Self {
        Self {
            connection: Mutex::new(connection),
        }
    }

    fn create_schema(connection: &Connection) -> StorageResult<()> {
        connection
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS articles (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    title TEXT,
                    authors TEXT,
                    pub_date TEXT,
                    abstract TEXT,
                    url TEXT UNIQUE
                );",
            )
            .map_err(|e| StorageError::SchemaError(e.to_string()))
    }

    fn article_from_row(row: &Row<'_>) -> rusqlite::Result<Article> {
        Ok(Article {
            id: Some(row.get(0)?),
            title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            authors: row.get(2)?,
            pub_date: row.get(3)?,
            abstract_text: row.get(4)?,
            url: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        })
    }
}

fn query_error(error: rusqlite::Error) -> StorageError {
    StorageError::QueryError(error.to_string())
}

const SELECT_ARTICLE: &str = "SELECT id, title, authors, pub_date, abstract, url FROM articles";
const HAS_DATE: &str = "pub_date IS NOT NULL AND pub_date != ''";

#[async_trait]
impl ArticleStorage for SqliteStorage {
    async fn initialize(&mut self) -> StorageResult<()> {
        let connection = self.connection.lock().await;
        Self::create_schema(&connection)
    }

    async fn insert_article(&mut self, article: &Article) -> StorageResult<InsertOutcome> {
        let connection = self.connection.lock().await;
        let changed = connection
            .execute(
                "INSERT OR IGNORE INTO articles (title, authors, pub_date, abstract, url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    article.title,
                    article.authors,
                    article.pub_date,
                    article.abstract_text,
                    article.url
                ],
            )
            .map_err(query_error)?;

        if changed == 0 {
            Ok(InsertOutcome::Duplicate)
        } else {
            Ok(InsertOutcome::Inserted(connection.last_insert_rowid()))
        }
    }

    async fn get_all_articles(&self) -> StorageResult<Vec<Article>> {
        let connection = self.connection.lock().await;
        let mut statement = connection
            .prepare(&format!("{} ORDER BY id ASC", SELECT_ARTICLE))
            .map_err(query_error)?;
        let articles = statement
            .query_map([], Self::article_from_row)
            .map_err(query_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_error)?;
        Ok(articles)
    }

    async fn get_dated_articles(&self) -> StorageResult<Vec<DatedArticle>> {
        let connection = self.connection.lock().await;
        let mut statement = connection
            .prepare(&format!(
                "SELECT id, title, abstract, pub_date FROM articles WHERE {} ORDER BY id ASC",
                HAS_DATE
            ))
            .map_err(query_error)?;
        let articles = statement
            .query_map([], |row| {
                Ok(DatedArticle {
                    id: row.get(0)?,
                    title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    abstract_text: row.get(2)?,
                    pub_date: row.get(3)?,
                })
            })
            .map_err(query_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_error)?;
        Ok(articles)
    }

    async fn count_articles(&self) -> StorageResult<usize> {
        let connection = self.connection.lock().await;
        let count: i64 = connection
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))
            .map_err(query_error)?;
        Ok(count as usize)
    }

    async fn date_coverage(&self, sample_size: usize) -> StorageResult<DateCoverage> {
        let connection = self.connection.lock().await;
        let with_dates: i64 = connection
            .query_row(
                &format!("SELECT COUNT(*) FROM articles WHERE {}", HAS_DATE),
                [],
                |row| row.get(0),
            )
            .map_err(query_error)?;
        let total: i64 = connection
            .query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))
            .map_err(query_error)?;

        let mut statement = connection
            .prepare(&format!(
                "SELECT title, pub_date FROM articles WHERE {} ORDER BY id ASC LIMIT ?1",
                HAS_DATE
            ))
            .map_err(query_error)?;
        let samples = statement
            .query_map(params![sample_size as i64], |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    row.get::<_, String>(1)?,
                ))
            })
            .map_err(query_error)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(query_error)?;

        Ok(DateCoverage {
            with_dates: with_dates as usize,
            total: total as usize,
            samples,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, pub_date: Option<&str>, url: &str) -> Article {
        Article {
            id: None,
            title: title.to_string(),
            authors: Some("A. Author".to_string()),
            abstract_text: Some(format!("{} abstract", title)),
            pub_date: pub_date.map(str::to_string),
            url: url.to_string(),
        }
    }

    async fn storage() -> SqliteStorage {
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage.initialize().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let mut storage = storage().await;
        storage.initialize().await.unwrap();
        assert_eq!(storage.count_articles().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_assigns_ids_and_ignores_duplicate_urls() {
        let mut storage = storage().await;
        let first = storage
            .insert_article(&article("One", Some("2020-01-01"), "https://x/1"))
            .await
            .unwrap();
        let second = storage
            .insert_article(&article("Two", None, "https://x/2"))
            .await
            .unwrap();
        let again = storage
            .insert_article(&article("One again", None, "https://x/1"))
            .await
            .unwrap();

        assert_eq!(first, InsertOutcome::Inserted(1));
        assert_eq!(second, InsertOutcome::Inserted(2));
        assert_eq!(again, InsertOutcome::Duplicate);
        assert_eq!(storage.count_articles().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_is_ordered_by_id() {
        let mut storage = storage().await;
        for i in 0..5 {
            storage
                .insert_article(&article(&format!("A{}", i), None, &format!("https://x/{}", i)))
                .await
                .unwrap();
        }
        let ids: Vec<i64> = storage
            .get_all_articles()
            .await
            .unwrap()
            .iter()
            .filter_map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_dated_articles_skip_missing_and_empty_dates() {
        let mut storage = storage().await;
        storage.insert_article(&article("Dated", Some("2021-06-01"), "https://x/1")).await.unwrap();
        storage.insert_article(&article("Empty", Some(""), "https://x/2")).await.unwrap();
        storage.insert_article(&article("Missing", None, "https://x/3")).await.unwrap();

        let dated = storage.get_dated_articles().await.unwrap();
        assert_eq!(dated.len(), 1);
        assert_eq!(dated[0].title, "Dated");
        assert_eq!(dated[0].pub_date, "2021-06-01");
    }

    #[tokio::test]
    async fn test_date_coverage() {
        let mut storage = storage().await;
        storage.insert_article(&article("A", Some("2020-01-01"), "https://x/1")).await.unwrap();
        storage.insert_article(&article("B", None, "https://x/2")).await.unwrap();
        storage.insert_article(&article("C", Some("2022-03-04T10:00:00Z"), "https://x/3")).await.unwrap();

        let coverage = storage.date_coverage(1).await.unwrap();
        assert_eq!(coverage.with_dates, 2);
        assert_eq!(coverage.total, 3);
        assert_eq!(coverage.samples, vec![("A".to_string(), "2020-01-01".to_string())]);
    }
}
