//! Article store abstraction and implementations.
//!
//! This module defines the interface for persisting and reading articles. The
//! ingestion side writes through it; the retrieval core only reads the corpus
//! snapshot and publication dates.

pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{Article, DateCoverage, DatedArticle};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error
    #[error("Query execution failed: {0}")]
    QueryError(String),

    /// Schema or migration error
    #[error("Schema error: {0}")]
    SchemaError(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Outcome of inserting one article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Stored under the returned identifier
    Inserted(i64),

    /// An article with the same source URL already exists; nothing was written
    Duplicate,
}

/// Trait for article storage backends.
#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Create tables and indexes. Idempotent.
    async fn initialize(&mut self) -> StorageResult<()>;

    /// Insert an article unless one with the same URL is already stored.
    ///
    /// The article's `id` is ignored; the store assigns one.
    async fn insert_article(&mut self, article: &Article) -> StorageResult<InsertOutcome>;

    /// The corpus snapshot: every article, ordered by identifier ascending.
    async fn get_all_articles(&self) -> StorageResult<Vec<Article>>;

    /// Every article with a non-empty publication date, date text as stored.
    ///
    /// Dates are not parsed here; callers decide what counts as a valid date.
    async fn get_dated_articles(&self) -> StorageResult<Vec<DatedArticle>>;

    /// Number of stored articles.
    async fn count_articles(&self) -> StorageResult<usize>;

    /// How many articles carry a publication date, plus up to `sample_size`
    /// example `(title, date)` pairs.
    async fn date_coverage(&self, sample_size: usize) -> StorageResult<DateCoverage>;
}
