//! Article provider module.
//!
//! The `ArticleProvider` trait abstracts where scraped articles come from, so the
//! ingestion pipeline does not depend on a particular source format.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::Article;

pub mod json;

/// Errors that can occur when fetching articles from a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Failed to read from the data source
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the data format
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for sourcing articles.
///
/// Providers return articles without identifiers; the store assigns them.
/// Duplicates are allowed and are skipped at insert time.
#[async_trait]
pub trait ArticleProvider: Send + Sync {
    /// Fetch all available articles from this provider.
    async fn fetch_articles(&self) -> ProviderResult<Vec<Article>>;

    /// A human-readable name for logging.
    fn name(&self) -> &str;
}
