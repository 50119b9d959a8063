//! Query processing and ranking module.
//!
//! The [`RetrievalEngine`] combines semantic ranking over the loaded index with
//! exact publication-date filtering over the article store. It supports three
//! modes:
//!
//! - **content**: vectorize the query, reconcile it to the index dimension and
//!   return the nearest rows;
//! - **date range**: return articles dated inside a range, newest first, with
//!   distance 0;
//! - **combined**: oversample the content search, keep only hits dated inside
//!   the range and truncate, preserving distance order.
//!
//! # Usage
//!
//! ```rust,no_run
//! use article_search::embedding::TfidfVectorizer;
//! use article_search::index::{IndexCache, IndexPaths};
//! use article_search::query::{DateRange, RetrievalEngine};
//! use article_search::storage::sqlite::SqliteStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cache = IndexCache::default();
//! let paths = IndexPaths::new("faiss_index.index", "faiss_metadata.json");
//! let storage = SqliteStorage::open("oncology_articles.db")?;
//! let engine = RetrievalEngine::from_cache(&cache, &paths, storage, TfidfVectorizer::default())?;
//!
//! let range = DateRange::parse("2020-01-01", "2020-12-31")?;
//! for result in engine.search_combined("immunotherapy", &range, 5).await? {
//!     println!("{} ({:.3})", result.title, result.distance);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Text normalization is automatically applied to queries before vectorizing.

pub mod date_filter;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::embedding::{normalize_text, reconcile_dimension, FittedVectorizer, Vectorizer};
use crate::index::{IndexCache, IndexPaths, LoadedIndex};
use crate::models::SearchResult;
use crate::storage::ArticleStorage;

pub use date_filter::{DateRange, DateRangeError};

/// Default oversampling factor for combined searches.
pub const DEFAULT_OVERSAMPLE: usize = 2;

/// Errors that can occur during query processing.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Vectorizer fitting failed
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// Storage access failed
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Index search or metadata lookup failed
    #[error("Index error: {0}")]
    IndexError(String),

    /// The persisted index could not be loaded
    #[error("Index unavailable: {0}")]
    IndexUnavailable(String),

    /// Bad date range
    #[error("Invalid date range: {0}")]
    InvalidRange(#[from] DateRangeError),

    /// Invalid query parameters
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Which retrieval strategy a query runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Content,
    DateRange,
    Combined,
}

/// Search query parameters.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Free-text query, if any
    pub text: Option<String>,

    /// Maximum number of results to return
    pub top_k: usize,

    /// Optional publication date range
    pub date_range: Option<DateRange>,
}

impl SearchQuery {
    /// Create a new search query.
    ///
    /// Blank text is treated as no text. `top_k` defaults to 5.
    pub fn new(text: Option<String>, top_k: Option<usize>, date_range: Option<DateRange>) -> Self {
        Self {
            text: text.filter(|t| !t.trim().is_empty()),
            top_k: top_k.unwrap_or(5),
            date_range,
        }
    }

    /// The mode implied by which parts of the query are present.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidQuery` if neither text nor a date range is set.
    pub fn mode(&self) -> QueryResult<SearchMode> {
        match (&self.text, &self.date_range) {
            (Some(_), Some(_)) => Ok(SearchMode::Combined),
            (Some(_), None) => Ok(SearchMode::Content),
            (None, Some(_)) => Ok(SearchMode::DateRange),
            (None, None) => Err(QueryError::InvalidQuery(
                "a query needs search text, a date range, or both".to_string(),
            )),
        }
    }
}

/// Parse optional CLI-style date bounds into a range.
///
/// No bounds means no date filter.
///
/// # Errors
/// Returns `QueryError::InvalidQuery` if only one bound is given and
/// `QueryError::InvalidRange` if a bound is malformed or `start > end`.
pub fn parse_date_bounds(start: Option<&str>, end: Option<&str>) -> QueryResult<Option<DateRange>> {
    match (start, end) {
        (Some(start), Some(end)) => Ok(Some(DateRange::parse(start, end)?)),
        (None, None) => Ok(None),
        _ => Err(QueryError::InvalidQuery(
            "a date range needs both a start and an end date".to_string(),
        )),
    }
}

/// Trait for search and ranking engines.
#[async_trait]
pub trait SearchEngine: Send + Sync {
    /// Execute a search query and return ranked results.
    ///
    /// An empty result list is a successful search.
    async fn search(&self, query: &SearchQuery) -> QueryResult<Vec<SearchResult>>;
}

/// Retrieval over one loaded index pairing and an article store.
///
/// The engine holds no mutable state; concurrent queries share the index
/// through the `Arc`.
pub struct RetrievalEngine<S, V>
where
    S: ArticleStorage,
    V: Vectorizer,
{
    index: Arc<LoadedIndex>,
    storage: S,
    vectorizer: V,
    oversample: usize,
}

impl<S, V> RetrievalEngine<S, V>
where
    S: ArticleStorage,
    V: Vectorizer,
{
    pub fn new(index: Arc<LoadedIndex>, storage: S, vectorizer: V) -> Self {
        Self {
            index,
            storage,
            vectorizer,
            oversample: DEFAULT_OVERSAMPLE,
        }
    }

    /// Engine over the pairing cached for `paths`, loading it on first use.
    ///
    /// # Errors
    /// Returns `QueryError::IndexUnavailable` if the index files are missing,
    /// corrupt or do not belong together.
    pub fn from_cache(
        cache: &IndexCache,
        paths: &IndexPaths,
        storage: S,
        vectorizer: V,
    ) -> QueryResult<Self> {
        let index = cache
            .get_or_load(paths)
            .map_err(|e| QueryError::IndexUnavailable(e.to_string()))?;
        Ok(Self::new(index, storage, vectorizer))
    }

    /// Set how many times `k` candidates a combined search fetches before
    /// date filtering. Values below 1 are treated as 1.
    pub fn with_oversample(mut self, oversample: usize) -> Self {
        self.oversample = oversample.max(1);
        self
    }

    /// The index pairing this engine searches.
    pub fn index(&self) -> &Arc<LoadedIndex> {
        &self.index
    }

    /// The `k` articles nearest to `query`, nearest first.
    ///
    /// The vectorizer is refit on the current metadata corpus for every call,
    /// so the query space only matches the index space when the corpus has not
    /// changed since the build.
    pub async fn search_by_content(&self, query: &str, k: usize) -> QueryResult<Vec<SearchResult>> {
        validate_k(k)?;
        let query = normalize_text(query);
        if query.is_empty() {
            return Err(QueryError::InvalidQuery("search text is empty".to_string()));
        }
        self.semantic_search(&query, k)
    }

    /// Articles dated inside `range`, newest first, at most `k`.
    pub async fn search_by_date(&self, range: &DateRange, k: usize) -> QueryResult<Vec<SearchResult>> {
        validate_k(k)?;
        let articles = date_filter::search_by_date(&self.storage, range, Some(k))
            .await
            .map_err(|e| QueryError::StorageError(e.to_string()))?;
        Ok(articles.into_iter().map(SearchResult::from).collect())
    }

    /// Content search restricted to articles dated inside `range`.
    ///
    /// Fetches `oversample * k` semantic candidates once and keeps the ones in
    /// range; fewer than `k` results are returned when filtering removes more
    /// than the oversample absorbs.
    pub async fn search_combined(
        &self,
        query: &str,
        range: &DateRange,
        k: usize,
    ) -> QueryResult<Vec<SearchResult>> {
        validate_k(k)?;
        let query = normalize_text(query);
        if query.is_empty() {
            return Err(QueryError::InvalidQuery("search text is empty".to_string()));
        }

        let candidates = self.semantic_search(&query, k.saturating_mul(self.oversample))?;
        let valid_dates = date_filter::dates_within(&self.storage, range)
            .await
            .map_err(|e| QueryError::StorageError(e.to_string()))?;

        let candidate_count = candidates.len();
        let results: Vec<SearchResult> = candidates
            .into_iter()
            .filter_map(|mut result| {
                let date = valid_dates.get(&result.id)?;
                result.date = Some(date.clone());
                Some(result)
            })
            .take(k)
            .collect();

        debug!(
            "Combined search kept {} of {} candidates",
            results.len(),
            candidate_count
        );
        Ok(results)
    }

    fn semantic_search(&self, query: &str, k: usize) -> QueryResult<Vec<SearchResult>> {
        let metadata = self.index.metadata();
        if metadata.is_empty() {
            return Ok(Vec::new());
        }

        let fitted = self
            .vectorizer
            .fit(&metadata.documents())
            .map_err(|e| QueryError::EmbeddingError(e.to_string()))?;

        let dimension = self.index.index().dimension();
        if fitted.dimension() != dimension {
            warn!(
                "Query vectorizer has {} features but the index has {}; reconciling",
                fitted.dimension(),
                dimension
            );
        }
        let query_vector = reconcile_dimension(fitted.transform(query), dimension);

        let neighbors = self
            .index
            .index()
            .search(&query_vector, k)
            .map_err(|e| QueryError::IndexError(e.to_string()))?;

        neighbors
            .into_iter()
            .map(|neighbor| {
                let record = metadata
                    .get(neighbor.row)
                    .map_err(|e| QueryError::IndexError(e.to_string()))?;
                Ok(SearchResult::from_record(record, neighbor.distance))
            })
            .collect()
    }
}

fn validate_k(k: usize) -> QueryResult<()> {
    if k == 0 {
        return Err(QueryError::InvalidQuery(
            "number of results must be at least 1".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl<S, V> SearchEngine for RetrievalEngine<S, V>
where
    S: ArticleStorage,
    V: Vectorizer,
{
    async fn search(&self, query: &SearchQuery) -> QueryResult<Vec<SearchResult>> {
        match (query.mode()?, &query.text, &query.date_range) {
            (SearchMode::Combined, Some(text), Some(range)) => {
                self.search_combined(text, range, query.top_k).await
            }
            (SearchMode::DateRange, _, Some(range)) => self.search_by_date(range, query.top_k).await,
            (_, Some(text), _) => self.search_by_content(text, query.top_k).await,
            _ => Err(QueryError::InvalidQuery(
                "a query needs search text, a date range, or both".to_string(),
            )),
        }
    }
}
