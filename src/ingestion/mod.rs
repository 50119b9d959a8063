//! Offline ingestion and index build pipeline.
//!
//! Two steps feed the retrieval core:
//!
//! 1. [`ArticleIngestion`] stores articles from a provider, skipping any whose
//!    source URL is already present.
//! 2. [`IndexBuilder`] reads the corpus snapshot, fits the vectorizer, builds the
//!    vector index and metadata store in one pass, and persists both.
//!
//! ```ignore
//! use article_search::embedding::TfidfVectorizer;
//! use article_search::index::IndexPaths;
//! use article_search::ingestion::{ArticleIngestion, IndexBuilder};
//! use article_search::provider::json::JsonFileProvider;
//! use article_search::storage::sqlite::SqliteStorage;
//!
//! let storage = SqliteStorage::open("oncology_articles.db")?;
//! let mut ingestion = ArticleIngestion::initialize(storage).await?;
//! let stats = ingestion
//!     .ingest_from_provider(&JsonFileProvider::new("articles.json"))
//!     .await?;
//! println!("Inserted: {}, Duplicates: {}", stats.inserted, stats.duplicates_skipped);
//!
//! let builder = IndexBuilder::new(TfidfVectorizer::default());
//! let paths = IndexPaths::new("faiss_index.index", "faiss_metadata.json");
//! let (_, report) = builder.build_and_save(ingestion.storage(), &paths).await?;
//! println!("{} rows of dimension {}", report.rows, report.dimension);
//! ```
//!
//! Rebuilds are offline and single-writer: the new pairing is only visible to
//! queries once it is saved and reloaded, or swapped into an
//! [`IndexCache`](crate::index::IndexCache).

use thiserror::Error;
use tracing::{info, warn};

use crate::embedding::{EmbeddingError, FittedVectorizer, Vectorizer};
use crate::index::{IndexError, IndexPaths, LoadedIndex};
use crate::models::Article;
use crate::provider::{ArticleProvider, ProviderError};
use crate::storage::{ArticleStorage, InsertOutcome};

/// Errors that can occur during ingestion or index building.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The article store holds no articles to index
    #[error("no articles found to index")]
    EmptyCorpus,

    /// Vectorizer fitting failed
    #[error("Embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    /// Index construction or persistence failed
    #[error("Index error: {0}")]
    IndexError(#[from] IndexError),

    /// Storage operation failed
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Provider operation failed
    #[error("Provider error: {0}")]
    ProviderError(#[from] ProviderError),
}

/// Result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Statistics from an ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestionStats {
    /// Total number of input articles processed
    pub total_processed: usize,

    /// Number of articles successfully inserted
    pub inserted: usize,

    /// Number of articles skipped because their URL was already stored
    pub duplicates_skipped: usize,

    /// Number of articles that failed to process
    pub failed: usize,
}

impl IngestionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_inserted(&mut self) {
        self.total_processed += 1;
        self.inserted += 1;
    }

    pub fn record_duplicate(&mut self) {
        self.total_processed += 1;
        self.duplicates_skipped += 1;
    }

    pub fn record_failed(&mut self) {
        self.total_processed += 1;
        self.failed += 1;
    }
}

/// Writes provider articles into the article store.
pub struct ArticleIngestion<S>
where
    S: ArticleStorage,
{
    storage: S,
}

impl<S> ArticleIngestion<S>
where
    S: ArticleStorage,
{
    /// Initialize the storage schema and prepare for ingestion.
    pub async fn initialize(mut storage: S) -> IngestionResult<Self> {
        storage
            .initialize()
            .await
            .map_err(|e| IngestionError::StorageError(e.to_string()))?;
        Ok(Self { storage })
    }

    /// Insert every article in `articles`.
    ///
    /// Articles without a title or URL, and articles whose insert fails, are
    /// counted as failed and do not stop the batch.
    pub async fn ingest_batch(&mut self, articles: &[Article]) -> IngestionStats {
        let mut stats = IngestionStats::new();

        for article in articles {
            if article.title.trim().is_empty() || article.url.trim().is_empty() {
                warn!("Skipping article without title or URL: {:?}", article.url);
                stats.record_failed();
                continue;
            }

            match self.storage.insert_article(article).await {
                Ok(InsertOutcome::Inserted(_)) => stats.record_inserted(),
                Ok(InsertOutcome::Duplicate) => stats.record_duplicate(),
                Err(e) => {
                    warn!("Failed to insert article '{}': {}", article.title, e);
                    stats.record_failed();
                }
            }
        }

        stats
    }

    /// Fetch articles from `provider` and insert them.
    pub async fn ingest_from_provider<P>(&mut self, provider: &P) -> IngestionResult<IngestionStats>
    where
        P: ArticleProvider,
    {
        let articles = provider.fetch_articles().await?;
        info!("Ingesting {} articles from {}", articles.len(), provider.name());
        Ok(self.ingest_batch(&articles).await)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

/// Summary of an index build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    /// Number of indexed articles
    pub rows: usize,

    /// Dimensionality of the built index
    pub dimension: usize,
}

/// Builds the vector index and metadata store from the article store.
pub struct IndexBuilder<V>
where
    V: Vectorizer,
{
    vectorizer: V,
}

impl<V> IndexBuilder<V>
where
    V: Vectorizer,
{
    pub fn new(vectorizer: V) -> Self {
        Self { vectorizer }
    }

    /// Fit the vectorizer on the corpus snapshot and build the pairing.
    ///
    /// # Errors
    /// Returns `IngestionError::EmptyCorpus` if the store has no articles.
    pub async fn build<S>(&self, storage: &S) -> IngestionResult<(LoadedIndex, BuildReport)>
    where
        S: ArticleStorage + ?Sized,
    {
        let snapshot = storage
            .get_all_articles()
            .await
            .map_err(|e| IngestionError::StorageError(e.to_string()))?;
        if snapshot.is_empty() {
            return Err(IngestionError::EmptyCorpus);
        }
        info!("Found {} articles to index", snapshot.len());

        let documents: Vec<String> = snapshot.iter().map(Article::document_text).collect();
        let fitted = self.vectorizer.fit(&documents)?;
        let loaded = LoadedIndex::build(&snapshot, &fitted)?;

        let report = BuildReport {
            rows: loaded.index().len(),
            dimension: fitted.dimension(),
        };
        info!(
            "Created {} vectors of dimension {}",
            report.rows, report.dimension
        );
        Ok((loaded, report))
    }

    /// Build the pairing and persist it to `paths`.
    pub async fn build_and_save<S>(
        &self,
        storage: &S,
        paths: &IndexPaths,
    ) -> IngestionResult<(LoadedIndex, BuildReport)>
    where
        S: ArticleStorage + ?Sized,
    {
        let (loaded, report) = self.build(storage).await?;
        loaded.save(paths)?;
        Ok((loaded, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::TfidfVectorizer;
    use crate::models::{DateCoverage, DatedArticle};
    use crate::storage::sqlite::SqliteStorage;
    use crate::storage::{StorageError, StorageResult};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    // ===== Mock Implementations =====

    /// Mock storage that fails inserts for titles containing a marker.
    #[derive(Clone, Default)]
    struct MockStorage {
        state: Arc<Mutex<MockStorageState>>,
    }

    #[derive(Default)]
    struct MockStorageState {
        articles: Vec<Article>,
        initialized: bool,
        fail_on_title: Option<String>,
    }

    impl MockStorage {
        fn fail_insert_on_title(self, title: &str) -> Self {
            self.state.lock().unwrap().fail_on_title = Some(title.to_string());
            self
        }

        fn is_initialized(&self) -> bool {
            self.state.lock().unwrap().initialized
        }
    }

    #[async_trait]
    impl ArticleStorage for MockStorage {
        async fn initialize(&mut self) -> StorageResult<()> {
            self.state.lock().unwrap().initialized = true;
            Ok(())
        }

        async fn insert_article(&mut self, article: &Article) -> StorageResult<InsertOutcome> {
            let mut state = self.state.lock().unwrap();
            if let Some(ref fail_title) = state.fail_on_title {
                if article.title.contains(fail_title) {
                    return Err(StorageError::QueryError(format!(
                        "Mock insert failure for title containing '{}'",
                        fail_title
                    )));
                }
            }
            if state.articles.iter().any(|a| a.url == article.url) {
                return Ok(InsertOutcome::Duplicate);
            }
            let id = state.articles.len() as i64 + 1;
            let mut stored = article.clone();
            stored.id = Some(id);
            state.articles.push(stored);
            Ok(InsertOutcome::Inserted(id))
        }

        async fn get_all_articles(&self) -> StorageResult<Vec<Article>> {
            Ok(self.state.lock().unwrap().articles.clone())
        }

        async fn get_dated_articles(&self) -> StorageResult<Vec<DatedArticle>> {
            Ok(Vec::new())
        }

        async fn count_articles(&self) -> StorageResult<usize> {
            Ok(self.state.lock().unwrap().articles.len())
        }

        async fn date_coverage(&self, _sample_size: usize) -> StorageResult<DateCoverage> {
            Ok(DateCoverage {
                with_dates: 0,
                total: self.state.lock().unwrap().articles.len(),
                samples: Vec::new(),
            })
        }
    }

    /// Mock article provider for testing.
    struct MockArticleProvider {
        articles: Vec<Article>,
        should_fail: bool,
    }

    #[async_trait]
    impl ArticleProvider for MockArticleProvider {
        async fn fetch_articles(&self) -> Result<Vec<Article>, ProviderError> {
            if self.should_fail {
                return Err(ProviderError::ParseError("Mock provider failure".to_string()));
            }
            Ok(self.articles.clone())
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn create_test_article(title: &str, url: &str) -> Article {
        Article {
            id: None,
            title: title.to_string(),
            authors: None,
            abstract_text: Some(format!("Abstract about {}", title.to_lowercase())),
            pub_date: Some("2020-01-01".to_string()),
            url: url.to_string(),
        }
    }

    // ===== Tests =====

    #[tokio::test]
    async fn test_initialize_calls_storage_initialize() {
        let storage = MockStorage::default();
        let ingestion = ArticleIngestion::initialize(storage.clone()).await.unwrap();
        assert!(storage.is_initialized());
        assert_eq!(ingestion.storage().count_articles().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_stats_mixed_outcomes() {
        let storage = MockStorage::default().fail_insert_on_title("Broken");
        let mut ingestion = ArticleIngestion::initialize(storage).await.unwrap();

        let stats = ingestion
            .ingest_batch(&[
                create_test_article("Tumor growth", "https://x/1"),
                create_test_article("Tumor growth again", "https://x/1"),
                create_test_article("Broken record", "https://x/2"),
                create_test_article("", "https://x/3"),
                create_test_article("Immune response", "https://x/4"),
            ])
            .await;

        assert_eq!(
            stats,
            IngestionStats {
                total_processed: 5,
                inserted: 2,
                duplicates_skipped: 1,
                failed: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_stats_record_methods() {
        let mut stats = IngestionStats::new();
        stats.record_inserted();
        stats.record_duplicate();
        stats.record_failed();
        assert_eq!(stats.total_processed, 3);
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.duplicates_skipped, 1);
        assert_eq!(stats.failed, 1);
    }

    #[tokio::test]
    async fn test_ingest_from_provider_error() {
        let mut ingestion = ArticleIngestion::initialize(MockStorage::default()).await.unwrap();
        let provider = MockArticleProvider {
            articles: Vec::new(),
            should_fail: true,
        };
        assert!(matches!(
            ingestion.ingest_from_provider(&provider).await,
            Err(IngestionError::ProviderError(_))
        ));
    }

    #[tokio::test]
    async fn test_build_on_empty_store_fails() {
        let builder = IndexBuilder::new(TfidfVectorizer::default());
        assert!(matches!(
            builder.build(&MockStorage::default()).await,
            Err(IngestionError::EmptyCorpus)
        ));
    }

    #[tokio::test]
    async fn test_ingest_build_and_search_end_to_end() {
        let mut ingestion = ArticleIngestion::initialize(SqliteStorage::in_memory().unwrap())
            .await
            .unwrap();
        let provider = MockArticleProvider {
            articles: vec![
                create_test_article("Breast cancer immunotherapy", "https://x/1"),
                create_test_article("Soil chemistry", "https://x/2"),
                create_test_article("Lung tumor imaging", "https://x/3"),
            ],
            should_fail: false,
        };
        let stats = ingestion.ingest_from_provider(&provider).await.unwrap();
        assert_eq!(stats.inserted, 3);

        let dir = tempfile::tempdir().unwrap();
        let paths = IndexPaths::new(dir.path().join("e.index"), dir.path().join("e.json"));
        let builder = IndexBuilder::new(TfidfVectorizer::default());
        let (built, report) = builder.build_and_save(ingestion.storage(), &paths).await.unwrap();

        assert_eq!(report.rows, 3);
        assert_eq!(report.dimension, built.index().dimension());

        let loaded = LoadedIndex::load(&paths).unwrap();
        assert_eq!(loaded, built);

        // Searching with a stored row returns that row first at distance 0
        let row = loaded.index().vector(2).unwrap().to_vec();
        let hits = loaded.index().search(&row, 1).unwrap();
        assert_eq!(hits[0].row, 2);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(loaded.metadata().get(2).unwrap().title, "Lung tumor imaging");
    }
}
