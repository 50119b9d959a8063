//! Article Search - semantic and date-range retrieval over research articles.
//!
//! This library provides the retrieval core for a corpus of scraped articles:
//! lexical vectorization, a persisted flat vector index paired with a metadata
//! store, and exact publication-date filtering over the article database.
//!
//! # Architecture
//!
//! - **models**: Core data structures (Article, MetadataRecord, SearchResult, etc.)
//! - **embedding**: TF-IDF vectorization and dimension reconciliation
//! - **index**: Flat Euclidean index, its binary file format and the loaded-index cache
//! - **metadata**: Row-aligned article metadata persisted as JSON
//! - **storage**: Article persistence (SQLite-based)
//! - **query**: Content, date-range and combined retrieval
//! - **ingestion**: Offline article ingestion and index build
//! - **provider**: Article sources for ingestion
//! - **config**: Layered runtime settings
//!
//! # Workflow
//!
//! ## Offline Build
//!
//! 1. Insert scraped articles into the store, skipping known URLs
//! 2. Fit the vectorizer on every article's title and abstract
//! 3. Build the index and the metadata store in one pass
//! 4. Persist both files
//!
//! ## Online Search
//!
//! 1. Load the index pairing (cached across queries)
//! 2. Refit the vectorizer on the metadata corpus and vectorize the query
//! 3. Reconcile the query to the index dimension and rank by distance
//! 4. Optionally keep only articles dated inside a range
//!
//! # Example
//!
//! ```ignore
//! use article_search::{
//!     config::Settings,
//!     embedding::TfidfVectorizer,
//!     index::IndexCache,
//!     query::{RetrievalEngine, SearchEngine, SearchQuery},
//!     storage::sqlite::SqliteStorage,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load(None)?;
//!     let cache = IndexCache::default();
//!     let storage = SqliteStorage::open(&settings.db_path)?;
//!     let engine = RetrievalEngine::from_cache(
//!         &cache,
//!         &settings.index_paths(),
//!         storage,
//!         TfidfVectorizer::default(),
//!     )?;
//!
//!     let query = SearchQuery::new(Some("breast cancer".to_string()), Some(5), None);
//!     for result in engine.search(&query).await? {
//!         println!("{}: {:.4}", result.title, result.distance);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Public modules
pub mod config;
pub mod embedding;
pub mod index;
pub mod ingestion;
pub mod metadata;
pub mod models;
pub mod provider;
pub mod query;
pub mod storage;

// Re-export commonly used types at the crate root
pub use embedding::{FittedVectorizer, TfidfVectorizer, Vectorizer};
pub use index::{IndexCache, IndexPaths, LoadedIndex};
pub use models::{Article, MetadataRecord, RelevanceLevel, SearchResult};
pub use query::{DateRange, RetrievalEngine, SearchEngine, SearchQuery};
pub use storage::ArticleStorage;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
