//! Runtime settings.
//!
//! Settings are layered: built-in defaults, then an optional configuration file
//! (format inferred from its extension), then environment variables with the
//! `ARTICLE_SEARCH_` prefix, e.g. `ARTICLE_SEARCH_TOP_K=10`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::embedding::tfidf::DEFAULT_MAX_FEATURES;
use crate::index::IndexPaths;
use crate::query::DEFAULT_OVERSAMPLE;

pub const DEFAULT_DB_PATH: &str = "oncology_articles.db";
pub const DEFAULT_INDEX_PATH: &str = "faiss_index.index";
pub const DEFAULT_METADATA_PATH: &str = "faiss_metadata.json";
pub const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Settings {
    /// Article store database file
    pub db_path: PathBuf,
    /// Persisted vector index file
    pub index_path: PathBuf,
    /// Persisted metadata JSON file
    pub metadata_path: PathBuf,
    /// Vocabulary cap for the vectorizer
    pub max_features: usize,
    pub top_k: usize,
    /// Candidate multiplier for combined searches
    pub oversample: usize,
}

impl Settings {
    /// Load settings, optionally reading `path` if it exists.
    pub fn load(path: Option<&Path>) -> Result<Settings, config::ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("db_path", DEFAULT_DB_PATH)?
            .set_default("index_path", DEFAULT_INDEX_PATH)?
            .set_default("metadata_path", DEFAULT_METADATA_PATH)?
            .set_default("max_features", DEFAULT_MAX_FEATURES as u64)?
            .set_default("top_k", DEFAULT_TOP_K as u64)?
            .set_default("oversample", DEFAULT_OVERSAMPLE as u64)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix("ARTICLE_SEARCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize::<Settings>()
    }

    /// Index and metadata paths as one pairing key.
    pub fn index_paths(&self) -> IndexPaths {
        IndexPaths::new(self.index_path.clone(), self.metadata_path.clone())
    }
}
