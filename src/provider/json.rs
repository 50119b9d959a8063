//! JSON file article provider.
//!
//! Reads a JSON array of articles, each an object with `title`, `url` and the
//! optional `authors`, `abstract` and `pub_date` fields.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use super::{ArticleProvider, ProviderError, ProviderResult};
use crate::models::Article;

/// Provider backed by a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileProvider {
    path: PathBuf,
    name: String,
}

impl JsonFileProvider {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("json:{}", path.display());
        Self { path, name }
    }

    /// Parse articles from JSON text.
    pub fn parse(contents: &str) -> ProviderResult<Vec<Article>> {
        serde_json::from_str(contents).map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl ArticleProvider for JsonFileProvider {
    async fn fetch_articles(&self) -> ProviderResult<Vec<Article>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let articles = Self::parse(&contents)?;
        info!("Read {} articles from {}", articles.len(), self.path.display());
        Ok(articles)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
