//! Vector index and its pairing with the metadata store.
//!
//! A [`LoadedIndex`] holds a [`FlatIndex`] together with the [`MetadataStore`]
//! describing its rows. Both come from the same corpus snapshot and are replaced
//! together, never one at a time, so a query can't see rows from one build and
//! metadata from another. On disk the pairing is tied together by the metadata
//! fingerprint stored in the index header.

pub mod cache;
pub mod flat;
pub mod persist;

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::embedding::FittedVectorizer;
use crate::metadata::MetadataStore;
use crate::models::{Article, MetadataRecord};

pub use cache::IndexCache;
pub use flat::{FlatIndex, Neighbor};

/// Errors that can occur while building, loading or searching an index.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    /// A vector's length differs from the index dimensionality (fatal at build time)
    #[error("dimension mismatch at row {row}: expected {expected}, found {found}")]
    DimensionMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A query vector was not reconciled to the index dimensionality
    #[error("query has {found} components but the index has dimension {expected}")]
    QueryDimension { expected: usize, found: usize },

    /// A snapshot article has no identifier yet
    #[error("article at row {row} has no identifier")]
    MissingIdentifier { row: usize },

    /// Index file could not be read or written
    #[error("index IO error on {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    /// Index file is truncated or not an index file
    #[error("corrupt index file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// The persisted index or its metadata could not be loaded
    #[error("index unavailable ({path}): {reason}")]
    Unavailable { path: PathBuf, reason: String },
}

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Locations of a persisted index and its metadata sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexPaths {
    pub index: PathBuf,
    pub metadata: PathBuf,
}

impl IndexPaths {
    pub fn new(index: impl Into<PathBuf>, metadata: impl Into<PathBuf>) -> Self {
        Self {
            index: index.into(),
            metadata: metadata.into(),
        }
    }
}

/// A vector index together with the metadata for each of its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedIndex {
    index: FlatIndex,
    metadata: MetadataStore,
}

impl LoadedIndex {
    /// Build the index and metadata store from one pass over `snapshot`.
    ///
    /// Row `i` of both structures comes from `snapshot[i]`.
    ///
    /// # Errors
    /// Returns `IndexError::MissingIdentifier` for an article without an id and
    /// `IndexError::DimensionMismatch` if the vectorizer yields unequal lengths.
    pub fn build<F: FittedVectorizer>(snapshot: &[Article], fitted: &F) -> IndexResult<Self> {
        let mut vectors = Vec::with_capacity(snapshot.len());
        let mut records = Vec::with_capacity(snapshot.len());

        for (row, article) in snapshot.iter().enumerate() {
            let id = article.id.ok_or(IndexError::MissingIdentifier { row })?;
            vectors.push(fitted.transform(&article.document_text()));
            records.push(MetadataRecord {
                id,
                title: article.title.clone(),
                abstract_text: article.abstract_text.clone(),
            });
        }

        let index = FlatIndex::with_dimension(fitted.dimension(), vectors)?;
        debug!(
            "Built index with {} rows of dimension {}",
            index.len(),
            index.dimension()
        );

        Ok(Self {
            index,
            metadata: MetadataStore::new(records),
        })
    }

    /// Pair an existing index with its metadata.
    ///
    /// # Errors
    /// Returns `IndexError::Unavailable` if the row counts disagree.
    pub fn from_parts(index: FlatIndex, metadata: MetadataStore) -> IndexResult<Self> {
        if index.len() != metadata.len() {
            return Err(IndexError::Unavailable {
                path: PathBuf::new(),
                reason: format!(
                    "index has {} rows but metadata has {} records",
                    index.len(),
                    metadata.len()
                ),
            });
        }
        Ok(Self { index, metadata })
    }

    pub fn index(&self) -> &FlatIndex {
        &self.index
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    /// Write the index blob and the metadata sidecar.
    ///
    /// Both files are fully written to temporaries before either target is
    /// replaced, and the index header records the metadata fingerprint so a
    /// reader never accepts a half-replaced pairing.
    pub fn save(&self, paths: &IndexPaths) -> IndexResult<()> {
        let index = self.index.stage(&paths.index, self.metadata.fingerprint())?;
        let metadata = self
            .metadata
            .stage(&paths.metadata)
            .map_err(|e| IndexError::Io {
                path: paths.metadata.clone(),
                reason: e.to_string(),
            })?;

        for staged in [index, metadata] {
            let target = staged.target().to_path_buf();
            staged.commit().map_err(|e| persist::io_error(&target, e))?;
        }

        info!(
            "Saved index ({} rows) to {} and metadata to {}",
            self.index.len(),
            paths.index.display(),
            paths.metadata.display()
        );
        Ok(())
    }

    /// Load a persisted pairing.
    ///
    /// Any failure is reported as `IndexError::Unavailable`, including a
    /// row-count disagreement and an index whose recorded fingerprint does not
    /// match the metadata sidecar.
    pub fn load(paths: &IndexPaths) -> IndexResult<Self> {
        let (index, fingerprint) =
            FlatIndex::load(&paths.index).map_err(|e| unavailable(&paths.index, e))?;
        let metadata =
            MetadataStore::load(&paths.metadata).map_err(|e| unavailable(&paths.metadata, e))?;

        let loaded = Self::from_parts(index, metadata).map_err(|e| match e {
            IndexError::Unavailable { reason, .. } => IndexError::Unavailable {
                path: paths.metadata.clone(),
                reason,
            },
            other => other,
        })?;

        let expected = loaded.metadata.fingerprint();
        if fingerprint != expected {
            warn!(
                "Index {} does not belong to metadata {}",
                paths.index.display(),
                paths.metadata.display()
            );
            return Err(unavailable(
                &paths.metadata,
                format!(
                    "index fingerprint {:016x} does not match metadata fingerprint {:016x}",
                    fingerprint, expected
                ),
            ));
        }

        info!(
            "Loaded index with {} rows of dimension {}",
            loaded.index.len(),
            loaded.index.dimension()
        );
        Ok(loaded)
    }
}

fn unavailable(path: &Path, error: impl std::fmt::Display) -> IndexError {
    IndexError::Unavailable {
        path: path.to_path_buf(),
        reason: error.to_string(),
    }
}
