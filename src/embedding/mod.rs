//! Text vectorization.
//!
//! This module defines the interface for turning article text into fixed-length
//! vectors and provides a lexical TF-IDF implementation.
//!
//! Fitting and transforming are split into two traits: a [`Vectorizer`] holds only
//! configuration and produces an owned [`FittedVectorizer`] for one corpus. A fitted
//! model is never mutated after `fit`, so concurrent queries can each fit their own
//! model without sharing state.

pub mod reconcile;
pub mod stop_words;
pub mod tfidf;

use thiserror::Error;

pub use reconcile::reconcile_dimension;
pub use tfidf::{FittedTfidf, TfidfVectorizer};

/// Errors that can occur while fitting a vectorizer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbeddingError {
    /// `fit` was called with no documents
    #[error("cannot fit a vectorizer on an empty corpus")]
    EmptyCorpus,

    /// Every token in the corpus was a stop-word or too short
    #[error("empty vocabulary: the corpus contains no indexable terms")]
    EmptyVocabulary,

    /// Invalid vectorizer configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// A vectorizer configuration that can be fit on a corpus.
///
/// Fitting is corpus-dependent: the vocabulary and weights are computed anew on
/// every call, so two fits on different corpora produce vectors in different
/// spaces.
pub trait Vectorizer: Send + Sync {
    /// The model produced by fitting.
    type Fitted: FittedVectorizer;

    /// Fit the model on `documents`.
    ///
    /// # Errors
    /// Returns `EmbeddingError::EmptyCorpus` if `documents` is empty and
    /// `EmbeddingError::EmptyVocabulary` if no terms survive tokenization.
    fn fit(&self, documents: &[String]) -> EmbeddingResult<Self::Fitted>;
}

/// A vectorizer that has been fit on a corpus.
pub trait FittedVectorizer: Send + Sync {
    /// Project `text` into the fitted vector space.
    ///
    /// The returned vector always has [`dimension`](Self::dimension) components.
    fn transform(&self, text: &str) -> Vec<f32>;

    /// Length of every vector this model produces.
    fn dimension(&self) -> usize;
}

/// Normalizes query text before vectorizing.
///
/// Lowercases, trims and collapses runs of whitespace into a single space.
///
/// # Example
/// ```ignore
/// let normalized = normalize_text("  Breast   Cancer  ");
/// assert_eq!(normalized, "breast cancer");
/// ```
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("Hello World"), "hello world");
        assert_eq!(normalize_text("  Multiple   Spaces  "), "multiple spaces");
        assert_eq!(normalize_text("UPPERCASE"), "uppercase");
        assert_eq!(normalize_text("   "), "");
    }
}
