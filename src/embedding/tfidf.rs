//! TF-IDF vectorizer.
//!
//! Terms are lowercase runs of at least two alphanumeric (or `_`) characters with
//! English stop-words removed. Each document is weighted by raw term count times
//! the smoothed inverse document frequency `ln((1 + n) / (1 + df)) + 1` and then
//! L2-normalized. When the vocabulary is larger than the feature cap, only the
//! terms with the highest corpus-wide counts are kept. Columns are in
//! alphabetical term order.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::stop_words::is_stop_word;
use super::{EmbeddingError, EmbeddingResult, FittedVectorizer, Vectorizer};

/// Default feature cap, matching the dimensionality of persisted indexes.
pub const DEFAULT_MAX_FEATURES: usize = 768;

/// TF-IDF configuration.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    max_features: usize,
}

impl TfidfVectorizer {
    /// Create a vectorizer that keeps at most `max_features` terms.
    pub fn new(max_features: usize) -> Self {
        Self { max_features }
    }
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FEATURES)
    }
}

/// Split text into lowercase terms, dropping stop-words and single characters.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|token| !is_stop_word(token))
}

impl Vectorizer for TfidfVectorizer {
    type Fitted = FittedTfidf;

    fn fit(&self, documents: &[String]) -> EmbeddingResult<FittedTfidf> {
        if documents.is_empty() {
            return Err(EmbeddingError::EmptyCorpus);
        }
        if self.max_features == 0 {
            return Err(EmbeddingError::ConfigError(
                "max_features must be greater than zero".to_string(),
            ));
        }

        // term -> (corpus-wide count, document frequency)
        let mut stats: BTreeMap<String, (usize, usize)> = BTreeMap::new();
        for document in documents {
            let mut counts: HashMap<String, usize> = HashMap::new();
            for term in tokenize(document) {
                *counts.entry(term).or_insert(0) += 1;
            }
            for (term, count) in counts {
                let entry = stats.entry(term).or_insert((0, 0));
                entry.0 += count;
                entry.1 += 1;
            }
        }

        if stats.is_empty() {
            return Err(EmbeddingError::EmptyVocabulary);
        }

        let mut terms: Vec<(String, usize, usize)> = stats
            .into_iter()
            .map(|(term, (count, df))| (term, count, df))
            .collect();

        if terms.len() > self.max_features {
            // BTreeMap order is alphabetical and sort_by is stable, so ties stay alphabetical
            terms.sort_by(|a, b| b.1.cmp(&a.1));
            terms.truncate(self.max_features);
            terms.sort_by(|a, b| a.0.cmp(&b.0));
        }

        let n = documents.len() as f32;
        let mut vocabulary = HashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (column, (term, _, df)) in terms.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df as f32)).ln() + 1.0);
            vocabulary.insert(term, column);
        }

        debug!(
            "Fitted TF-IDF on {} documents with {} features",
            documents.len(),
            idf.len()
        );

        Ok(FittedTfidf { vocabulary, idf })
    }
}

/// A TF-IDF model fit on one corpus.
#[derive(Debug, Clone)]
pub struct FittedTfidf {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
}

impl FittedTfidf {
    /// Column assigned to `term`, if it is in the fitted vocabulary.
    pub fn column(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }
}

impl FittedVectorizer for FittedTfidf {
    fn transform(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.idf.len()];
        for term in tokenize(text) {
            if let Some(&column) = self.vocabulary.get(&term) {
                vector[column] += 1.0;
            }
        }
        for (weight, idf) in vector.iter_mut().zip(&self.idf) {
            *weight *= idf;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for weight in vector.iter_mut() {
                *weight /= norm;
            }
        }
        vector
    }

    fn dimension(&self) -> usize {
        self.idf.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_tokenize_drops_stop_words_and_short_tokens() {
        let tokens: Vec<String> = tokenize("The T-cell response, in a Tumor!").collect();
        assert_eq!(tokens, vec!["cell", "response", "tumor"]);
    }

    #[test]
    fn test_fit_empty_corpus_fails() {
        let err = TfidfVectorizer::default().fit(&[]).unwrap_err();
        assert_eq!(err, EmbeddingError::EmptyCorpus);
    }

    #[test]
    fn test_fit_stop_words_only_fails() {
        let err = TfidfVectorizer::default()
            .fit(&corpus(&["the and of", "a"]))
            .unwrap_err();
        assert_eq!(err, EmbeddingError::EmptyVocabulary);
    }

    #[test]
    fn test_columns_are_alphabetical() {
        let fitted = TfidfVectorizer::default()
            .fit(&corpus(&["zebra apple", "mango"]))
            .unwrap();
        assert_eq!(fitted.dimension(), 3);
        assert_eq!(fitted.column("apple"), Some(0));
        assert_eq!(fitted.column("mango"), Some(1));
        assert_eq!(fitted.column("zebra"), Some(2));
    }

    #[test]
    fn test_feature_cap_keeps_most_frequent_terms() {
        let fitted = TfidfVectorizer::new(2)
            .fit(&corpus(&["tumor tumor tumor cell", "cell gene", "tumor"]))
            .unwrap();
        assert_eq!(fitted.dimension(), 2);
        assert!(fitted.column("tumor").is_some());
        assert!(fitted.column("cell").is_some());
        assert!(fitted.column("gene").is_none());
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let fitted = TfidfVectorizer::default()
            .fit(&corpus(&["cancer therapy", "cancer genome", "cancer cells"]))
            .unwrap();
        let vector = fitted.transform("cancer therapy");
        let cancer = vector[fitted.column("cancer").unwrap()];
        let therapy = vector[fitted.column("therapy").unwrap()];
        assert!(therapy > cancer);
        assert!(vector.iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_transform_is_unit_length_or_zero() {
        let fitted = TfidfVectorizer::default()
            .fit(&corpus(&["breast cancer immunotherapy", "unrelated topic"]))
            .unwrap();
        let vector = fitted.transform("immunotherapy for breast cancer");
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);

        let unknown = fitted.transform("nothing matches here");
        assert_eq!(unknown.len(), fitted.dimension());
        assert!(unknown.iter().all(|&w| w == 0.0));
    }
}
