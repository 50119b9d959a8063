//! Core data models for the article search system.
//!
//! This module contains the fundamental data structures shared across the crate:
//! articles as stored by ingestion, the denormalized metadata records persisted
//! next to the vector index, and the results returned to callers.

use serde::{Deserialize, Serialize};

/// A research article as held by the article store.
///
/// Articles are created by the ingestion collaborator and are read-only to the
/// retrieval core. The identifier is assigned by the store and stays stable
/// across index rebuilds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Unique identifier (database primary key, `None` before insertion)
    #[serde(default)]
    pub id: Option<i64>,

    /// Article title
    pub title: String,

    /// Author list as free text (e.g. "A. Smith, B. Jones")
    #[serde(default)]
    pub authors: Option<String>,

    /// Abstract text, absent for some scraped articles
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,

    /// Publication date as scraped (ISO-8601 date or timestamp)
    #[serde(default)]
    pub pub_date: Option<String>,

    /// Source URL, unique across the store
    pub url: String,
}

impl Article {
    /// Text used for vectorizing this article: title and abstract joined by a space.
    pub fn document_text(&self) -> String {
        document_text(&self.title, self.abstract_text.as_deref())
    }
}

/// Joins a title and an optional abstract into the text the vectorizer sees.
pub fn document_text(title: &str, abstract_text: Option<&str>) -> String {
    format!("{} {}", title, abstract_text.unwrap_or(""))
}

/// Denormalized projection of an [`Article`] persisted alongside the index.
///
/// Position `i` in the metadata sidecar describes row `i` of the vector index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataRecord {
    pub id: i64,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
}

impl MetadataRecord {
    pub fn document_text(&self) -> String {
        document_text(&self.title, self.abstract_text.as_deref())
    }
}

/// An article paired with its original publication date string.
///
/// Produced by the date filter; the date text is returned exactly as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct DatedArticle {
    pub id: i64,
    pub title: String,
    pub abstract_text: Option<String>,
    pub pub_date: String,
}

/// Relevance classification for content-ranked results.
///
/// Derived from the distance via the similarity `1 / (1 + distance)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RelevanceLevel {
    /// Similarity above 0.5
    HighlyRelevant,

    /// Similarity above 0.3
    Relevant,

    /// Anything further away
    SomewhatRelated,
}

impl RelevanceLevel {
    /// Classify a non-negative distance.
    pub fn from_distance(distance: f32) -> Self {
        let similarity = 1.0 / (1.0 + distance);
        if similarity > 0.5 {
            RelevanceLevel::HighlyRelevant
        } else if similarity > 0.3 {
            RelevanceLevel::Relevant
        } else {
            RelevanceLevel::SomewhatRelated
        }
    }
}

/// A single search result.
///
/// Ephemeral: built per query and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    /// Identifier of the matching article
    pub id: i64,

    /// Article title
    pub title: String,

    /// Abstract text, if any
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    /// Euclidean distance to the query vector (0 when no semantic ranking ran)
    pub distance: f32,

    /// Publication date, set for date-only and combined searches
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl SearchResult {
    /// Build a result from a metadata record and its distance to the query.
    pub fn from_record(record: &MetadataRecord, distance: f32) -> Self {
        Self {
            id: record.id,
            title: record.title.clone(),
            abstract_text: record.abstract_text.clone(),
            distance,
            date: None,
        }
    }

    /// Relevance class of this result's distance.
    pub fn relevance(&self) -> RelevanceLevel {
        RelevanceLevel::from_distance(self.distance)
    }

    /// Abstract text for display, with a placeholder when absent.
    pub fn abstract_or_placeholder(&self) -> &str {
        self.abstract_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or("No abstract available")
    }
}

impl From<DatedArticle> for SearchResult {
    fn from(article: DatedArticle) -> Self {
        Self {
            id: article.id,
            title: article.title,
            abstract_text: article.abstract_text,
            distance: 0.0,
            date: Some(article.pub_date),
        }
    }
}

/// Summary of how many stored articles carry a publication date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateCoverage {
    /// Articles with a non-empty `pub_date`
    pub with_dates: usize,

    /// All articles in the store
    pub total: usize,

    /// A few `(title, pub_date)` pairs for eyeballing date formats
    pub samples: Vec<(String, String)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_text_with_and_without_abstract() {
        assert_eq!(document_text("Title", Some("Body")), "Title Body");
        assert_eq!(document_text("Title", None), "Title ");
    }

    #[test]
    fn test_article_json_uses_abstract_key() {
        let json = r#"{"title":"T","abstract":"A","pub_date":"2020-01-01","url":"https://x/1"}"#;
        let article: Article = serde_json::from_str(json).unwrap();
        assert_eq!(article.abstract_text.as_deref(), Some("A"));
        assert_eq!(article.id, None);
        assert_eq!(article.authors, None);
    }

    #[test]
    fn test_dated_article_converts_with_zero_distance() {
        let result: SearchResult = DatedArticle {
            id: 7,
            title: "T".to_string(),
            abstract_text: None,
            pub_date: "2021-06-01".to_string(),
        }
        .into();
        assert_eq!(result.distance, 0.0);
        assert_eq!(result.date.as_deref(), Some("2021-06-01"));
        assert_eq!(result.abstract_or_placeholder(), "No abstract available");
    }

    #[test]
    fn test_relevance_level_from_distance() {
        assert_eq!(RelevanceLevel::from_distance(0.0), RelevanceLevel::HighlyRelevant);
        assert_eq!(RelevanceLevel::from_distance(0.9), RelevanceLevel::HighlyRelevant);
        assert_eq!(RelevanceLevel::from_distance(1.5), RelevanceLevel::Relevant);
        assert_eq!(RelevanceLevel::from_distance(3.0), RelevanceLevel::SomewhatRelated);
    }
}
