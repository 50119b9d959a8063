//! Exact publication-date range filtering.
//!
//! Dates are parsed from the text stored by ingestion. Articles whose date is
//! missing or unparseable never match a range, and never fail a query.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::models::DatedArticle;
use crate::storage::{ArticleStorage, StorageResult};

/// Errors that can occur when constructing a date range.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateRangeError {
    /// Start date is after the end date
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    /// Bound is not a `YYYY-MM-DD` date
    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Inclusive range of calendar dates with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// # Errors
    /// Returns `DateRangeError::InvalidRange` if `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start > end {
            return Err(DateRangeError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parse both bounds from `YYYY-MM-DD` text.
    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        let parse = |text: &str| {
            NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
                .map_err(|_| DateRangeError::InvalidDate(text.to_string()))
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Whether `date` lies in the closed interval.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether the stored date text parses to a date inside the interval.
    pub fn contains_text(&self, pub_date: &str) -> bool {
        parse_pub_date(pub_date).is_some_and(|date| self.contains(date))
    }
}

/// Calendar date of a stored publication date.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps and `YYYY-MM-DDTHH:MM:SS`.
/// Anything else yields `None`.
pub fn parse_pub_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.date_naive());
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|timestamp| timestamp.date())
}

/// Keep articles dated inside `range`, newest first, at most `limit` of them.
///
/// Articles on the same date keep identifier order.
pub fn filter_by_date(
    articles: Vec<DatedArticle>,
    range: &DateRange,
    limit: Option<usize>,
) -> Vec<DatedArticle> {
    let mut matching: Vec<(NaiveDate, DatedArticle)> = articles
        .into_iter()
        .filter_map(|article| {
            let date = parse_pub_date(&article.pub_date)?;
            range.contains(date).then_some((date, article))
        })
        .collect();

    matching.sort_by(|(a_date, a), (b_date, b)| b_date.cmp(a_date).then(a.id.cmp(&b.id)));
    if let Some(limit) = limit {
        matching.truncate(limit);
    }
    matching.into_iter().map(|(_, article)| article).collect()
}

/// Articles from `storage` dated inside `range`, newest first.
pub async fn search_by_date<S: ArticleStorage + ?Sized>(
    storage: &S,
    range: &DateRange,
    limit: Option<usize>,
) -> StorageResult<Vec<DatedArticle>> {
    let articles = storage.get_dated_articles().await?;
    Ok(filter_by_date(articles, range, limit))
}

/// Identifier to original date text for every stored article inside `range`.
pub async fn dates_within<S: ArticleStorage + ?Sized>(
    storage: &S,
    range: &DateRange,
) -> StorageResult<HashMap<i64, String>> {
    let articles = storage.get_dated_articles().await?;
    Ok(articles
        .into_iter()
        .filter(|article| range.contains_text(&article.pub_date))
        .map(|article| (article.id, article.pub_date))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dated(id: i64, pub_date: &str) -> DatedArticle {
        DatedArticle {
            id,
            title: format!("Article {}", id),
            abstract_text: None,
            pub_date: pub_date.to_string(),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_range_rejects_start_after_end() {
        assert_eq!(
            DateRange::parse("2021-12-31", "2021-01-01").unwrap_err(),
            DateRangeError::InvalidRange {
                start: ymd(2021, 12, 31),
                end: ymd(2021, 1, 1)
            }
        );
        assert!(DateRange::parse("2021-01-01", "2021-01-01").is_ok());
    }

    #[test]
    fn test_range_rejects_malformed_bounds() {
        assert_eq!(
            DateRange::parse("yesterday", "2021-01-01").unwrap_err(),
            DateRangeError::InvalidDate("yesterday".to_string())
        );
    }

    #[test]
    fn test_parse_pub_date_formats() {
        assert_eq!(parse_pub_date("2020-01-01"), Some(ymd(2020, 1, 1)));
        assert_eq!(parse_pub_date("2023-05-17T08:30:00Z"), Some(ymd(2023, 5, 17)));
        assert_eq!(parse_pub_date("2023-05-17T08:30:00+02:00"), Some(ymd(2023, 5, 17)));
        assert_eq!(parse_pub_date("2023-05-17T08:30:00"), Some(ymd(2023, 5, 17)));
        assert_eq!(parse_pub_date("17 May 2023"), None);
        assert_eq!(parse_pub_date(""), None);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let range = DateRange::parse("2021-01-01", "2021-12-31").unwrap();
        assert!(range.contains(ymd(2021, 1, 1)));
        assert!(range.contains(ymd(2021, 12, 31)));
        assert!(!range.contains(ymd(2020, 12, 31)));
        assert!(!range.contains(ymd(2022, 1, 1)));
    }

    #[test]
    fn test_filter_orders_newest_first_and_skips_bad_dates() {
        let range = DateRange::parse("2020-01-01", "2021-12-31").unwrap();
        let articles = vec![
            dated(1, "2020-01-01"),
            dated(2, "2021-06-01"),
            dated(3, "not a date"),
            dated(4, "2019-12-31"),
            dated(5, "2021-06-01T12:00:00Z"),
        ];
        let ids: Vec<i64> = filter_by_date(articles, &range, None)
            .iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec![2, 5, 1]);
    }

    #[test]
    fn test_filter_respects_limit() {
        let range = DateRange::parse("2020-01-01", "2020-12-31").unwrap();
        let articles = (1..=10).map(|i| dated(i, &format!("2020-03-{:02}", i))).collect();
        let result = filter_by_date(articles, &range, Some(3));
        assert_eq!(result.len(), 3);
        assert_eq!(result[0].pub_date, "2020-03-10");
    }

    #[test]
    fn test_membership_iff_parseable_date_in_range() {
        let range = DateRange::parse("2021-01-01", "2021-12-31").unwrap();
        let samples = ["2021-01-01", "2020-12-31", "2021-07-04T00:00:00Z", "garbage", "2022-01-01"];
        let articles: Vec<DatedArticle> = samples
            .iter()
            .enumerate()
            .map(|(i, d)| dated(i as i64, d))
            .collect();
        let kept: Vec<i64> = filter_by_date(articles.clone(), &range, None)
            .iter()
            .map(|a| a.id)
            .collect();
        for article in &articles {
            let expected = parse_pub_date(&article.pub_date).is_some_and(|d| range.contains(d));
            assert_eq!(kept.contains(&article.id), expected);
        }
    }
}
