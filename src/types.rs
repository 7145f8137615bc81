use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::registry::SourceDescriptor;
use crate::util::{normalize_title, truncate_chars};

/// Maximum description length carried on a [`NewsItem`]
pub const NEWS_DESCRIPTION_MAX_CHARS: usize = 300;

/// Number of hex characters kept from the id digest
const ID_HEX_LEN: usize = 16;

/// An item as produced by the feed parser or an API adapter, before scoring.
///
/// The engagement fields are only populated by API adapters; feed items
/// leave them as `None` and score zero on the social axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    /// Plain text, HTML already stripped
    pub description: String,
    /// Publication time; parse failures fall back to the fetch time
    pub published_at: DateTime<Utc>,
    pub author: Option<String>,
    /// Source-native identifier (API adapters only)
    pub native_id: Option<String>,
    pub points: Option<u64>,
    pub num_comments: Option<u64>,
    pub score: Option<i64>,
}

/// Sub-scores and weighted total computed by the scorer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub relevance: u32,
    pub credibility: f64,
    pub social: i64,
    pub recency: f64,
    pub total: f64,
}

/// A scored item as cached and returned to callers.
///
/// Serialized in camelCase to match the on-disk cache format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub date_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub source: String,
    pub source_icon: String,
    pub category: String,
    pub scores: Scores,
    pub is_relevant: bool,
}

impl NewsItem {
    /// Folds a raw item and its scores into a `NewsItem`.
    ///
    /// `is_relevant` is derived here from `relevance_threshold` so the
    /// flag can never disagree with the relevance sub-score.
    pub fn from_raw(
        raw: RawItem,
        source: &SourceDescriptor,
        scores: Scores,
        relevance_threshold: u32,
    ) -> Self {
        let id = news_id(&raw.title, &raw.link);
        let description = truncate_chars(&raw.description, NEWS_DESCRIPTION_MAX_CHARS).into_owned();

        Self {
            id,
            title: raw.title,
            description,
            url: raw.link,
            date: raw.published_at.format("%Y-%m-%d").to_string(),
            date_time: raw.published_at,
            author: raw.author,
            source: source.name.clone(),
            source_icon: source.icon.clone(),
            category: source.category.clone(),
            is_relevant: scores.relevance >= relevance_threshold,
            scores,
        }
    }
}

/// Stable identifier for a story: a truncated SHA-256 over the normalized
/// title and the URL. Re-fetching the same story yields the same id.
pub fn news_id(title: &str, url: &str) -> String {
    let input = format!("{}|{}", normalize_title(title), url.trim());
    let hash = Sha256::digest(input.as_bytes());
    let mut hex = format!("{:x}", hash);
    hex.truncate(ID_HEX_LEN);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FormatFamily;
    use chrono::TimeZone;

    fn source() -> SourceDescriptor {
        SourceDescriptor::feed(
            "test",
            "Test Source",
            FormatFamily::Rss,
            "https://example.com/feed.xml",
            "news",
        )
    }

    #[test]
    fn test_news_id_is_deterministic() {
        let a = news_id("Claude 4 Released", "https://example.com/a");
        let b = news_id("Claude 4 Released", "https://example.com/a");
        assert_eq!(a, b);
        assert_eq!(a.len(), ID_HEX_LEN);
    }

    #[test]
    fn test_news_id_ignores_title_punctuation() {
        assert_eq!(
            news_id("Claude 4 Released!", "https://example.com/a"),
            news_id("claude 4 released", "https://example.com/a")
        );
        assert_ne!(
            news_id("Claude 4 Released", "https://example.com/a"),
            news_id("Claude 4 Released", "https://example.com/b")
        );
    }

    #[test]
    fn test_from_raw_sets_relevance_flag_and_dates() {
        let raw = RawItem {
            title: "Claude".into(),
            link: "https://example.com/claude".into(),
            description: "x".repeat(1000),
            published_at: Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap(),
            ..Default::default()
        };
        let scores = Scores {
            relevance: 10,
            ..Default::default()
        };

        let item = NewsItem::from_raw(raw, &source(), scores, 10);
        assert!(item.is_relevant);
        assert_eq!(item.date, "2026-03-04");
        assert_eq!(item.source, "Test Source");
        assert_eq!(item.category, "news");
        assert_eq!(item.description.chars().count(), NEWS_DESCRIPTION_MAX_CHARS);

        let below = NewsItem::from_raw(
            RawItem::default(),
            &source(),
            Scores {
                relevance: 9,
                ..Default::default()
            },
            10,
        );
        assert!(!below.is_relevant);
    }

    #[test]
    fn test_serializes_camel_case() {
        let item = NewsItem::from_raw(RawItem::default(), &source(), Scores::default(), 10);
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("dateTime").is_some());
        assert!(json.get("sourceIcon").is_some());
        assert!(json.get("isRelevant").is_some());
        assert!(json.get("author").is_none());
    }
}
