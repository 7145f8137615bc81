use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{RawItem, Scores};
use crate::util::{domain_suffixes, host_of};

pub const PRIMARY_KEYWORD_POINTS: i64 = 10;
pub const SECONDARY_KEYWORD_POINTS: i64 = 5;
pub const EXCLUSION_PENALTY: i64 = 20;

pub const RELEVANCE_WEIGHT: f64 = 3.0;
pub const CREDIBILITY_WEIGHT: f64 = 2.0;
pub const SOCIAL_WEIGHT: f64 = 0.1;
pub const RECENCY_WEIGHT: f64 = 1.0;

/// Recency reaches zero after this many hours
pub const RECENCY_HORIZON_HOURS: f64 = 100.0;

/// Minimum relevance for `is_relevant`
pub const DEFAULT_RELEVANCE_THRESHOLD: u32 = 10;

/// Keyword lists driving the relevance sub-score. Matching is a
/// case-insensitive substring test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keywords {
    pub primary: Vec<String>,
    pub secondary: Vec<String>,
    /// Phrases that mark a false positive ("claude monet")
    pub exclusion: Vec<String>,
}

impl Default for Keywords {
    fn default() -> Self {
        let owned =
            |words: &[&str]| -> Vec<String> { words.iter().map(|w| w.to_string()).collect() };
        Self {
            primary: owned(&["claude", "anthropic", "claude code", "model context protocol"]),
            secondary: owned(&[
                "llm",
                "large language model",
                "ai assistant",
                "ai safety",
                "constitutional ai",
                "mcp",
                "sonnet",
                "opus",
                "haiku",
                "agentic",
                "coding assistant",
            ]),
            exclusion: owned(&[
                "claude monet",
                "claude van damme",
                "jean-claude",
                "claude debussy",
            ]),
        }
    }
}

/// Credibility of well-known hosts, on a 0-10 scale.
pub fn default_host_credibility() -> HashMap<String, f64> {
    [
        ("anthropic.com", 10.0),
        ("reuters.com", 9.0),
        ("bloomberg.com", 9.0),
        ("techcrunch.com", 8.0),
        ("theverge.com", 8.0),
        ("arstechnica.com", 8.0),
        ("wired.com", 8.0),
        ("simonwillison.net", 7.0),
        ("github.com", 7.0),
        ("news.ycombinator.com", 6.0),
        ("reddit.com", 5.0),
        ("medium.com", 4.0),
    ]
    .into_iter()
    .map(|(host, score)| (host.to_string(), score))
    .collect()
}

/// Computes relevance, credibility, social, recency and the weighted total
/// for raw items.
#[derive(Debug, Clone)]
pub struct Scorer {
    keywords: Keywords,
    hosts: HashMap<String, f64>,
}

impl Default for Scorer {
    fn default() -> Self {
        Self::new(Keywords::default(), default_host_credibility())
    }
}

impl Scorer {
    pub fn new(keywords: Keywords, hosts: HashMap<String, f64>) -> Self {
        let lower = |list: Vec<String>| -> Vec<String> {
            list.into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        };
        Self {
            keywords: Keywords {
                primary: lower(keywords.primary),
                secondary: lower(keywords.secondary),
                exclusion: lower(keywords.exclusion),
            },
            hosts: hosts
                .into_iter()
                .map(|(host, score)| {
                    let host = host.trim().to_ascii_lowercase();
                    let host = host.strip_prefix("www.").map(str::to_string).unwrap_or(host);
                    (host, score)
                })
                .collect(),
        }
    }

    pub fn score(&self, item: &RawItem, source_credibility: f64, now: DateTime<Utc>) -> Scores {
        let text = format!("{} {}", item.title, item.description);
        let relevance = self.relevance(&text);
        let credibility = self.credibility(&item.link, source_credibility);
        let social = social(item);
        let recency = recency(item.published_at, now);

        let total = f64::from(relevance) * RELEVANCE_WEIGHT
            + credibility * CREDIBILITY_WEIGHT
            + social as f64 * SOCIAL_WEIGHT
            + recency * RECENCY_WEIGHT;

        Scores {
            relevance,
            credibility,
            social,
            recency,
            total,
        }
    }

    /// Keyword score of `text`, floored at zero.
    pub fn relevance(&self, text: &str) -> u32 {
        let text = text.to_lowercase();
        let count = |list: &[String]| list.iter().filter(|k| text.contains(k.as_str())).count() as i64;

        let raw = count(self.keywords.primary.as_slice()) * PRIMARY_KEYWORD_POINTS
            + count(self.keywords.secondary.as_slice()) * SECONDARY_KEYWORD_POINTS
            - count(self.keywords.exclusion.as_slice()) * EXCLUSION_PENALTY;

        u32::try_from(raw.max(0)).unwrap_or(u32::MAX)
    }

    /// Host-table credibility of `link`, matching the host or any parent
    /// domain; `fallback` when nothing matches.
    pub fn credibility(&self, link: &str, fallback: f64) -> f64 {
        host_of(link)
            .and_then(|host| {
                domain_suffixes(&host)
                    .find_map(|suffix| self.hosts.get(suffix))
                    .copied()
            })
            .unwrap_or(fallback)
    }
}

/// Engagement score for API items: `points + score + 2 * comments`.
pub fn social(item: &RawItem) -> i64 {
    let points = item.points.map_or(0, |p| i64::try_from(p).unwrap_or(i64::MAX));
    let comments = item
        .num_comments
        .map_or(0, |c| i64::try_from(c).unwrap_or(i64::MAX));
    points
        .saturating_add(item.score.unwrap_or(0))
        .saturating_add(comments.saturating_mul(2))
}

/// `100 - age_hours`, clamped to `[0, 100]`. Future timestamps are fresh.
pub fn recency(published_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_hours = (now - published_at).num_seconds().max(0) as f64 / 3600.0;
    (RECENCY_HORIZON_HOURS - age_hours).max(0.0)
}
