//! RSS 2.0 / Atom / RDF (RSS 1.0) parsing into [`RawItem`]s.
//!
//! `feed-rs` reads the document; the dialect it reports becomes a
//! [`FeedFormat`] and each format has its own mapping function from
//! `feed_rs::model::Entry`.

use chrono::{DateTime, NaiveDateTime, Utc};
use feed_rs::model::{Entry, FeedType, Link};
use feed_rs::parser::{self, ParseErrorKind, ParseFeedError};
use thiserror::Error;

use crate::types::RawItem;
use crate::util::{strip_html, truncate_chars};

/// Maximum description length kept from a feed item
pub const DESCRIPTION_MAX_CHARS: usize = 500;

/// Feed dialect, as detected from document structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFormat {
    /// RSS 2.0 (and the 0.9x versions it grew from)
    Rss,
    Atom,
    /// RDF / RSS 1.0
    Rdf,
}

impl FeedFormat {
    fn from_feed_type(feed_type: &FeedType) -> Option<Self> {
        match feed_type {
            FeedType::RSS2 | FeedType::RSS0 => Some(Self::Rss),
            FeedType::Atom => Some(Self::Atom),
            FeedType::RSS1 => Some(Self::Rdf),
            FeedType::JSON => None,
        }
    }
}

/// Errors that can occur while parsing a feed body.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Readable, but not RSS, Atom or RDF
    #[error("Unknown feed format: {0}")]
    UnknownFormat(String),
    /// The body is not well-formed XML
    #[error("Malformed feed: {0}")]
    Malformed(String),
}

impl From<ParseFeedError> for ParseError {
    fn from(err: ParseFeedError) -> Self {
        match err {
            ParseFeedError::ParseError(ParseErrorKind::NoFeedRoot) => {
                ParseError::UnknownFormat("no rss, feed or RDF root element".to_string())
            }
            other => ParseError::Malformed(other.to_string()),
        }
    }
}

/// Items extracted from one feed document.
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub format: FeedFormat,
    pub items: Vec<RawItem>,
    /// Entries dropped because they had no title or no link
    pub skipped: usize,
}

/// Parses a feed body, using the current time as the fallback publication
/// date for items whose date is missing or unparseable.
///
/// # Errors
///
/// - [`ParseError::Malformed`] if the XML cannot be read
/// - [`ParseError::UnknownFormat`] if no supported structure is found
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, ParseError> {
    parse_feed_at(bytes, Utc::now())
}

/// Like [`parse_feed`] with an explicit fallback timestamp.
pub fn parse_feed_at(bytes: &[u8], fetched_at: DateTime<Utc>) -> Result<ParsedFeed, ParseError> {
    let feed = parser::parse(bytes)?;
    let format = FeedFormat::from_feed_type(&feed.feed_type)
        .ok_or_else(|| ParseError::UnknownFormat(format!("{:?}", feed.feed_type)))?;

    let map: fn(&Entry, DateTime<Utc>) -> Option<RawItem> = match format {
        FeedFormat::Rss => map_rss_item,
        FeedFormat::Atom => map_atom_entry,
        FeedFormat::Rdf => map_rdf_item,
    };

    let total = feed.entries.len();
    let items: Vec<RawItem> = feed
        .entries
        .iter()
        .filter_map(|entry| map(entry, fetched_at))
        .collect();

    Ok(ParsedFeed {
        format,
        skipped: total - items.len(),
        items,
    })
}

// ============================================================================
// Per-format mapping
// ============================================================================

fn map_rss_item(entry: &Entry, fetched_at: DateTime<Utc>) -> Option<RawItem> {
    // A permalink guid doubles as the link when <link> is absent
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .or_else(|| url_like_id(entry));

    let description = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()));

    build_item(entry, link, description, fetched_at)
}

fn map_atom_entry(entry: &Entry, fetched_at: DateTime<Utc>) -> Option<RawItem> {
    let description = entry
        .summary
        .as_ref()
        .map(|s| s.content.as_str())
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.as_ref().and_then(|c| c.body.as_deref()));

    build_item(entry, atom_link(&entry.links), description, fetched_at)
}

/// Picks the entry's article link: `rel="alternate"` or no `rel` first,
/// then any link with an `href`.
fn atom_link(links: &[Link]) -> Option<String> {
    let usable: Vec<&Link> = links.iter().filter(|l| !l.href.trim().is_empty()).collect();

    usable
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| usable.first())
        .map(|l| l.href.trim().to_string())
}

fn map_rdf_item(entry: &Entry, fetched_at: DateTime<Utc>) -> Option<RawItem> {
    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .or_else(|| url_like_id(entry));

    let description = entry.summary.as_ref().map(|s| s.content.as_str());

    build_item(entry, link, description, fetched_at)
}

fn url_like_id(entry: &Entry) -> Option<String> {
    let id = entry.id.trim();
    (id.starts_with("http://") || id.starts_with("https://")).then(|| id.to_string())
}

fn build_item(
    entry: &Entry,
    link: Option<String>,
    description: Option<&str>,
    fetched_at: DateTime<Utc>,
) -> Option<RawItem> {
    let title = strip_html(&entry.title.as_ref()?.content);
    let link = link?.trim().to_string();
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let description = description
        .map(|d| truncate_chars(&strip_html(d), DESCRIPTION_MAX_CHARS).into_owned())
        .unwrap_or_default();

    Some(RawItem {
        title,
        link,
        description,
        published_at: entry.published.or(entry.updated).unwrap_or(fetched_at),
        author: entry
            .authors
            .first()
            .map(|a| strip_html(&a.name))
            .filter(|a| !a.is_empty()),
        ..Default::default()
    })
}

/// Parses the date formats seen in feeds: RFC 2822 (`pubDate`), RFC 3339
/// (Atom, `dc:date`), and bare ISO timestamps treated as UTC.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}
