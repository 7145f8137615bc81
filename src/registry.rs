//! Source registry: the fixed set of feeds and APIs the aggregator polls.
//!
//! The registry is pure data. Every downstream component dispatches on
//! [`FormatFamily`], never on a source's name, so adding a source means
//! adding an entry here (or a `[[sources]]` table in the config file).

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::{validate_endpoint, UrlError};

/// Credibility assumed for a source that does not declare one
pub const DEFAULT_SOURCE_CREDIBILITY: f64 = 5.0;

const DEFAULT_ICON: &str = "📰";

/// Wire format of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatFamily {
    Rss,
    Atom,
    Rdf,
    /// JSON search API queried once per configured term
    SearchApi,
    /// JSON listing API fetched once per configured endpoint
    ListingApi,
}

impl FormatFamily {
    /// True for the XML feed families handled by the fetcher and parser.
    pub fn is_feed(self) -> bool {
        matches!(self, Self::Rss | Self::Atom | Self::Rdf)
    }
}

/// Where a source's items come from.
///
/// Deserialized from the same table as the descriptor, so a feed entry
/// carries `url`, a search entry `base_url` + `queries`, and a listing entry
/// `endpoints`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceEndpoint {
    Search {
        base_url: String,
        queries: Vec<String>,
    },
    Listing {
        endpoints: Vec<String>,
    },
    Feed {
        url: String,
    },
}

/// Static description of one source. Loaded once, shared via `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub key: String,
    pub name: String,
    pub format: FormatFamily,
    #[serde(flatten)]
    pub endpoint: SourceEndpoint,
    pub category: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_icon")]
    pub icon: String,
    /// Fallback credibility for item hosts missing from the host table
    #[serde(default = "default_credibility")]
    pub credibility: f64,
}

fn default_icon() -> String {
    DEFAULT_ICON.to_string()
}

fn default_credibility() -> f64 {
    DEFAULT_SOURCE_CREDIBILITY
}

impl SourceDescriptor {
    /// Creates an RSS/Atom/RDF feed source.
    pub fn feed(key: &str, name: &str, format: FormatFamily, url: &str, category: &str) -> Self {
        Self::with_endpoint(
            key,
            name,
            format,
            SourceEndpoint::Feed {
                url: url.to_string(),
            },
            category,
        )
    }

    /// Creates a search-API source issuing one request per query.
    pub fn search(key: &str, name: &str, base_url: &str, queries: &[&str], category: &str) -> Self {
        Self::with_endpoint(
            key,
            name,
            FormatFamily::SearchApi,
            SourceEndpoint::Search {
                base_url: base_url.to_string(),
                queries: queries.iter().map(|q| q.to_string()).collect(),
            },
            category,
        )
    }

    /// Creates a listing-API source issuing one request per endpoint.
    pub fn listing(key: &str, name: &str, endpoints: &[&str], category: &str) -> Self {
        Self::with_endpoint(
            key,
            name,
            FormatFamily::ListingApi,
            SourceEndpoint::Listing {
                endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
            },
            category,
        )
    }

    fn with_endpoint(
        key: &str,
        name: &str,
        format: FormatFamily,
        endpoint: SourceEndpoint,
        category: &str,
    ) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            format,
            endpoint,
            category: category.to_string(),
            priority: 0,
            icon: default_icon(),
            credibility: DEFAULT_SOURCE_CREDIBILITY,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_string();
        self
    }

    pub fn credibility(mut self, credibility: f64) -> Self {
        self.credibility = credibility;
        self
    }

    /// Every URL this source will request, for validation and logging.
    pub fn urls(&self) -> Vec<&str> {
        match &self.endpoint {
            SourceEndpoint::Feed { url } => vec![url.as_str()],
            SourceEndpoint::Search { base_url, .. } => vec![base_url.as_str()],
            SourceEndpoint::Listing { endpoints } => endpoints.iter().map(String::as_str).collect(),
        }
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let consistent = match (&self.endpoint, self.format) {
            (SourceEndpoint::Feed { .. }, format) => format.is_feed(),
            (SourceEndpoint::Search { .. }, FormatFamily::SearchApi) => true,
            (SourceEndpoint::Listing { .. }, FormatFamily::ListingApi) => true,
            _ => false,
        };
        if !consistent {
            return Err(RegistryError::FormatMismatch {
                key: self.key.clone(),
                format: self.format,
            });
        }

        let empty = match &self.endpoint {
            SourceEndpoint::Search { queries, .. } => queries.is_empty(),
            SourceEndpoint::Listing { endpoints } => endpoints.is_empty(),
            SourceEndpoint::Feed { .. } => false,
        };
        if empty {
            return Err(RegistryError::NoRequests(self.key.clone()));
        }

        for url in self.urls() {
            validate_endpoint(url).map_err(|source| RegistryError::InvalidUrl {
                key: self.key.clone(),
                url: url.to_string(),
                source,
            })?;
        }

        Ok(())
    }
}

/// Errors raised while building a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Duplicate source key: {0}")]
    DuplicateKey(String),

    #[error("Source '{key}': endpoint fields do not match format {format:?}")]
    FormatMismatch { key: String, format: FormatFamily },

    #[error("Source '{0}' has no queries or endpoints to request")]
    NoRequests(String),

    #[error("Source '{key}': invalid URL '{url}': {source}")]
    InvalidUrl {
        key: String,
        url: String,
        #[source]
        source: UrlError,
    },
}

/// Validated, ordered collection of sources.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<SourceDescriptor>>,
}

impl SourceRegistry {
    /// Builds a registry, validating every descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError`] on duplicate keys, endpoint fields that do
    /// not match the declared format, empty query/endpoint lists, or URLs
    /// that are not http(s).
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.key.as_str()) {
                return Err(RegistryError::DuplicateKey(source.key.clone()));
            }
            source.validate()?;
        }

        Ok(Self {
            sources: sources.into_iter().map(Arc::new).collect(),
        })
    }

    /// The built-in source list.
    pub fn builtin() -> Self {
        Self {
            sources: builtin_sources().into_iter().map(Arc::new).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Arc<SourceDescriptor>> {
        self.sources.iter().find(|s| s.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SourceDescriptor>> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn builtin_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::feed(
            "anthropic",
            "Anthropic News",
            FormatFamily::Rss,
            "https://www.anthropic.com/news/rss.xml",
            "official",
        )
        .priority(1)
        .icon("🅰️")
        .credibility(10.0),
        SourceDescriptor::feed(
            "techcrunch-ai",
            "TechCrunch AI",
            FormatFamily::Rss,
            "https://techcrunch.com/category/artificial-intelligence/feed/",
            "news",
        )
        .priority(2)
        .icon("📰")
        .credibility(8.0),
        SourceDescriptor::feed(
            "verge-ai",
            "The Verge AI",
            FormatFamily::Atom,
            "https://www.theverge.com/rss/ai-artificial-intelligence/index.xml",
            "news",
        )
        .priority(2)
        .icon("📱")
        .credibility(8.0),
        SourceDescriptor::feed(
            "ars-technica",
            "Ars Technica",
            FormatFamily::Rss,
            "https://feeds.arstechnica.com/arstechnica/technology-lab",
            "news",
        )
        .priority(3)
        .icon("🔬")
        .credibility(8.0),
        SourceDescriptor::feed(
            "simon-willison",
            "Simon Willison",
            FormatFamily::Atom,
            "https://simonwillison.net/atom/everything/",
            "community",
        )
        .priority(3)
        .icon("✍️")
        .credibility(7.0),
        SourceDescriptor::feed(
            "slashdot",
            "Slashdot",
            FormatFamily::Rdf,
            "https://rss.slashdot.org/Slashdot/slashdotMain",
            "news",
        )
        .priority(4)
        .icon("💬")
        .credibility(6.0),
        SourceDescriptor::search(
            "hackernews",
            "Hacker News",
            "https://hn.algolia.com/api/v1/search_by_date",
            &["Claude", "Anthropic", "Claude Code"],
            "discussion",
        )
        .priority(2)
        .icon("🟧")
        .credibility(6.0),
        SourceDescriptor::listing(
            "reddit",
            "Reddit",
            &[
                "https://www.reddit.com/r/ClaudeAI/hot.json?limit=25",
                "https://www.reddit.com/r/Anthropic/hot.json?limit=25",
            ],
            "discussion",
        )
        .priority(3)
        .icon("👽")
        .credibility(5.0),
    ]
}
