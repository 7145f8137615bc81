//! Configuration file parser for ~/.config/headline/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning when the file
//! contains potential typos.
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::aggregator::{AggregatorSettings, DEFAULT_RECENCY_WINDOW};
use crate::feed::RetryPolicy;
use crate::pipeline::{
    default_host_credibility, Keywords, Scorer, DEFAULT_RELEVANCE_THRESHOLD,
    DEFAULT_SIMILARITY_THRESHOLD,
};
use crate::registry::{RegistryError, SourceDescriptor, SourceRegistry};
use crate::storage::DEFAULT_CACHE_TTL;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid source list: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Retries after the first attempt for transient HTTP failures.
    pub http_retries: u32,

    /// Per-request timeout covering headers and body.
    pub http_timeout_ms: u64,

    /// Base delay for exponential backoff between retries.
    pub http_backoff_ms: u64,

    /// How long a cached cycle is served before refetching.
    pub cache_ttl_ms: u64,

    /// Items published longer ago than this are dropped.
    pub recency_window_ms: u64,

    /// Jaccard similarity above which two titles are one story.
    pub similarity_threshold: f64,

    /// Minimum relevance sub-score for an item to be kept.
    pub relevance_threshold: u32,

    /// Cache file location. Defaults to ~/.cache/headline/news.json.
    pub cache_path: Option<PathBuf>,

    pub keywords: Keywords,

    /// Host credibility overrides, merged over the built-in table.
    pub credibility: HashMap<String, f64>,

    /// Replaces the built-in source list when non-empty.
    pub sources: Vec<SourceDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            http_retries: retry.max_retries,
            http_timeout_ms: 10_000,
            http_backoff_ms: retry.base_delay.as_millis() as u64,
            cache_ttl_ms: DEFAULT_CACHE_TTL.as_millis() as u64,
            recency_window_ms: DEFAULT_RECENCY_WINDOW.as_millis() as u64,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
            cache_path: None,
            keywords: Keywords::default(),
            credibility: HashMap::new(),
            sources: Vec::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 11] = [
        "http_retries",
        "http_timeout_ms",
        "http_backoff_ms",
        "cache_ttl_ms",
        "recency_window_ms",
        "similarity_threshold",
        "relevance_threshold",
        "cache_path",
        "keywords",
        "credibility",
        "sources",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Out-of-range values → `Err(ConfigError::InvalidValue)`
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check the size before reading so a huge file is never loaded
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config = Self::from_toml(&content)?;
        tracing::info!(
            path = %path.display(),
            sources = config.sources.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parses and validates TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        // Parse as a raw table first to detect unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        // At 0.0 a single shared word would merge two stories
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(ConfigError::InvalidValue {
                key: "similarity_threshold",
                reason: format!("{} is outside (0.0, 1.0]", self.similarity_threshold),
            });
        }
        if self.http_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "http_timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if let Some((host, score)) = self.credibility.iter().find(|(_, s)| !s.is_finite()) {
            return Err(ConfigError::InvalidValue {
                key: "credibility",
                reason: format!("{host} has non-finite score {score}"),
            });
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.http_retries,
            base_delay: Duration::from_millis(self.http_backoff_ms),
            ..RetryPolicy::default()
        }
    }

    pub fn settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            recency_window: Duration::from_millis(self.recency_window_ms),
            similarity_threshold: self.similarity_threshold,
            relevance_threshold: self.relevance_threshold,
        }
    }

    /// Scorer with the configured keywords and the built-in host table
    /// overlaid by `[credibility]`.
    pub fn scorer(&self) -> Scorer {
        let mut hosts = default_host_credibility();
        hosts.extend(self.credibility.clone());
        Scorer::new(self.keywords.clone(), hosts)
    }

    /// The configured sources, or the built-in registry when none are given.
    pub fn registry(&self) -> Result<SourceRegistry, ConfigError> {
        if self.sources.is_empty() {
            return Ok(SourceRegistry::builtin());
        }
        Ok(SourceRegistry::new(self.sources.clone())?)
    }
}

// ============================================================================
// Tests
// ============================================================================
