//! News aggregation pipeline.
//!
//! Items are pulled concurrently from RSS/Atom/RDF feeds and JSON APIs,
//! normalized into [`NewsItem`]s, scored, filtered, de-duplicated and
//! ranked, then served through a cache-aside [`Aggregator`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use headline::{Aggregator, FileCacheStore, HttpClient, RetryPolicy, SourceRegistry};
//!
//! # async fn run() -> Result<(), reqwest::Error> {
//! let http = HttpClient::new(Duration::from_secs(10), RetryPolicy::default())?;
//! let cache = Arc::new(FileCacheStore::new("news.json", Duration::from_secs(7200)));
//! let aggregator = Aggregator::new(http, SourceRegistry::builtin(), cache);
//!
//! for item in aggregator.aggregate(false, 10).await {
//!     println!("{:>6.1} {}", item.scores.total, item.title);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aggregator;
pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod pipeline;
pub mod registry;
pub mod storage;
pub mod types;
pub mod util;

pub use aggregator::{Aggregation, Aggregator, AggregatorSettings, CycleReport, NewsStats};
pub use config::{Config, ConfigError};
pub use error::SourceError;
pub use feed::{HttpClient, RetryPolicy};
pub use registry::{FormatFamily, SourceDescriptor, SourceRegistry};
pub use storage::{CacheStore, FileCacheStore, MemoryCacheStore};
pub use types::{NewsItem, RawItem, Scores};
