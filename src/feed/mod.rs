//! Feed retrieval and parsing.
//!
//! - [`fetcher`] - single-timeout HTTP GET, the shared [`HttpClient`], and
//!   the feed fetch-then-parse entry point
//! - [`retry`] - the retry/backoff policy used by feeds and API adapters
//! - [`parser`] - RSS 2.0, Atom and RDF parsing into [`RawItem`]s
//!
//! [`RawItem`]: crate::types::RawItem

mod fetcher;
mod parser;
mod retry;

pub use fetcher::{fetch, fetch_feed, FeedError, FetchError, HttpClient, NetworkErrorKind};
pub use parser::{parse_date, parse_feed, parse_feed_at, FeedFormat, ParseError, ParsedFeed};
pub use retry::{RetryPolicy, RETRYABLE_STATUSES};
