use thiserror::Error;

use crate::feed::{FeedError, FetchError, ParseError};

/// Why one source contributed nothing to an aggregation cycle.
///
/// Never surfaced to `aggregate()` callers; the aggregator logs it and
/// records it in the cycle report.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("feed parse failed: {0}")]
    Parse(#[from] ParseError),

    #[error("unexpected API payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Every sub-request of a multi-request adapter failed
    #[error("all {failed} requests failed")]
    AllRequestsFailed { failed: usize },
}

impl From<FeedError> for SourceError {
    fn from(err: FeedError) -> Self {
        match err {
            FeedError::Fetch(e) => SourceError::Fetch(e),
            FeedError::Parse(e) => SourceError::Parse(e),
        }
    }
}
