use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::feed::parser::{parse_feed, ParsedFeed};
use crate::feed::retry::RetryPolicy;

const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024; // 10MB
const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Network-level failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    Timeout,
    ConnectionRefused,
}

/// Errors that can occur during a single HTTP fetch.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request (headers and body) did not finish within the timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

impl FetchError {
    /// Classifies network-level failures; `None` for HTTP and body errors.
    pub fn network_kind(&self) -> Option<NetworkErrorKind> {
        match self {
            FetchError::Timeout(_) => Some(NetworkErrorKind::Timeout),
            FetchError::Network(e) if e.is_timeout() => Some(NetworkErrorKind::Timeout),
            FetchError::Network(_) => Some(NetworkErrorKind::ConnectionRefused),
            _ => None,
        }
    }
}

/// Performs one GET with a single timeout covering headers and body.
///
/// No retry happens here; see [`HttpClient::get_bytes`] for the retrying
/// entry point.
///
/// # Errors
///
/// - [`FetchError::Timeout`] - the whole exchange exceeded `timeout`
/// - [`FetchError::Network`] - connection or TLS errors
/// - [`FetchError::HttpStatus`] - non-2xx HTTP response
/// - [`FetchError::ResponseTooLarge`] - body exceeded 10MB
/// - [`FetchError::IncompleteResponse`] - body shorter than Content-Length
pub async fn fetch(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<Vec<u8>, FetchError> {
    let exchange = async {
        let response = client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        read_limited_bytes(response, MAX_RESPONSE_SIZE).await
    };

    tokio::time::timeout(timeout, exchange)
        .await
        .map_err(|_| FetchError::Timeout(timeout))?
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    // EDGE-005: Network interruptions can end the stream early
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}

/// HTTP layer shared by the feed path and the API adapters: one connection
/// pool, one per-request timeout, one retry policy.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Builds a client with the crate user agent.
    ///
    /// # Errors
    ///
    /// Fails only if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_client(client, timeout, retry))
    }

    /// Wraps a caller-configured client.
    pub fn with_client(client: reqwest::Client, timeout: Duration, retry: RetryPolicy) -> Self {
        Self {
            client,
            timeout,
            retry,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// GETs `url`, retrying transient failures per the retry policy.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let client = &self.client;
        let timeout = self.timeout;
        self.retry
            .run(url, move || fetch(client, url, timeout))
            .await
    }
}

/// Errors from fetching and parsing one feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] crate::feed::parser::ParseError),
}

/// Fetches a feed URL and parses the body as RSS, Atom or RDF.
pub async fn fetch_feed(http: &HttpClient, url: &str) -> Result<ParsedFeed, FeedError> {
    let bytes = http.get_bytes(url).await?;
    let parsed = parse_feed(&bytes)?;

    // Items missing a title or link never reach the scorer
    if parsed.skipped > 0 {
        tracing::debug!(
            feed = %url,
            skipped = parsed.skipped,
            "Feed items without title or link skipped"
        );
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::parser::{FeedFormat, ParseError};
    use wiremock::matchers::{any, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <item><title>Test</title><link>https://example.com/1</link></item>
</channel></rss>"#;

    fn fast_client() -> HttpClient {
        HttpClient::with_client(
            reqwest::Client::new(),
            Duration::from_secs(5),
            RetryPolicy {
                max_retries: 3,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                jitter: Duration::ZERO,
            },
        )
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let parsed = fetch_feed(&fast_client(), &format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(parsed.format, FeedFormat::Rss);
        assert_eq!(parsed.items.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_404_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = fast_client()
            .get_bytes(&format!("{}/feed", mock_server.uri()))
            .await;
        match result {
            Err(FetchError::HttpStatus(404)) => {}
            other => panic!("Expected HttpStatus(404), got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_500_retries_then_fails() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(4) // Initial request + 3 retries
            .mount(&mock_server)
            .await;

        let result = fast_client()
            .get_bytes(&format!("{}/feed", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::HttpStatus(500))));
    }

    #[tokio::test]
    async fn test_fetch_503_retry_then_success() {
        let mock_server = MockServer::start().await;

        // First two requests return 503, third succeeds
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .mount(&mock_server)
            .await;

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_string(VALID_RSS))
            .mount(&mock_server)
            .await;

        let parsed = fetch_feed(&fast_client(), &format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(parsed.items.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_timeout_is_network_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let err = fetch(
            &client,
            &format!("{}/slow", mock_server.uri()),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
        assert_eq!(err.network_kind(), Some(NetworkErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_connection_refused_classified() {
        // Bind then drop to get a port nothing listens on
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = reqwest::Client::new();
        let err = fetch(
            &client,
            &format!("http://127.0.0.1:{port}/feed"),
            Duration::from_secs(2),
        )
        .await
        .unwrap_err();
        assert_eq!(err.network_kind(), Some(NetworkErrorKind::ConnectionRefused));
    }

    #[tokio::test]
    async fn test_malformed_feed_parse_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"<rss version="2.0"><channel><item></channel></rss>"#),
            )
            .mount(&mock_server)
            .await;

        let result = fetch_feed(&fast_client(), &format!("{}/feed", mock_server.uri())).await;
        match result {
            Err(FeedError::Parse(ParseError::Malformed(_))) => {}
            other => panic!("Expected Malformed parse error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_empty_feed_success() {
        let empty_rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel></channel></rss>"#;

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(empty_rss))
            .mount(&mock_server)
            .await;

        let parsed = fetch_feed(&fast_client(), &format!("{}/feed", mock_server.uri()))
            .await
            .unwrap();
        assert!(parsed.items.is_empty());
    }
}
