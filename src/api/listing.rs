use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;

use super::merge_responses;
use crate::error::SourceError;
use crate::feed::HttpClient;
use crate::types::RawItem;
use crate::util::strip_html;

/// Host prefixed to relative permalinks
const PERMALINK_BASE: &str = "https://www.reddit.com";

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: Option<String>,
    url: Option<String>,
    permalink: Option<String>,
    author: Option<String>,
    score: Option<i64>,
    num_comments: Option<u64>,
    created_utc: Option<f64>,
    selftext: Option<String>,
    #[serde(default)]
    is_self: bool,
}

impl Post {
    fn permalink_url(&self) -> Option<String> {
        let permalink = self.permalink.as_deref()?.trim();
        if permalink.is_empty() {
            None
        } else if permalink.starts_with("http") {
            Some(permalink.to_string())
        } else {
            Some(format!("{}{}", PERMALINK_BASE, permalink))
        }
    }

    fn into_raw(self, fetched_at: DateTime<Utc>) -> Option<RawItem> {
        let title = strip_html(self.title.as_deref()?);
        if title.is_empty() {
            return None;
        }

        // Self posts link to their own thread; link posts fall back to it
        let external = self
            .url
            .as_deref()
            .map(str::trim)
            .filter(|u| !self.is_self && !u.is_empty())
            .map(str::to_string);
        let link = external.or_else(|| self.permalink_url())?;

        let published_at = self
            .created_utc
            .filter(|secs| secs.is_finite())
            .and_then(|secs| DateTime::from_timestamp(secs as i64, 0))
            .unwrap_or(fetched_at);

        Some(RawItem {
            title,
            link,
            description: self.selftext.as_deref().map(strip_html).unwrap_or_default(),
            published_at,
            author: self.author,
            native_id: Some(self.id),
            points: None,
            num_comments: self.num_comments,
            score: self.score,
        })
    }
}

/// Adapter for a listing-style JSON API: one request per endpoint.
#[derive(Debug, Clone)]
pub struct ListingAdapter {
    http: HttpClient,
    source: String,
    endpoints: Vec<String>,
}

impl ListingAdapter {
    pub fn new(http: HttpClient, source: &str, endpoints: &[String]) -> Self {
        Self {
            http,
            source: source.to_string(),
            endpoints: endpoints.to_vec(),
        }
    }

    /// Fetches every endpoint concurrently and merges the posts.
    ///
    /// # Errors
    ///
    /// [`SourceError::AllRequestsFailed`] if no endpoint succeeded.
    pub async fn fetch_all(&self) -> Result<Vec<RawItem>, SourceError> {
        let fetched_at = Utc::now();
        let requests = self.endpoints.iter().map(|endpoint| async move {
            (endpoint.clone(), self.fetch_endpoint(endpoint, fetched_at).await)
        });

        let responses = join_all(requests).await;
        merge_responses(&self.source, responses)
    }

    async fn fetch_endpoint(
        &self,
        endpoint: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<RawItem>, SourceError> {
        let bytes = self.http.get_bytes(endpoint).await?;
        let listing: Listing = serde_json::from_slice(&bytes)?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter_map(|child| child.data.into_raw(fetched_at))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::RetryPolicy;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer, paths: &[&str]) -> ListingAdapter {
        let http = HttpClient::with_client(
            reqwest::Client::new(),
            Duration::from_secs(5),
            RetryPolicy::none(),
        );
        let endpoints: Vec<String> = paths
            .iter()
            .map(|p| format!("{}{}", server.uri(), p))
            .collect();
        ListingAdapter::new(http, "reddit", &endpoints)
    }

    fn listing(posts: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "kind": "Listing",
            "data": { "children": posts }
        }))
    }

    fn post(value: serde_json::Value) -> Post {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_link_post_keeps_external_url() {
        let raw = post(serde_json::json!({
            "id": "abc",
            "title": "Claude 4 benchmarks",
            "url": "https://example.com/bench",
            "permalink": "/r/ClaudeAI/comments/abc/claude_4/",
            "score": 250,
            "num_comments": 40,
            "created_utc": 1_750_000_000.0
        }))
        .into_raw(Utc::now())
        .unwrap();

        assert_eq!(raw.link, "https://example.com/bench");
        assert_eq!(raw.score, Some(250));
        assert_eq!(raw.num_comments, Some(40));
        assert_eq!(raw.points, None);
        assert_eq!(
            raw.published_at,
            DateTime::from_timestamp(1_750_000_000, 0).unwrap()
        );
    }

    #[test]
    fn test_self_post_uses_permalink() {
        let raw = post(serde_json::json!({
            "id": "def",
            "title": "How do you use Claude Code?",
            "url": "https://www.reddit.com/r/ClaudeAI/comments/def/how/",
            "permalink": "/r/ClaudeAI/comments/def/how/",
            "is_self": true,
            "selftext": "Curious about &lt;workflows&gt;"
        }))
        .into_raw(Utc::now())
        .unwrap();

        assert_eq!(raw.link, "https://www.reddit.com/r/ClaudeAI/comments/def/how/");
        assert_eq!(raw.description, "Curious about <workflows>");
    }

    #[test]
    fn test_missing_url_falls_back_to_permalink() {
        let raw = post(serde_json::json!({
            "id": "ghi",
            "title": "No url",
            "permalink": "/r/Anthropic/comments/ghi/no_url/"
        }))
        .into_raw(Utc::now())
        .unwrap();
        assert_eq!(raw.link, "https://www.reddit.com/r/Anthropic/comments/ghi/no_url/");
    }

    #[test]
    fn test_post_without_any_link_skipped() {
        assert!(post(serde_json::json!({ "id": "x", "title": "Orphan" }))
            .into_raw(Utc::now())
            .is_none());
    }

    #[tokio::test]
    async fn test_fetch_all_partial_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/r/ClaudeAI/hot.json"))
            .respond_with(listing(serde_json::json!([
                { "kind": "t3", "data": { "id": "1", "title": "Claude", "url": "https://a.com/1", "score": 5 } },
                { "kind": "t3", "data": { "id": "2", "title": "Anthropic", "url": "https://a.com/2" } }
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/r/Anthropic/hot.json"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let items = adapter(&server, &["/r/ClaudeAI/hot.json", "/r/Anthropic/hot.json"])
            .fetch_all()
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Claude");
    }

    #[tokio::test]
    async fn test_crossposts_deduplicated() {
        let server = MockServer::start().await;
        let body = serde_json::json!([
            { "kind": "t3", "data": { "id": "same", "title": "Shared", "url": "https://a.com/s" } }
        ]);
        Mock::given(method("GET"))
            .respond_with(listing(body))
            .mount(&server)
            .await;

        let items = adapter(&server, &["/r/a/hot.json", "/r/b/hot.json"])
            .fetch_all()
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_reports_total_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{\"unexpected\": true}"))
            .mount(&server)
            .await;

        let result = adapter(&server, &["/r/a/hot.json"]).fetch_all().await;
        assert!(matches!(
            result,
            Err(SourceError::AllRequestsFailed { failed: 1 })
        ));
    }
}
