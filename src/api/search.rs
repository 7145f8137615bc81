use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Deserialize;
use url::Url;

use super::merge_responses;
use crate::error::SourceError;
use crate::feed::{parse_date, HttpClient};
use crate::types::RawItem;
use crate::util::strip_html;

/// Discussion page used when a hit has no outbound link
const DISCUSSION_URL: &str = "https://news.ycombinator.com/item?id=";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "objectID")]
    object_id: String,
    title: Option<String>,
    url: Option<String>,
    author: Option<String>,
    points: Option<u64>,
    num_comments: Option<u64>,
    created_at: Option<String>,
    created_at_i: Option<i64>,
    story_text: Option<String>,
}

impl SearchHit {
    fn into_raw(self, fetched_at: DateTime<Utc>) -> Option<RawItem> {
        let title = strip_html(self.title.as_deref()?);
        if title.is_empty() {
            return None;
        }

        let link = self
            .url
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| format!("{}{}", DISCUSSION_URL, self.object_id));

        let published_at = self
            .created_at_i
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .or_else(|| self.created_at.as_deref().and_then(parse_date))
            .unwrap_or(fetched_at);

        Some(RawItem {
            title,
            link,
            description: self.story_text.as_deref().map(strip_html).unwrap_or_default(),
            published_at,
            author: self.author,
            native_id: Some(self.object_id),
            points: self.points,
            num_comments: self.num_comments,
            score: None,
        })
    }
}

/// Adapter for a search-style JSON API: one request per query term, each
/// restricted to stories.
#[derive(Debug, Clone)]
pub struct SearchAdapter {
    http: HttpClient,
    source: String,
    base_url: String,
    queries: Vec<String>,
}

impl SearchAdapter {
    pub fn new(http: HttpClient, source: &str, base_url: &str, queries: &[String]) -> Self {
        Self {
            http,
            source: source.to_string(),
            base_url: base_url.to_string(),
            queries: queries.to_vec(),
        }
    }

    /// Request URL for one query: `base_url?query=<q>&tags=story`.
    pub fn query_url(&self, query: &str) -> Result<Url, url::ParseError> {
        Url::parse_with_params(&self.base_url, &[("query", query), ("tags", "story")])
    }

    /// Runs every query concurrently and merges the hits.
    ///
    /// # Errors
    ///
    /// [`SourceError::AllRequestsFailed`] if no query succeeded. Individual
    /// failures are logged and otherwise ignored.
    pub async fn fetch_all(&self) -> Result<Vec<RawItem>, SourceError> {
        let fetched_at = Utc::now();
        let requests = self.queries.iter().map(|query| async move {
            let label = format!("{}?query={}", self.base_url, query);
            (label, self.fetch_query(query, fetched_at).await)
        });

        let responses = join_all(requests).await;
        merge_responses(&self.source, responses)
    }

    async fn fetch_query(
        &self,
        query: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Vec<RawItem>, SourceError> {
        let url = self.query_url(query)?;
        let bytes = self.http.get_bytes(url.as_str()).await?;
        let response: SearchResponse = serde_json::from_slice(&bytes)?;

        Ok(response
            .hits
            .into_iter()
            .filter_map(|hit| hit.into_raw(fetched_at))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::RetryPolicy;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn http() -> HttpClient {
        HttpClient::with_client(
            reqwest::Client::new(),
            Duration::from_secs(5),
            RetryPolicy::none(),
        )
    }

    fn adapter(server: &MockServer, queries: &[&str]) -> SearchAdapter {
        let queries: Vec<String> = queries.iter().map(|q| q.to_string()).collect();
        SearchAdapter::new(
            http(),
            "hackernews",
            &format!("{}/api/v1/search_by_date", server.uri()),
            &queries,
        )
    }

    fn hits(body: serde_json::Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(body)
    }

    #[test]
    fn test_query_url_encodes_terms() {
        let adapter = SearchAdapter::new(
            http(),
            "hn",
            "https://hn.algolia.com/api/v1/search_by_date",
            &[],
        );
        let url = adapter.query_url("Claude Code").unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("query".to_string(), "Claude Code".to_string()),
                ("tags".to_string(), "story".to_string())
            ]
        );
    }

    #[test]
    fn test_hit_mapping() {
        let hit: SearchHit = serde_json::from_value(serde_json::json!({
            "objectID": "42",
            "title": "Ask HN: Claude &amp; agents",
            "url": null,
            "author": "pg",
            "points": 120,
            "num_comments": 33,
            "created_at_i": 1_750_000_000,
            "story_text": "<p>What do you use?</p>"
        }))
        .unwrap();

        let raw = hit.into_raw(Utc::now()).unwrap();
        assert_eq!(raw.title, "Ask HN: Claude & agents");
        assert_eq!(raw.link, "https://news.ycombinator.com/item?id=42");
        assert_eq!(raw.description, "What do you use?");
        assert_eq!(raw.points, Some(120));
        assert_eq!(raw.num_comments, Some(33));
        assert_eq!(raw.native_id.as_deref(), Some("42"));
        assert_eq!(
            raw.published_at,
            DateTime::from_timestamp(1_750_000_000, 0).unwrap()
        );
    }

    #[test]
    fn test_hit_date_falls_back_to_created_at_then_fetch_time() {
        let fetched_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let with_iso: SearchHit = serde_json::from_value(serde_json::json!({
            "objectID": "1",
            "title": "t",
            "url": "https://example.com",
            "created_at": "2025-06-10T14:30:00.000Z"
        }))
        .unwrap();
        assert_eq!(
            with_iso.into_raw(fetched_at).unwrap().published_at,
            Utc.with_ymd_and_hms(2025, 6, 10, 14, 30, 0).unwrap()
        );

        let undated: SearchHit = serde_json::from_value(serde_json::json!({
            "objectID": "2",
            "title": "t",
            "url": "https://example.com"
        }))
        .unwrap();
        assert_eq!(undated.into_raw(fetched_at).unwrap().published_at, fetched_at);
    }

    #[test]
    fn test_untitled_hit_skipped() {
        let hit: SearchHit =
            serde_json::from_value(serde_json::json!({ "objectID": "1", "title": null })).unwrap();
        assert!(hit.into_raw(Utc::now()).is_none());
    }

    #[tokio::test]
    async fn test_fetch_all_merges_and_dedups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/search_by_date"))
            .and(query_param("query", "Claude"))
            .and(query_param("tags", "story"))
            .respond_with(hits(serde_json::json!({
                "hits": [
                    { "objectID": "1", "title": "Claude 4", "url": "https://a.com/1", "points": 10 },
                    { "objectID": "2", "title": "Claude Code", "url": "https://a.com/2" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("query", "Anthropic"))
            .respond_with(hits(serde_json::json!({
                "hits": [
                    { "objectID": "2", "title": "Claude Code (dup)", "url": "https://a.com/2" },
                    { "objectID": "3", "title": "Anthropic raises", "url": "https://a.com/3" }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let items = adapter(&server, &["Claude", "Anthropic"])
            .fetch_all()
            .await
            .unwrap();
        let ids: Vec<_> = items.iter().filter_map(|i| i.native_id.as_deref()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert_eq!(items[1].title, "Claude Code");
    }

    #[tokio::test]
    async fn test_fetch_all_tolerates_failed_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("query", "Claude"))
            .respond_with(hits(serde_json::json!({
                "hits": [{ "objectID": "1", "title": "Claude 4", "url": "https://a.com/1" }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("query", "Anthropic"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(query_param("query", "Claude Code"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let items = adapter(&server, &["Claude", "Anthropic", "Claude Code"])
            .fetch_all()
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_all_reports_total_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = adapter(&server, &["Claude", "Anthropic"]).fetch_all().await;
        assert!(matches!(
            result,
            Err(SourceError::AllRequestsFailed { failed: 2 })
        ));
    }
}
