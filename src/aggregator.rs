//! Cache-aside aggregation over every registered source.
//!
//! One cycle: check the cache, fan out to all sources concurrently, score
//! and filter the merged items, drop near-duplicates, sort by total score,
//! write the cache and return the top of the list. A failing source only
//! removes its own items from the cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;

use crate::api::{ListingAdapter, SearchAdapter};
use crate::error::SourceError;
use crate::feed::{fetch_feed, HttpClient};
use crate::pipeline::{dedupe, Scorer, DEFAULT_RELEVANCE_THRESHOLD, DEFAULT_SIMILARITY_THRESHOLD};
use crate::registry::{SourceDescriptor, SourceEndpoint, SourceRegistry};
use crate::storage::{CacheRecord, CacheStore};
use crate::types::{NewsItem, RawItem};

/// Items older than this are dropped (14 days)
pub const DEFAULT_RECENCY_WINDOW: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Tunables for the filter and dedupe stages.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSettings {
    pub recency_window: Duration,
    pub similarity_threshold: f64,
    pub relevance_threshold: u32,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            recency_window: DEFAULT_RECENCY_WINDOW,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            relevance_threshold: DEFAULT_RELEVANCE_THRESHOLD,
        }
    }
}

/// What happened during one `aggregate` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    /// Served from the cache without contacting any source
    pub from_cache: bool,
    /// Keys of sources that contributed (possibly zero items)
    pub sources_ok: Vec<String>,
    /// Keys of failed sources with the error text
    pub sources_failed: Vec<(String, String)>,
}

impl CycleReport {
    /// True when a fresh fetch was attempted and every source failed, so an
    /// empty result means "nothing reachable" rather than "no news".
    pub fn is_degraded(&self) -> bool {
        !self.from_cache && self.sources_ok.is_empty() && !self.sources_failed.is_empty()
    }
}

/// Items plus the report for the cycle that produced them.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub items: Vec<NewsItem>,
    pub report: CycleReport,
}

/// Summary counts over the current dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsStats {
    pub total: usize,
    pub by_category: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub latest_date: Option<DateTime<Utc>>,
    pub oldest_date: Option<DateTime<Utc>>,
}

impl NewsStats {
    pub fn from_items(items: &[NewsItem]) -> Self {
        let mut stats = Self {
            total: items.len(),
            ..Self::default()
        };
        for item in items {
            *stats.by_category.entry(item.category.clone()).or_default() += 1;
            *stats.by_source.entry(item.source.clone()).or_default() += 1;
        }
        stats.latest_date = items.iter().map(|i| i.date_time).max();
        stats.oldest_date = items.iter().map(|i| i.date_time).min();
        stats
    }
}

pub struct Aggregator {
    http: HttpClient,
    registry: SourceRegistry,
    scorer: Scorer,
    cache: Arc<dyn CacheStore>,
    settings: AggregatorSettings,
}

impl Aggregator {
    /// Creates an aggregator with the default scorer and settings.
    pub fn new(http: HttpClient, registry: SourceRegistry, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            http,
            registry,
            scorer: Scorer::default(),
            cache,
            settings: AggregatorSettings::default(),
        }
    }

    pub fn with_scorer(mut self, scorer: Scorer) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_settings(mut self, settings: AggregatorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Returns up to `limit` items, highest total score first.
    ///
    /// Served from the cache when it is fresh and `force_refresh` is false.
    /// Never fails: unreachable or malformed sources contribute nothing.
    pub async fn aggregate(&self, force_refresh: bool, limit: usize) -> Vec<NewsItem> {
        self.aggregate_with_report(force_refresh, limit).await.items
    }

    /// Like [`Aggregator::aggregate`], also reporting which sources failed.
    pub async fn aggregate_with_report(&self, force_refresh: bool, limit: usize) -> Aggregation {
        if !force_refresh {
            if let Some(record) = self.load_cache().await {
                tracing::debug!(count = record.count, "Serving news from cache");
                let mut items = record.news;
                items.truncate(limit);
                return Aggregation {
                    items,
                    report: CycleReport {
                        from_cache: true,
                        ..CycleReport::default()
                    },
                };
            }
        }

        let mut aggregation = self.refresh().await;
        aggregation.items.truncate(limit);
        aggregation
    }

    /// Items of one category, in ranking order.
    pub async fn get_by_category(&self, category: &str, limit: usize) -> Vec<NewsItem> {
        self.get_by_category_with(category, limit, false).await
    }

    /// Like [`Aggregator::get_by_category`]; `force_refresh` runs a new
    /// cycle and filters its result directly, even when that cycle is
    /// degraded and left the cache untouched.
    pub async fn get_by_category_with(
        &self,
        category: &str,
        limit: usize,
        force_refresh: bool,
    ) -> Vec<NewsItem> {
        self.dataset_with(force_refresh)
            .await
            .into_iter()
            .filter(|item| item.category.eq_ignore_ascii_case(category))
            .take(limit)
            .collect()
    }

    /// The highest-ranked item, if any.
    pub async fn get_top_story(&self) -> Option<NewsItem> {
        self.dataset_with(false).await.into_iter().next()
    }

    pub async fn get_stats(&self) -> NewsStats {
        NewsStats::from_items(&self.dataset_with(false).await)
    }

    /// Drops the cached cycle; returns whether one existed.
    pub fn clear_cache(&self) -> bool {
        let cleared = self.cache.clear();
        tracing::info!(cleared, "News cache cleared");
        cleared
    }

    /// The full ranked list behind the query operations: the cached cycle
    /// when fresh and not bypassed, otherwise a new cycle.
    async fn dataset_with(&self, force_refresh: bool) -> Vec<NewsItem> {
        if !force_refresh {
            if let Some(record) = self.load_cache().await {
                return record.news;
            }
        }
        self.refresh().await.items
    }

    // Cache stores do blocking file I/O, so they run on the blocking pool.

    async fn load_cache(&self) -> Option<CacheRecord> {
        let cache = Arc::clone(&self.cache);
        match tokio::task::spawn_blocking(move || cache.load()).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Cache load task failed, treating as miss");
                None
            }
        }
    }

    async fn save_cache(&self, items: &[NewsItem]) {
        let cache = Arc::clone(&self.cache);
        let items = items.to_vec();
        if let Err(e) = tokio::task::spawn_blocking(move || cache.save(&items)).await {
            tracing::warn!(error = %e, "Cache save task failed");
        }
    }

    /// Runs a full fetch cycle and writes the cache.
    async fn refresh(&self) -> Aggregation {
        let now = Utc::now();
        let outcomes = self.fetch_all_sources().await;

        let mut report = CycleReport::default();
        let mut scored = Vec::new();

        for (source, outcome) in outcomes {
            match outcome {
                Ok(raw_items) => {
                    tracing::info!(source = %source.key, items = raw_items.len(), "Source fetched");
                    report.sources_ok.push(source.key.clone());
                    scored.extend(self.score_items(&source, raw_items, now));
                }
                Err(e) => {
                    tracing::warn!(source = %source.key, error = %e, "Source failed, skipping");
                    report.sources_failed.push((source.key.clone(), e.to_string()));
                }
            }
        }

        let items = self.rank(scored, now);

        if report.is_degraded() {
            // Keep whatever the previous cycle wrote
            tracing::warn!(
                failed = report.sources_failed.len(),
                "Every source failed, cache left untouched"
            );
        } else {
            self.save_cache(&items).await;
        }

        tracing::info!(
            items = items.len(),
            sources_ok = report.sources_ok.len(),
            sources_failed = report.sources_failed.len(),
            "Aggregation cycle complete"
        );

        Aggregation { items, report }
    }

    /// Fans out to every source and returns the outcomes in registry order.
    async fn fetch_all_sources(
        &self,
    ) -> Vec<(Arc<SourceDescriptor>, Result<Vec<RawItem>, SourceError>)> {
        let concurrency = self.registry.len().max(1);

        let mut outcomes: Vec<(usize, Arc<SourceDescriptor>, Result<Vec<RawItem>, SourceError>)> =
            stream::iter(self.registry.iter().cloned().enumerate())
                .map(|(idx, source)| async move {
                    let outcome = self.fetch_source(&source).await;
                    (idx, source, outcome)
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        // Completion order is arbitrary; dedupe ties depend on input order
        outcomes.sort_by_key(|(idx, _, _)| *idx);
        outcomes
            .into_iter()
            .map(|(_, source, outcome)| (source, outcome))
            .collect()
    }

    async fn fetch_source(&self, source: &SourceDescriptor) -> Result<Vec<RawItem>, SourceError> {
        match &source.endpoint {
            SourceEndpoint::Feed { url } => Ok(fetch_feed(&self.http, url).await?.items),
            SourceEndpoint::Search { base_url, queries } => {
                SearchAdapter::new(self.http.clone(), &source.key, base_url, queries)
                    .fetch_all()
                    .await
            }
            SourceEndpoint::Listing { endpoints } => {
                ListingAdapter::new(self.http.clone(), &source.key, endpoints)
                    .fetch_all()
                    .await
            }
        }
    }

    fn score_items(
        &self,
        source: &SourceDescriptor,
        raw_items: Vec<RawItem>,
        now: DateTime<Utc>,
    ) -> Vec<NewsItem> {
        raw_items
            .into_iter()
            .map(|raw| {
                let scores = self.scorer.score(&raw, source.credibility, now);
                NewsItem::from_raw(raw, source, scores, self.settings.relevance_threshold)
            })
            .collect()
    }

    /// Filter, sort by total descending, then dedupe.
    fn rank(&self, items: Vec<NewsItem>, now: DateTime<Utc>) -> Vec<NewsItem> {
        let window_ms = i64::try_from(self.settings.recency_window.as_millis()).unwrap_or(i64::MAX);
        let before = items.len();

        let mut filtered: Vec<NewsItem> = items
            .into_iter()
            .filter(|item| item.is_relevant)
            .filter(|item| (now - item.date_time).num_milliseconds() <= window_ms)
            .collect();
        let after_filter = filtered.len();

        // Dedupe must see the best-scored copy of a story first; the kept
        // order is then already descending by total
        filtered.sort_by(|a, b| b.scores.total.total_cmp(&a.scores.total));
        let ranked = dedupe(filtered, self.settings.similarity_threshold);

        tracing::debug!(
            scored = before,
            kept_after_filter = after_filter,
            kept_after_dedupe = ranked.len(),
            "Ranked news items"
        );
        ranked
    }
}
