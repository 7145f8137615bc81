use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::NewsItem;

/// Default freshness window for a cached cycle (2 hours)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Errors raised by the file-backed cache. [`CacheStore`] methods log these
/// and degrade to "no cache"; the `read`/`write` methods on
/// [`FileCacheStore`] expose them directly.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read cache file: {0}")]
    ReadFailure(#[source] std::io::Error),

    #[error("Failed to write cache file: {0}")]
    WriteFailure(#[source] std::io::Error),

    #[error("Cache file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// One aggregation cycle's output, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheRecord {
    /// Write time, epoch milliseconds
    pub timestamp: i64,
    pub fetched_at: DateTime<Utc>,
    pub count: usize,
    pub news: Vec<NewsItem>,
}

impl CacheRecord {
    pub fn new(news: Vec<NewsItem>, now: DateTime<Utc>) -> Self {
        Self {
            timestamp: now.timestamp_millis(),
            fetched_at: now,
            count: news.len(),
            news,
        }
    }

    /// Age relative to `now`; records stamped in the future count as age 0.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let millis = now.timestamp_millis().saturating_sub(self.timestamp).max(0);
        Duration::from_millis(millis as u64)
    }

    /// Fresh until strictly older than `ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) <= ttl
    }
}

/// Cache-aside storage for the latest aggregation cycle.
///
/// All operations are best-effort: failures are logged and reported as a
/// miss (`load`), ignored (`save`), or `false` (`clear`).
pub trait CacheStore: Send + Sync {
    /// Returns the cached cycle if present, readable and within the TTL.
    fn load(&self) -> Option<CacheRecord>;

    /// Replaces the cached cycle.
    fn save(&self, items: &[NewsItem]);

    /// Removes the cached cycle, returning whether one existed.
    fn clear(&self) -> bool;
}

// ============================================================================
// File-backed store
// ============================================================================

/// JSON file cache, replaced atomically on every write.
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    path: PathBuf,
    ttl: Duration,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            path: path.into(),
            ttl,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reads the record regardless of age. `Ok(None)` when no file exists.
    pub fn read(&self) -> Result<Option<CacheRecord>, CacheError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::ReadFailure(e)),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Writes `record` via a uniquely named temp file and a rename, so readers
    /// never observe a partial file.
    pub fn write(&self, record: &CacheRecord) -> Result<(), CacheError> {
        let content = serde_json::to_vec_pretty(record)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(CacheError::WriteFailure)?;
        }

        let suffix: u64 = rand::rng().random();
        let temp_path = self.path.with_extension(format!("tmp.{:016x}", suffix));

        let result = write_then_rename(&temp_path, &self.path, &content);
        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
        }
        result.map_err(CacheError::WriteFailure)
    }
}

fn write_then_rename(temp_path: &Path, dst: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut temp_file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp_path)?;
    temp_file.write_all(content)?;
    temp_file.sync_all()?;
    drop(temp_file);

    // rename() does not replace an existing file on Windows
    #[cfg(windows)]
    if dst.exists() {
        std::fs::remove_file(dst)?;
    }

    std::fs::rename(temp_path, dst)
}

impl CacheStore for FileCacheStore {
    fn load(&self) -> Option<CacheRecord> {
        let record = match self.read() {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable cache");
                return None;
            }
        };

        let now = Utc::now();
        if !record.is_fresh(now, self.ttl) {
            tracing::debug!(
                path = %self.path.display(),
                age_secs = record.age(now).as_secs(),
                "Cache expired"
            );
            return None;
        }
        Some(record)
    }

    fn save(&self, items: &[NewsItem]) {
        let record = CacheRecord::new(items.to_vec(), Utc::now());
        match self.write(&record) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), count = record.count, "Cache written")
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to write cache")
            }
        }
    }

    fn clear(&self) -> bool {
        match std::fs::remove_file(&self.path) {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to clear cache");
                false
            }
        }
    }
}

// ============================================================================
// In-memory store
// ============================================================================

/// Process-local cache with the same TTL semantics as the file store.
#[derive(Debug)]
pub struct MemoryCacheStore {
    record: Mutex<Option<CacheRecord>>,
    ttl: Duration,
}

impl MemoryCacheStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            record: Mutex::new(None),
            ttl,
        }
    }

    /// Seeds the store with an existing record (any age).
    pub fn with_record(record: CacheRecord, ttl: Duration) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            ttl,
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<CacheRecord>> {
        // A panic while holding the lock cannot leave a record half-written
        self.record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

impl CacheStore for MemoryCacheStore {
    fn load(&self) -> Option<CacheRecord> {
        self.slot()
            .as_ref()
            .filter(|record| record.is_fresh(Utc::now(), self.ttl))
            .cloned()
    }

    fn save(&self, items: &[NewsItem]) {
        *self.slot() = Some(CacheRecord::new(items.to_vec(), Utc::now()));
    }

    fn clear(&self) -> bool {
        self.slot().take().is_some()
    }
}
