//! Persistence for aggregation results.

mod cache;

pub use cache::{
    CacheError, CacheRecord, CacheStore, FileCacheStore, MemoryCacheStore, DEFAULT_CACHE_TTL,
};
