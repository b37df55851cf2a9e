//! In-memory TTL cache for per-source results.
//!
//! Interactive callers often revisit a query they typed a moment ago
//! (backspacing over a character, re-enabling a filter chip). Successful
//! per-source results are cached under `(source, normalized text, limit)`
//! with [`moka`] handling TTL and eviction. Failures are never cached.

use std::time::Duration;

use moka::future::Cache;

use crate::types::{SearchResult, SourceKind};

/// Maximum number of cached per-source result lists.
const MAX_CACHE_ENTRIES: u64 = 512;

/// Cache key for one source's answer to one query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    kind: SourceKind,
    text: String,
    limit: usize,
}

impl CacheKey {
    /// `text` must already be normalized (see [`crate::query::normalize_text`]).
    pub fn new(kind: SourceKind, text: &str, limit: usize) -> Self {
        Self {
            kind,
            text: text.to_owned(),
            limit,
        }
    }
}

/// Per-aggregator result cache.
#[derive(Clone)]
pub struct ResultCache {
    inner: Cache<CacheKey, Vec<SearchResult>>,
}

impl ResultCache {
    /// Build a cache with the given TTL. Returns `None` when `ttl_seconds` is 0.
    pub fn new(ttl_seconds: u64) -> Option<Self> {
        if ttl_seconds == 0 {
            return None;
        }
        let inner = Cache::builder()
            .max_capacity(MAX_CACHE_ENTRIES)
            .time_to_live(Duration::from_secs(ttl_seconds))
            .build();
        Some(Self { inner })
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Vec<SearchResult>> {
        self.inner.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, results: Vec<SearchResult>) {
        self.inner.insert(key, results).await;
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}
