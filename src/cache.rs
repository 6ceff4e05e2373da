use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use mongodb::bson::Document;
use tracing::debug;

use crate::error::Result;

/// How long a cached sample stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// The record collection a cached sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    Students,
    Companies,
    Placements,
}

impl CacheKind {
    pub fn label(self) -> &'static str {
        match self {
            CacheKind::Students => "students",
            CacheKind::Companies => "companies",
            CacheKind::Placements => "placements",
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    fetched_at: Instant,
    documents: Vec<Document>,
}

/// In-memory TTL cache for capped collection samples, keyed by collection
/// kind and fetch limit. Different limits are distinct entries; a dashboard
/// sample of 500 does not satisfy a warm-up sample of 100.
#[derive(Debug)]
pub struct SampleCache {
    ttl: Duration,
    entries: Mutex<HashMap<(CacheKind, i64), CacheEntry>>,
}

impl Default for SampleCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// A fresh copy of the sample, if one is cached and within TTL.
    pub fn get(&self, kind: CacheKind, limit: i64) -> Option<Vec<Document>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&(kind, limit))?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.documents.clone())
        } else {
            None
        }
    }

    pub fn put(&self, kind: CacheKind, limit: i64, documents: Vec<Document>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            (kind, limit),
            CacheEntry {
                fetched_at: Instant::now(),
                documents,
            },
        );
    }

    /// Drop every cached sample of the given kind, whatever its limit.
    /// Returns the number of entries removed.
    pub fn invalidate(&self, kind: CacheKind) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|(k, _), _| *k != kind);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(kind = kind.label(), removed, "cache invalidated");
        }
        removed
    }

    /// Serve from cache or run `fetch` and remember its result. Fetch
    /// failures are returned as-is and cache nothing.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        kind: CacheKind,
        limit: i64,
        fetch: F,
    ) -> Result<Vec<Document>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Document>>>,
    {
        if let Some(documents) = self.get(kind, limit) {
            debug!(kind = kind.label(), limit, "cache hit");
            return Ok(documents);
        }
        debug!(kind = kind.label(), limit, "cache miss");
        let documents = fetch().await?;
        self.put(kind, limit, documents.clone());
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;

    use super::*;

    fn sample(n: i32) -> Vec<Document> {
        (0..n).map(|i| doc! { "i": i }).collect()
    }

    #[test]
    fn get_returns_fresh_entries_only() {
        let cache = SampleCache::with_ttl(Duration::from_secs(60));
        cache.put(CacheKind::Students, 100, sample(3));
        assert_eq!(cache.get(CacheKind::Students, 100).map(|d| d.len()), Some(3));
        assert!(cache.get(CacheKind::Students, 500).is_none());
        assert!(cache.get(CacheKind::Companies, 100).is_none());
    }

    #[test]
    fn expired_entries_miss() {
        let cache = SampleCache::with_ttl(Duration::ZERO);
        cache.put(CacheKind::Students, 100, sample(3));
        assert!(cache.get(CacheKind::Students, 100).is_none());
    }

    #[test]
    fn invalidate_clears_one_kind_across_limits() {
        let cache = SampleCache::new();
        cache.put(CacheKind::Companies, 50, sample(1));
        cache.put(CacheKind::Companies, 300, sample(2));
        cache.put(CacheKind::Placements, 50, sample(3));

        assert_eq!(cache.invalidate(CacheKind::Companies), 2);
        assert!(cache.get(CacheKind::Companies, 50).is_none());
        assert!(cache.get(CacheKind::Companies, 300).is_none());
        assert_eq!(cache.get(CacheKind::Placements, 50).map(|d| d.len()), Some(3));
    }

    #[tokio::test]
    async fn get_or_fetch_runs_fetch_once() {
        let cache = SampleCache::new();
        let mut calls = 0;

        for _ in 0..3 {
            let documents = cache
                .get_or_fetch(CacheKind::Students, 100, || {
                    calls += 1;
                    async { Ok(sample(2)) }
                })
                .await
                .unwrap();
            assert_eq!(documents.len(), 2);
        }
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn get_or_fetch_error_caches_nothing() {
        let cache = SampleCache::new();
        let err = cache
            .get_or_fetch(CacheKind::Students, 100, || async {
                Err(crate::error::Error::Validation("boom".to_string()))
            })
            .await;
        assert!(err.is_err());
        assert!(cache.get(CacheKind::Students, 100).is_none());
    }
}
