//! Memoized vector search.
//!
//! Wraps any [`VectorSearch`] backend with an [`LruTtlCache`] keyed by the
//! normalized query and the sorted collection set. Backend errors pass
//! straight through and are never cached.

use async_trait::async_trait;
use lexiscope_core::{CacheKey, FetchError, RetrievedChunk, VectorSearch};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::lru_ttl::{CacheStats, LruTtlCache};

pub struct CachedSearch {
    backend: Arc<dyn VectorSearch>,
    cache: LruTtlCache<String, Vec<RetrievedChunk>>,
}

impl CachedSearch {
    pub fn new(backend: Arc<dyn VectorSearch>, capacity: usize, ttl: Duration) -> Self {
        Self {
            backend,
            cache: LruTtlCache::new("search", capacity, ttl),
        }
    }

    /// Cache key: digest of (query, collections) plus the result shape.
    fn cache_key(query: &str, collections: &[String], limit: usize, min_score: f32) -> String {
        let key = CacheKey::new(query, collections);
        format!("{}:{limit}:{min_score:.3}", key.digest())
    }

    /// Search through the cache. The boolean reports whether the result was
    /// served from the cache.
    pub async fn search_cached(
        &self,
        query: &str,
        collections: &[String],
        limit: usize,
        min_score: f32,
    ) -> Result<(Vec<RetrievedChunk>, bool), FetchError> {
        let key = Self::cache_key(query, collections, limit, min_score);
        let (chunks, was_cached) = self
            .cache
            .try_get_or_fetch(key, || {
                self.backend.search(query, collections, limit, min_score)
            })
            .await?;

        debug!(
            backend = self.backend.name(),
            results = chunks.len(),
            was_cached,
            "Vector search"
        );
        Ok((chunks, was_cached))
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear(&self) {
        self.cache.clear().await;
    }
}

#[async_trait]
impl VectorSearch for CachedSearch {
    fn name(&self) -> &str {
        "cached_search"
    }

    async fn search(
        &self,
        query: &str,
        collections: &[String],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<RetrievedChunk>, FetchError> {
        self.search_cached(query, collections, limit, min_score)
            .await
            .map(|(chunks, _)| chunks)
    }
}
