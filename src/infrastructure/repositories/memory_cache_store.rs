use super::cache_store::CacheStore;
use crate::domain::cache::{CacheEntry, CacheError};
use async_trait::async_trait;
use moka::future::Cache;

/// In-process response cache.
///
/// Bounded by entry count only. There is no time-based expiry here: stale
/// entries stay until replaced or evicted for capacity, and the fetcher
/// decides freshness.
pub struct MemoryCacheStore {
    cache: Cache<String, CacheEntry>,
}

impl MemoryCacheStore {
    pub fn new(max_capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(max_capacity).build(),
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        Ok(self.cache.get(key).await)
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), CacheError> {
        self.cache.insert(entry.key.clone(), entry).await;
        Ok(())
    }
}
