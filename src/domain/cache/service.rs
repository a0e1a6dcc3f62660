use super::clock::{Clock, SystemClock};
use super::error::FetchError;
use super::key::CacheKeyBuilder;
use super::model::{CacheEntry, FetchRequest, FetchResponse};
use crate::infrastructure::http::HttpTransport;
use crate::infrastructure::repositories::CacheStore;
use std::sync::Arc;
use std::time::Duration;

/// Freshness window used when a request does not set `maxAge`
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(3600);

/// Network fetch with a best-effort response cache in front of it.
///
/// Caching can make a call faster but never makes it fail: store and
/// serialization errors are logged and the request goes to the network.
/// Network errors pass through untouched.
pub struct CachedFetch {
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn CacheStore>,
    key_builder: CacheKeyBuilder,
    clock: Arc<dyn Clock>,
    default_max_age: Duration,
}

impl CachedFetch {
    pub fn new(transport: Arc<dyn HttpTransport>, store: Arc<dyn CacheStore>) -> Self {
        Self {
            transport,
            store,
            key_builder: CacheKeyBuilder::default(),
            clock: Arc::new(SystemClock),
            default_max_age: DEFAULT_MAX_AGE,
        }
    }

    pub fn with_key_builder(mut self, key_builder: CacheKeyBuilder) -> Self {
        self.key_builder = key_builder;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// A zero default disables caching for requests that leave `maxAge` unset
    pub fn with_default_max_age(mut self, default_max_age: Duration) -> Self {
        self.default_max_age = default_max_age;
        self
    }

    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        if request.cache.skip_cache {
            tracing::debug!(url = %request.url, "Cache skipped by request");
            return self.transport.send(request).await;
        }

        let Some(max_age) = request.cache.max_age.resolve(self.default_max_age) else {
            tracing::debug!(url = %request.url, "Cache disabled for request");
            return self.transport.send(request).await;
        };

        let key = match self.key_builder.build(request) {
            Ok(key) => key,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    url = %request.url,
                    "Failed to build cache key, fetching without cache"
                );
                return self.transport.send(request).await;
            }
        };

        match self.store.get(&key).await {
            Ok(Some(entry)) if entry.is_fresh(self.clock.now(), max_age) => {
                tracing::debug!(
                    url = %request.url,
                    cached_at = %entry.timestamp,
                    payload_size = entry.payload.len(),
                    "Cache hit - returning cached response"
                );
                return Ok(entry.to_response());
            }
            Ok(Some(entry)) => {
                tracing::debug!(
                    url = %request.url,
                    cached_at = %entry.timestamp,
                    max_age_secs = max_age.as_secs(),
                    "Cache entry stale - refetching"
                );
            }
            Ok(None) => {
                tracing::debug!(url = %request.url, "Cache miss");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    url = %request.url,
                    "Cache lookup failed, fetching without cache"
                );
                return self.transport.send(request).await;
            }
        }

        let response = self.transport.send(request).await?;

        // Only successful responses are captured; anything else is the caller's to interpret
        if response.is_success() {
            self.store_response(key, request, &response).await;
        }

        Ok(response)
    }

    async fn store_response(&self, key: String, request: &FetchRequest, response: &FetchResponse) {
        let entry = CacheEntry::capture(key, self.clock.now(), response);
        let payload_size = entry.payload.len();

        match self.store.put(entry).await {
            Ok(()) => {
                tracing::debug!(
                    url = %request.url,
                    payload_size = payload_size,
                    "Response cached"
                );
            }
            Err(e) => {
                // The response is already in hand; a failed write only costs a future miss
                tracing::warn!(
                    error = %e,
                    url = %request.url,
                    "Failed to store response in cache"
                );
            }
        }
    }
}
