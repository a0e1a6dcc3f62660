use crate::domain::cache::{CacheEntry, CacheError};
use async_trait::async_trait;

/// Persistent key/value store for captured responses.
/// Abstracts the underlying backend (in-process response cache, SQL records, etc.)
///
/// Implementations are responsible for:
/// - Preserving payload bytes and header metadata exactly through a write/read round trip
/// - Being safe for concurrent access from independent tasks
/// - Replacing an existing entry when a new one is written under the same key
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up an entry. A missing key is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError>;

    /// Write an entry under `entry.key`, superseding any previous one
    async fn put(&self, entry: CacheEntry) -> Result<(), CacheError>;
}
