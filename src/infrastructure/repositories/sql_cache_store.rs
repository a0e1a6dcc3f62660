use super::cache_store::CacheStore;
use crate::domain::cache::{CacheEntry, CacheError};
use crate::infrastructure::db::{create_pool, DbPool};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::FromRow;
use std::collections::HashMap;
use tokio::sync::OnceCell;

#[derive(Debug, FromRow)]
struct CacheRecord {
    cache_key: String,
    created_at_ms: i64,
    status: i64,
    payload: Vec<u8>,
    headers: String,
}

impl CacheRecord {
    fn into_entry(self) -> Result<CacheEntry, CacheError> {
        let timestamp: DateTime<Utc> = Utc
            .timestamp_millis_opt(self.created_at_ms)
            .single()
            .ok_or_else(|| {
                CacheError::Unavailable(format!("invalid timestamp {} for cached entry", self.created_at_ms))
            })?;
        let status = u16::try_from(self.status)
            .map_err(|_| CacheError::Unavailable(format!("invalid status {} for cached entry", self.status)))?;
        let response_metadata: HashMap<String, String> = serde_json::from_str(&self.headers)?;

        Ok(CacheEntry {
            key: self.cache_key,
            timestamp,
            status,
            payload: self.payload,
            response_metadata,
        })
    }
}

/// Structured-record cache store backed by SQLite.
///
/// The pool is opened, and the table created, on first use.
pub struct SqlCacheStore {
    database_url: String,
    pool: OnceCell<DbPool>,
}

impl SqlCacheStore {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            pool: OnceCell::new(),
        }
    }

    async fn pool(&self) -> Result<&DbPool, CacheError> {
        self.pool
            .get_or_try_init(|| async {
                tracing::debug!(database_url = %self.database_url, "Opening response cache database");
                let pool = create_pool(&self.database_url).await?;
                Self::create_schema(&pool).await?;
                Ok::<_, CacheError>(pool)
            })
            .await
    }

    async fn create_schema(pool: &DbPool) -> Result<(), CacheError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS response_cache (
                cache_key TEXT PRIMARY KEY NOT NULL,
                created_at_ms INTEGER NOT NULL,
                status INTEGER NOT NULL,
                payload BLOB NOT NULL,
                headers TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CacheStore for SqlCacheStore {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>, CacheError> {
        let pool = self.pool().await?;

        let record = sqlx::query_as::<_, CacheRecord>(
            r#"
            SELECT cache_key, created_at_ms, status, payload, headers
            FROM response_cache
            WHERE cache_key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;

        record.map(CacheRecord::into_entry).transpose()
    }

    async fn put(&self, entry: CacheEntry) -> Result<(), CacheError> {
        let pool = self.pool().await?;
        let headers = serde_json::to_string(&entry.response_metadata)?;

        sqlx::query(
            r#"
            INSERT INTO response_cache (cache_key, created_at_ms, status, payload, headers)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT (cache_key)
            DO UPDATE SET
                created_at_ms = excluded.created_at_ms,
                status = excluded.status,
                payload = excluded.payload,
                headers = excluded.headers
            "#,
        )
        .bind(&entry.key)
        .bind(entry.timestamp.timestamp_millis())
        .bind(i64::from(entry.status))
        .bind(&entry.payload)
        .bind(headers)
        .execute(pool)
        .await?;

        Ok(())
    }
}
