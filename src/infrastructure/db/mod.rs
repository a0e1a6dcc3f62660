use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::time::Duration;

pub type DbPool = Pool<Sqlite>;

pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    // Every connection to an in-memory database sees its own empty database,
    // so keep exactly one and never recycle it.
    let in_memory = database_url.contains(":memory:");

    SqlitePoolOptions::new()
        .max_connections(if in_memory { 1 } else { 5 })
        .idle_timeout(if in_memory { None } else { Some(Duration::from_secs(600)) })
        .max_lifetime(if in_memory { None } else { Some(Duration::from_secs(1800)) })
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
}
