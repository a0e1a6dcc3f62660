/// Failures of the caching infrastructure itself.
///
/// These never reach callers of `CachedFetch::fetch`; they are logged and the
/// request falls back to the network.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Network failures. Surfaced to the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            FetchError::InvalidRequest(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}
