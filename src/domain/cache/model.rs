use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// How long a cached response stays fresh.
///
/// Deserialises from the wire shape `maxAge?: int | null`:
/// an omitted field is `Default`, `null` and `0` are `Disabled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(from = "Option<u64>")]
pub enum MaxAge {
    /// Use the fetcher's configured default (3600 seconds unless overridden)
    #[default]
    Default,
    /// Bypass the store entirely: no read, no write
    Disabled,
    Seconds(u64),
}

impl MaxAge {
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            MaxAge::Disabled
        } else {
            MaxAge::Seconds(secs)
        }
    }

    /// Resolve against the fetcher default. `None` means caching is off for this call.
    pub fn resolve(self, default: Duration) -> Option<Duration> {
        match self {
            MaxAge::Default if default.is_zero() => None,
            MaxAge::Default => Some(default),
            MaxAge::Disabled => None,
            MaxAge::Seconds(secs) => Some(Duration::from_secs(secs)),
        }
    }
}

impl From<Option<u64>> for MaxAge {
    fn from(value: Option<u64>) -> Self {
        match value {
            None => MaxAge::Disabled,
            Some(secs) => MaxAge::from_secs(secs),
        }
    }
}

/// Per-call cache controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheOptions {
    #[serde(default)]
    pub max_age: MaxAge,
    #[serde(default)]
    pub skip_cache: bool,
}

impl CacheOptions {
    pub fn disabled() -> Self {
        Self {
            max_age: MaxAge::Disabled,
            skip_cache: false,
        }
    }

    pub fn max_age_secs(secs: u64) -> Self {
        Self {
            max_age: MaxAge::from_secs(secs),
            skip_cache: false,
        }
    }
}

/// An outgoing request as seen by the cache layer
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<Vec<u8>>,
    #[serde(default, rename = "cacheOptions")]
    pub cache: CacheOptions,
}

fn default_method() -> String {
    "GET".to_string()
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: HashMap::new(),
            body: None,
            cache: CacheOptions::default(),
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            method: "POST".to_string(),
            body: Some(body.into()),
            ..Self::get(url)
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_cache(mut self, cache: CacheOptions) -> Self {
        self.cache = cache;
        self
    }
}

/// A response body plus the metadata callers look at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A captured response. Immutable once written; a newer entry under the same key replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: String,
    pub timestamp: DateTime<Utc>,
    pub status: u16,
    pub payload: Vec<u8>,
    pub response_metadata: HashMap<String, String>,
}

impl CacheEntry {
    pub fn capture(key: String, timestamp: DateTime<Utc>, response: &FetchResponse) -> Self {
        Self {
            key,
            timestamp,
            status: response.status,
            payload: response.body.clone(),
            response_metadata: response.headers.clone(),
        }
    }

    /// Fresh while `now - timestamp < max_age`
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        let age = now.signed_duration_since(self.timestamp);
        match chrono::Duration::from_std(max_age) {
            Ok(max_age) => age < max_age,
            // Larger than chrono can represent: never stale
            Err(_) => true,
        }
    }

    pub fn to_response(&self) -> FetchResponse {
        FetchResponse {
            status: self.status,
            headers: self.response_metadata.clone(),
            body: self.payload.clone(),
        }
    }
}
