use super::error::CacheError;
use super::model::FetchRequest;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Canonical form of the request 4-tuple. Field order is fixed and headers
/// are sorted, so equal requests serialise to equal strings.
#[derive(Serialize)]
struct CanonicalRequest<'a> {
    method: String,
    url: &'a str,
    headers: BTreeMap<String, &'a str>,
    body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyStrategy {
    Canonical,
    Sha256,
}

/// Derives a stable cache key from method, URL, headers and body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKeyBuilder {
    strategy: KeyStrategy,
}

/// Hashed, so header values such as credentials never appear in a stored key
impl Default for CacheKeyBuilder {
    fn default() -> Self {
        Self::hashed()
    }
}

impl CacheKeyBuilder {
    /// Use the canonical JSON text directly as the key.
    ///
    /// Readable for debugging, but header values (including `Authorization`) are kept verbatim.
    pub fn canonical() -> Self {
        Self {
            strategy: KeyStrategy::Canonical,
        }
    }

    /// Bound key length with `sha256:<hex>` of the canonical text
    pub fn hashed() -> Self {
        Self {
            strategy: KeyStrategy::Sha256,
        }
    }

    pub fn build(&self, request: &FetchRequest) -> Result<String, CacheError> {
        self.build_key(&request.url, &request.method, &request.headers, request.body.as_deref())
    }

    pub fn build_key<'a, H>(
        &self,
        url: &str,
        method: &str,
        headers: H,
        body: Option<&[u8]>,
    ) -> Result<String, CacheError>
    where
        H: IntoIterator<Item = (&'a String, &'a String)>,
    {
        // Header names are case-insensitive on the wire
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value.as_str()))
            .collect();

        let canonical = CanonicalRequest {
            method: method.to_ascii_uppercase(),
            url,
            headers,
            body: body.map(|bytes| STANDARD.encode(bytes)),
        };
        let text = serde_json::to_string(&canonical)?;

        Ok(match self.strategy {
            KeyStrategy::Canonical => text,
            KeyStrategy::Sha256 => format!("sha256:{}", hex::encode(Sha256::digest(text.as_bytes()))),
        })
    }
}
