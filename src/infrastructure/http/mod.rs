use crate::domain::cache::{FetchError, FetchRequest, FetchResponse};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// Performs the actual network call for `CachedFetch`.
///
/// Non-2xx statuses are returned as responses, not errors. Timeouts are a
/// transport concern and configured here.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError>;
}

pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tts-relay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http_client })
    }

    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &FetchRequest) -> Result<FetchResponse, FetchError> {
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| FetchError::InvalidRequest(format!("invalid method {}: {}", request.method, e)))?;

        let mut builder = self.http_client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(
                error = %e,
                url = %request.url,
                method = %request.method,
                "HTTP request failed"
            );
            FetchError::from(e)
        })?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            url = %request.url,
            status = status,
            body_size = body.len(),
            "HTTP response received"
        );

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
