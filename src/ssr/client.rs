//! Remote SSR over HTTP.
//!
//! `HttpSsr` wraps an `SsrClient` with the retry policy, an overall timeout
//! and the response cache. The client itself only moves bytes.

use std::sync::Arc;
use std::time::Duration;

use wire::{Page, SsrResponse};

use super::cache::{SsrCache, cache_key};
use super::{SsrEngine, SsrError};
use crate::config::SsrConfig;

const CONNECT_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// CLIENT
// =============================================================================

/// Raw POST to the renderer. Returns the status and body bytes.
#[async_trait::async_trait]
pub trait SsrClient: Send + Sync {
    async fn post(&self, url: &str, body: Vec<u8>, headers: &[(String, String)]) -> Result<(u16, Vec<u8>), SsrError>;
}

pub struct ReqwestSsrClient {
    http: reqwest::Client,
}

impl ReqwestSsrClient {
    /// # Errors
    ///
    /// Returns [`SsrError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new() -> Result<Self, SsrError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SsrError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl SsrClient for ReqwestSsrClient {
    async fn post(&self, url: &str, body: Vec<u8>, headers: &[(String, String)]) -> Result<(u16, Vec<u8>), SsrError> {
        let mut request = self.http.post(url).body(body);
        if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type")) {
            request = request.header(reqwest::header::CONTENT_TYPE, "application/json");
        }
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await.map_err(|e| SsrError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|e| SsrError::Transport(e.to_string()))?;
        Ok((status, bytes.to_vec()))
    }
}

// =============================================================================
// ENGINE
// =============================================================================

pub struct HttpSsr {
    config: SsrConfig,
    client: Arc<dyn SsrClient>,
    cache: Option<SsrCache>,
}

impl HttpSsr {
    /// # Errors
    ///
    /// Returns [`SsrError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: SsrConfig) -> Result<Self, SsrError> {
        Ok(Self::with_client(config, Arc::new(ReqwestSsrClient::new()?)))
    }

    #[must_use]
    pub fn with_client(config: SsrConfig, client: Arc<dyn SsrClient>) -> Self {
        let config = config.normalized();
        let cache = SsrCache::new(config.cache_ttl, config.cache_max_entries);
        Self { config, client, cache }
    }

    #[must_use]
    pub fn cache(&self) -> Option<&SsrCache> {
        self.cache.as_ref()
    }

    async fn post_with_retry(&self, body: &[u8]) -> Result<(u16, Vec<u8>), SsrError> {
        let mut attempt = 0;
        loop {
            let result = self.client.post(&self.config.url, body.to_vec(), &self.config.headers).await;
            let status = result.as_ref().map_or(0, |(status, _)| *status);
            if !self.config.should_retry_status(status) || attempt >= self.config.max_retries {
                return result;
            }
            attempt += 1;
            tracing::warn!(
                attempt,
                url = %self.config.url,
                status,
                error = ?result.err(),
                "SSR retrying request"
            );
            tokio::time::sleep(self.config.retry_delay).await;
        }
    }
}

#[async_trait::async_trait]
impl SsrEngine for HttpSsr {
    async fn render(&self, page: &Page) -> Result<SsrResponse, SsrError> {
        let body = wire::encode_page(page);
        let key = cache_key(&body);
        if let Some(hit) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            return Ok(hit);
        }

        let attempt = self.post_with_retry(&body);
        let result = if self.config.timeout.is_zero() {
            attempt.await
        } else {
            tokio::time::timeout(self.config.timeout, attempt)
                .await
                .map_err(|_| SsrError::Timeout(self.config.timeout))?
        };
        let (status, bytes) = result.inspect_err(|e| {
            tracing::error!(error = %e, url = %self.config.url, "SSR request failed");
        })?;

        if status >= 400 {
            tracing::error!(status, url = %self.config.url, "SSR response error");
            return Err(SsrError::Status(status));
        }

        let response = wire::decode_ssr(&bytes)?;
        if let Some(cache) = &self.cache {
            cache.insert(key, response.clone());
        }
        Ok(response)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
