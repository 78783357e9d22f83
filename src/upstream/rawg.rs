//! RAWG API client over `reqwest`.
//!
//! The API key travels as the `key` query parameter on every request and is
//! never logged.

use super::{FetchError, FetchResult, Payload, UpstreamClient};
use crate::caching::{NormalizedQuery, ResourceFamily};
use crate::core::error::{ProxyError, ProxyResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

/// Upstream error bodies are cut to this many characters in error details.
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Upstream API configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the catalog API, without trailing slash
    pub base_url: String,

    /// API credential, attached to every request
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.rawg.io/api".to_string(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Client for the RAWG catalog API.
#[derive(Clone)]
pub struct RawgClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl RawgClient {
    pub fn new(config: &UpstreamConfig) -> ProxyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProxyError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            timeout: config.timeout,
        })
    }

    fn url_for(&self, family: ResourceFamily, segment: Option<&str>) -> String {
        let encoded = segment.map(|s| urlencoding::encode(s).into_owned());
        format!("{}{}", self.base_url, family.upstream_path(encoded.as_deref()))
    }

    async fn get_json(&self, url: String, params: Vec<(&str, String)>) -> FetchResult<Payload> {
        let mut request = self.http.get(&url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key.as_str())]);
        }
        if !params.is_empty() {
            request = request.query(&params);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        response.json::<Payload>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(self.timeout)
            } else {
                FetchError::Decode(e.without_url().to_string())
            }
        })
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            // The URL carries the API key.
            FetchError::Network(err.without_url().to_string())
        }
    }
}

#[async_trait]
impl UpstreamClient for RawgClient {
    #[instrument(skip(self, params))]
    async fn fetch_collection(
        &self,
        family: ResourceFamily,
        params: &NormalizedQuery,
    ) -> FetchResult<Payload> {
        let url = self.url_for(family, None);
        debug!(path = %family.upstream_path(None), params = %params.to_query_string(), "Fetching collection from upstream");
        self.get_json(url, params.pairs()).await
    }

    #[instrument(skip(self))]
    async fn fetch_item(&self, family: ResourceFamily, segment: &str) -> FetchResult<Payload> {
        let url = self.url_for(family, Some(segment));
        debug!("Fetching item from upstream");
        self.get_json(url, Vec::new()).await
    }
}
