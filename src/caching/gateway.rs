//! # Read-Through Gateway
//!
//! Per request: build the key, look it up, and on a miss fetch from upstream
//! and store the payload with the family's TTL.
//!
//! Failure handling is deliberately asymmetric. Upstream failures are the only
//! errors a caller ever sees, and they are never written to the store. A
//! failed or timed-out cache read counts as a miss, and a failed cache write
//! is logged while the fresh payload is still returned. An unavailable cache
//! therefore degrades to "always fetch from upstream".

use super::{
    CacheKey, CacheStore, KeyBuilder, NormalizedQuery, RawParams, ResourceFamily, SingleFlight,
    TtlPolicy,
};
use crate::core::error::{ProxyError, ProxyResult};
use crate::upstream::{FetchResult, Payload, UpstreamClient};
use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Whether a response came from the store or from upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CacheOutcome {
    Hit,
    Miss,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

/// Successful result of [`ReadThroughGateway::handle`].
#[derive(Debug, Clone)]
pub struct GatewayResponse {
    pub payload: Payload,
    pub outcome: CacheOutcome,
    pub key: CacheKey,
}

/// Everything a miss needs, owned so it can outlive the request that started it.
struct MissContext {
    store: Arc<dyn CacheStore>,
    upstream: Arc<dyn UpstreamClient>,
    family: ResourceFamily,
    segment: Option<String>,
    query: NormalizedQuery,
    key: CacheKey,
    ttl: Duration,
    operation_timeout: Duration,
}

/// Read-through cache in front of the upstream catalog.
pub struct ReadThroughGateway {
    store: Arc<dyn CacheStore>,
    upstream: Arc<dyn UpstreamClient>,
    keys: KeyBuilder,
    ttl: TtlPolicy,
    operation_timeout: Duration,
    single_flight: Option<SingleFlight<FetchResult<Payload>>>,
}

impl ReadThroughGateway {
    pub fn new(store: Arc<dyn CacheStore>, upstream: Arc<dyn UpstreamClient>, ttl: TtlPolicy) -> Self {
        Self {
            store,
            upstream,
            keys: KeyBuilder::new(),
            ttl,
            operation_timeout: Duration::from_secs(1),
            single_flight: None,
        }
    }

    /// Bound every store call by `timeout`.
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Share one upstream fetch between concurrent misses on the same key.
    pub fn with_single_flight(mut self, enabled: bool) -> Self {
        self.single_flight = enabled.then(SingleFlight::new);
        self
    }

    pub fn ttl_policy(&self) -> &TtlPolicy {
        &self.ttl
    }

    /// Serve one catalog request through the cache.
    #[instrument(skip(self, raw_params), fields(key))]
    pub async fn handle(
        &self,
        family: ResourceFamily,
        segment: Option<&str>,
        raw_params: &RawParams,
    ) -> ProxyResult<GatewayResponse> {
        let segment = segment.map(str::trim).filter(|s| !s.is_empty());
        if family.requires_segment() && segment.is_none() {
            return Err(ProxyError::validation("slug", format!("{} requires a slug", family.description())));
        }
        // Dot segments would be collapsed by URL resolution and hit another endpoint.
        if let Some(dots @ ("." | "..")) = segment {
            return Err(ProxyError::validation("slug", format!("'{}' is not a valid slug", dots)));
        }

        let query = NormalizedQuery::from_raw(family, raw_params);
        let key = self.keys.key_for(family, segment, &query);
        tracing::Span::current().record("key", key.as_str());

        if let Some(payload) = self.lookup(family, &key).await {
            counter!("cache_requests_total", "family" => family.as_str(), "outcome" => "hit").increment(1);
            debug!("Cache hit");
            return Ok(GatewayResponse {
                payload,
                outcome: CacheOutcome::Hit,
                key,
            });
        }

        counter!("cache_requests_total", "family" => family.as_str(), "outcome" => "miss").increment(1);
        debug!("Cache miss, fetching from upstream");

        let miss = MissContext {
            store: self.store.clone(),
            upstream: self.upstream.clone(),
            family,
            segment: segment.map(str::to_string),
            query,
            key: key.clone(),
            ttl: self.ttl.ttl_for(family),
            operation_timeout: self.operation_timeout,
        };

        let result = match &self.single_flight {
            Some(flights) => flights.run(key.as_str(), move || fetch_and_store(miss)).await.0,
            None => fetch_and_store(miss).await,
        };

        match result {
            Ok(payload) => Ok(GatewayResponse {
                payload,
                outcome: CacheOutcome::Miss,
                key,
            }),
            Err(source) => {
                counter!("upstream_failures_total", "family" => family.as_str(), "kind" => source.kind()).increment(1);
                warn!(error = %source, "Upstream fetch failed, nothing cached");
                Err(ProxyError::upstream(family, source))
            }
        }
    }

    /// Look `key` up, treating every kind of read failure as a miss.
    async fn lookup(&self, family: ResourceFamily, key: &CacheKey) -> Option<Payload> {
        let read = tokio::time::timeout(self.operation_timeout, self.store.get(key.as_str())).await;

        let bytes = match read {
            Ok(Ok(Some(bytes))) => bytes,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                counter!("cache_errors_total", "family" => family.as_str(), "op" => "read").increment(1);
                warn!(error = %e, backend = self.store.backend_name(), "Cache read failed, treating as miss");
                return None;
            }
            Err(_) => {
                counter!("cache_errors_total", "family" => family.as_str(), "op" => "read").increment(1);
                warn!(backend = self.store.backend_name(), "Cache read timed out, treating as miss");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(payload) => Some(payload),
            Err(e) => {
                counter!("cache_errors_total", "family" => family.as_str(), "op" => "decode").increment(1);
                warn!(error = %e, "Cached entry is corrupt, refreshing from upstream");
                None
            }
        }
    }
}

/// Fetch from upstream and write the payload back best-effort.
async fn fetch_and_store(miss: MissContext) -> FetchResult<Payload> {
    let payload = match miss.segment.as_deref() {
        Some(segment) => miss.upstream.fetch_item(miss.family, segment).await?,
        None => miss.upstream.fetch_collection(miss.family, &miss.query).await?,
    };

    let bytes = match serde_json::to_vec(&payload) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key = %miss.key, error = %e, "Failed to serialize payload, skipping cache write");
            return Ok(payload);
        }
    };

    let write = tokio::time::timeout(
        miss.operation_timeout,
        miss.store.set_with_ttl(miss.key.as_str(), &bytes, miss.ttl),
    )
    .await;

    match write {
        Ok(Ok(())) => debug!(key = %miss.key, ttl_secs = miss.ttl.as_secs(), "Cached upstream payload"),
        Ok(Err(e)) => {
            counter!("cache_errors_total", "family" => miss.family.as_str(), "op" => "write").increment(1);
            warn!(key = %miss.key, error = %e, "Cache write failed, serving fresh payload anyway");
        }
        Err(_) => {
            counter!("cache_errors_total", "family" => miss.family.as_str(), "op" => "write").increment(1);
            warn!(key = %miss.key, "Cache write timed out, serving fresh payload anyway");
        }
    }

    Ok(payload)
}
