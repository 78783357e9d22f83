//! # HTTP Server Module
//!
//! Wires the configured cache store, the upstream client and the read-through
//! gateway into an Axum application and runs it.
//!
//! Layer order, outermost first: `TraceLayer`, request logging, rate limiting,
//! then the routes. `/health` and the metrics path skip the limiter.

use axum::{middleware::from_fn_with_state, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use super::routes::{self, AppState};
use crate::caching::{
    CacheAdminRouter, CacheAdminState, CacheStore, InMemoryCache, ReadThroughGateway, RedisCache,
    TtlPolicy,
};
use crate::core::config::{CacheBackend, ProxyConfig};
use crate::core::error::{ProxyError, ProxyResult};
use crate::middleware::{log_requests, rate_limit, RateLimiter, RequestLogging};
use crate::upstream::{RawgClient, UpstreamClient};

/// The catalog proxy: router plus the background tasks it owns
pub struct ProxyServer {
    config: ProxyConfig,
    app: Router,
    limiter: Arc<RateLimiter>,
    background: Vec<JoinHandle<()>>,
}

impl ProxyServer {
    /// Connect the configured store and build the upstream client.
    pub async fn new(config: ProxyConfig, metrics: Option<PrometheusHandle>) -> ProxyResult<Self> {
        let mut background = Vec::new();

        let store: Arc<dyn CacheStore> = match config.cache.backend {
            CacheBackend::Redis => {
                info!("Connecting to Redis cache...");
                let cache = RedisCache::connect(config.cache.redis.clone(), config.cache.operation_timeout)
                    .await
                    .map_err(|e| ProxyError::config(format!("Failed to connect to Redis: {}", e)))?;
                Arc::new(cache)
            }
            CacheBackend::Memory => {
                info!("Using in-memory cache (max {} entries)", config.cache.memory.max_entries);
                let cache = InMemoryCache::new(config.cache.memory.clone());
                background.push(cache.spawn_cleanup());
                Arc::new(cache)
            }
        };

        if config.upstream.api_key.is_none() {
            warn!("No RAWG API key configured, upstream requests will be unauthenticated");
        }
        let upstream: Arc<dyn UpstreamClient> = Arc::new(RawgClient::new(&config.upstream)?);

        let mut server = Self::with_components(config, store, upstream, metrics);
        server.background.extend(background);
        Ok(server)
    }

    /// Build the server around an existing store and upstream client.
    pub fn with_components(
        config: ProxyConfig,
        store: Arc<dyn CacheStore>,
        upstream: Arc<dyn UpstreamClient>,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        let mut rate_limit_config = config.rate_limit.clone();
        if config.observability.metrics_enabled {
            rate_limit_config
                .exempt_paths
                .push(config.observability.metrics_path.clone());
        }
        let limiter = Arc::new(RateLimiter::new(rate_limit_config));

        let gateway = ReadThroughGateway::new(
            store.clone(),
            upstream,
            TtlPolicy::new(config.cache.ttl.clone()),
        )
        .with_operation_timeout(config.cache.operation_timeout)
        .with_single_flight(config.cache.single_flight);

        let app = build_router(&config, Arc::new(gateway), store, limiter.clone(), metrics);

        Self {
            config,
            app,
            limiter,
            background: Vec::new(),
        }
    }

    /// The fully layered application
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// Serve until `shutdown` resolves, then drain for at most
    /// `server.shutdown_timeout`.
    pub async fn start<S>(mut self, shutdown: S) -> ProxyResult<()>
    where
        S: Future<Output = ()> + Send + 'static,
    {
        let addr = format!("{}:{}", self.config.server.bind_address, self.config.server.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ProxyError::internal(format!("Failed to bind to {}: {}", addr, e)))?;

        info!("🚀 Catalog proxy listening on {}", addr);

        if self.config.rate_limit.enabled {
            self.background.push(self.limiter.spawn_cleanup());
        }

        let (signalled_tx, signalled_rx) = tokio::sync::oneshot::channel::<()>();
        let signal = async move {
            shutdown.await;
            let _ = signalled_tx.send(());
        };

        let server = axum::serve(
            listener,
            self.app
                .clone()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(signal)
        .into_future();

        let drain_timeout = self.config.server.shutdown_timeout;
        let drain_deadline = async move {
            if signalled_rx.await.is_ok() {
                tokio::time::sleep(drain_timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        };

        let result = tokio::select! {
            result = server => result.map_err(|e| ProxyError::internal(format!("Server error: {}", e))),
            _ = drain_deadline => {
                warn!("Shutdown timeout of {:?} elapsed, dropping open connections", drain_timeout);
                Ok(())
            }
        };

        for task in self.background.drain(..) {
            task.abort();
        }

        if let Err(e) = &result {
            error!("{}", e);
        }
        result
    }
}

/// Assemble routes and layers.
pub fn build_router(
    config: &ProxyConfig,
    gateway: Arc<ReadThroughGateway>,
    store: Arc<dyn CacheStore>,
    limiter: Arc<RateLimiter>,
    metrics: Option<PrometheusHandle>,
) -> Router {
    let prefix = config.server.api_prefix.trim_end_matches('/');

    let catalog = Router::new()
        .route(&format!("{prefix}/games"), get(routes::list_games))
        .route(&format!("{prefix}/games/:slug"), get(routes::game_detail))
        .route(&format!("{prefix}/games/:slug/movies"), get(routes::game_movies))
        .route(&format!("{prefix}/games/:slug/screenshots"), get(routes::game_screenshots))
        .route(&format!("{prefix}/genres"), get(routes::list_genres))
        .route(&format!("{prefix}/platforms"), get(routes::list_platforms))
        .with_state(AppState { gateway });

    let mut app = Router::new()
        .route("/health", get(routes::health_check))
        .merge(catalog);

    if config.admin.enabled {
        app = app.merge(CacheAdminRouter::create_router(CacheAdminState { store }, prefix));
        info!("Cache admin routes mounted under {}", if prefix.is_empty() { "/" } else { prefix });
    }

    if config.observability.metrics_enabled {
        if let Some(handle) = metrics {
            app = app.route(
                &config.observability.metrics_path,
                get(routes::render_metrics).with_state(handle),
            );
        }
    }

    app.fallback(routes::route_not_found).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(from_fn_with_state(
                RequestLogging::new(config.server.slow_request_threshold),
                log_requests,
            ))
            .layer(from_fn_with_state(limiter, rate_limit)),
    )
}
