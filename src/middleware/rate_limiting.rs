//! # Rate Limiting
//!
//! Fixed-window request counting per client address, kept in process memory.
//!
//! ## Usage Example
//! ```rust,ignore
//! let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default()));
//! let app = router.layer(axum::middleware::from_fn_with_state(limiter, rate_limit));
//! ```

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use metrics::counter;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::core::config::RateLimitConfig;
use crate::core::error::ProxyError;

/// Client identifier used when no address can be determined
const UNKNOWN_CLIENT: &str = "unknown";

/// Outcome of a rate limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window resets
    pub reset_after: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// Fixed-window limiter keyed by client identifier
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: DashMap::new(),
        }
    }

    /// Whether `path` skips the limiter
    pub fn is_exempt(&self, path: &str) -> bool {
        self.config.exempt_paths.iter().any(|p| p == path)
    }

    /// Count one request for `client` and report whether it is allowed
    pub fn check(&self, client: &str) -> RateLimitResult {
        let now = Instant::now();
        let limit = self.config.requests_per_window;
        let window_len = self.config.window;

        let mut entry = self.windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= window_len {
            *entry = Window {
                started: now,
                count: 0,
            };
        }

        let reset_after = window_len.saturating_sub(now.duration_since(entry.started));
        if entry.count >= limit {
            return RateLimitResult {
                allowed: false,
                limit,
                remaining: 0,
                reset_after,
            };
        }

        entry.count += 1;
        RateLimitResult {
            allowed: true,
            limit,
            remaining: limit - entry.count,
            reset_after,
        }
    }

    /// Drop windows that have already expired
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let window_len = self.config.window;
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now.duration_since(window.started) < window_len);
        before.saturating_sub(self.windows.len())
    }

    /// Number of clients with a live window
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Periodically purge expired windows
    pub fn spawn_cleanup(self: &Arc<Self>) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(limiter.config.window);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = limiter.purge_expired();
                if purged > 0 {
                    debug!("Purged {} expired rate limit windows", purged);
                }
            }
        })
    }
}

/// Resolve the client address: socket peer, then the first
/// `x-forwarded-for` entry, then `unknown`.
pub fn client_identifier(request: &Request) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    forwarded_for(request.headers()).unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Axum middleware enforcing the limiter
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.config.enabled || limiter.is_exempt(request.uri().path()) {
        return next.run(request).await;
    }

    let client = client_identifier(&request);
    let result = limiter.check(&client);

    if !result.allowed {
        counter!("rate_limited_requests_total").increment(1);
        warn!(
            client = %client,
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        let mut response = ProxyError::RateLimitExceeded {
            retry_after: result.reset_after,
        }
        .into_response();
        insert_limit_headers(response.headers_mut(), &result);
        return response;
    }

    let mut response = next.run(request).await;
    insert_limit_headers(response.headers_mut(), &result);
    response
}

fn insert_limit_headers(headers: &mut HeaderMap, result: &RateLimitResult) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(result.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(result.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(result.reset_after.as_secs()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware::from_fn_with_state, routing::get, Router};
    use axum_test::TestServer;

    fn config(limit: u32, window: Duration) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            requests_per_window: limit,
            window,
            exempt_paths: vec!["/health".to_string()],
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_window_allows_up_to_limit() {
        let limiter = RateLimiter::new(config(3, Duration::from_secs(60)));

        for remaining in [2, 1, 0] {
            let result = limiter.check("10.0.0.1");
            assert!(result.allowed);
            assert_eq!(result.remaining, remaining);
        }
        assert!(!limiter.check("10.0.0.1").allowed);

        // Other clients have their own window.
        assert!(limiter.check("10.0.0.2").allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_resets_after_expiry() {
        let limiter = RateLimiter::new(config(1, Duration::from_secs(60)));

        assert!(limiter.check("client").allowed);
        let blocked = limiter.check("client");
        assert!(!blocked.allowed);
        assert_eq!(blocked.reset_after, Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(limiter.check("client").allowed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_windows() {
        let limiter = RateLimiter::new(config(5, Duration::from_secs(10)));
        limiter.check("a");
        limiter.check("b");
        assert_eq!(limiter.tracked_clients(), 2);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(limiter.purge_expired(), 2);
        assert_eq!(limiter.tracked_clients(), 0);
    }

    #[test]
    fn test_client_identifier_fallbacks() {
        let request = Request::builder()
            .uri("/genres")
            .header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(client_identifier(&request), "203.0.113.7");

        let request = Request::builder().uri("/genres").body(Body::empty()).unwrap();
        assert_eq!(client_identifier(&request), "unknown");
    }

    #[tokio::test]
    async fn test_middleware_rejects_with_429() {
        let limiter = Arc::new(RateLimiter::new(config(1, Duration::from_secs(900))));
        let app = Router::new()
            .route("/genres", get(|| async { "ok" }))
            .route("/health", get(|| async { "ok" }))
            .layer(from_fn_with_state(limiter, rate_limit));
        let server = TestServer::new(app).unwrap();

        server.get("/genres").await.assert_status_ok();

        let response = server.get("/genres").await;
        assert_eq!(response.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert!(response.headers().contains_key("retry-after"));
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Too Many Requests");
        assert_eq!(body["details"], "Please try again later.");

        // Exempt paths are never limited.
        for _ in 0..3 {
            server.get("/health").await.assert_status_ok();
        }
    }
}
