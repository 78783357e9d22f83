use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use metrics::{counter, histogram};
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Header carrying the per-request identifier
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Settings for the request logging middleware
#[derive(Debug, Clone)]
pub struct RequestLogging {
    pub slow_request_threshold: Duration,
}

impl RequestLogging {
    pub fn new(slow_request_threshold: Duration) -> Self {
        Self {
            slow_request_threshold,
        }
    }
}

/// Assign a request id, log completion, and flag slow requests.
pub async fn log_requests(
    State(settings): State<RequestLogging>,
    mut request: Request,
    next: Next,
) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = info_span!("request", request_id = %request_id, method = %method, path = %path);

    let start = Instant::now();
    let mut response = next.run(request).instrument(span.clone()).await;
    let duration = start.elapsed();
    let status = response.status().as_u16();

    counter!("http_requests_total", "method" => method.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(duration.as_secs_f64());

    span.in_scope(|| {
        if duration > settings.slow_request_threshold {
            warn!(
                status = status,
                duration_ms = duration.as_millis() as u64,
                "Slow request detected"
            );
        } else {
            info!(
                status = status,
                duration_ms = duration.as_millis() as u64,
                "Request processed"
            );
        }
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware::from_fn_with_state, routing::get, Router};
    use axum_test::TestServer;

    fn server() -> TestServer {
        let app = Router::new()
            .route("/genres", get(|| async { "ok" }))
            .layer(from_fn_with_state(
                RequestLogging::new(Duration::from_secs(1)),
                log_requests,
            ));
        TestServer::new(app).unwrap()
    }

    #[tokio::test]
    async fn test_request_id_is_generated() {
        let response = server().get("/genres").await;
        let id = response.header(REQUEST_ID_HEADER);
        let id = id.to_str().unwrap();
        assert!(Uuid::parse_str(id).is_ok());
    }

    #[tokio::test]
    async fn test_client_request_id_is_echoed() {
        let response = server()
            .get("/genres")
            .add_header(
                axum::http::HeaderName::from_static(REQUEST_ID_HEADER),
                HeaderValue::from_static("trace-123"),
            )
            .await;
        assert_eq!(response.header(REQUEST_ID_HEADER), "trace-123");
    }
}
