//! # Error Handling Module
//!
//! Error types for the catalog proxy and their mapping onto HTTP responses.
//!
//! Only upstream failures ever reach a catalog client as an error. Cache-layer
//! failures are absorbed by the read-through gateway (see `caching::gateway`)
//! and only surface through the admin key-value endpoints, where the store
//! itself is the thing being operated on.
//!
//! Every error renders the same JSON body:
//!
//! ```json
//! { "error": "Error fetching games", "details": "upstream returned 503 Service Unavailable" }
//! ```

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::caching::{CacheError, ResourceFamily};
use crate::upstream::FetchError;

pub type ProxyResult<T> = Result<T, ProxyError>;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Upstream request for {family} failed: {source}")]
    Upstream {
        family: ResourceFamily,
        #[source]
        source: FetchError,
    },

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Rate limit exceeded, retry after {}s", .retry_after.as_secs())]
    RateLimitExceeded { retry_after: Duration },

    #[error("Request validation failed: {field} - {reason}")]
    RequestValidation { field: String, reason: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ProxyError {
    pub fn upstream(family: ResourceFamily, source: FetchError) -> Self {
        Self::Upstream { family, source }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn validation<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::RequestValidation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::RequestValidation { .. } => StatusCode::BAD_REQUEST,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short, client-facing summary placed in the `error` field.
    pub fn summary(&self) -> String {
        match self {
            Self::Upstream { family, .. } => format!("Error fetching {}", family.description()),
            Self::Cache(_) => "Error accessing cache".to_string(),
            Self::Configuration { .. } => "Configuration error".to_string(),
            Self::NotFound { .. } => "Key not found".to_string(),
            Self::RateLimitExceeded { .. } => "Too Many Requests".to_string(),
            Self::RequestValidation { .. } => "Invalid request".to_string(),
            Self::Internal { .. } => "Internal Server Error".to_string(),
        }
    }

    /// Longer explanation placed in the `details` field.
    pub fn details(&self) -> String {
        match self {
            Self::Upstream { source, .. } => source.to_string(),
            Self::Cache(err) => err.to_string(),
            Self::Configuration { message } => message.clone(),
            Self::NotFound { resource } => format!("No entry stored under '{}'", resource),
            Self::RateLimitExceeded { .. } => "Please try again later.".to_string(),
            Self::RequestValidation { field, reason } => format!("{}: {}", field, reason),
            Self::Internal { message } => message.clone(),
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON error: {}", err),
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.summary(),
            "details": self.details(),
        });

        let mut response = (status, Json(body)).into_response();
        if let Self::RateLimitExceeded { retry_after } = &self {
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ProxyError::upstream(ResourceFamily::Games, FetchError::Timeout(Duration::from_secs(10)))
                .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ProxyError::not_found("games:page=1").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ProxyError::RateLimitExceeded {
                retry_after: Duration::from_secs(30)
            }
            .status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ProxyError::validation("key", "must not be empty").status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_upstream_summary_names_family() {
        let err = ProxyError::upstream(
            ResourceFamily::GameScreenshots,
            FetchError::Network("connection refused".to_string()),
        );
        assert_eq!(err.summary(), "Error fetching game screenshots");
        assert!(err.details().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_error_response_body_shape() {
        let err = ProxyError::upstream(
            ResourceFamily::Genres,
            FetchError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            },
        );
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Error fetching genres");
        assert!(body["details"].as_str().unwrap().contains("502"));
    }

    #[test]
    fn test_rate_limit_response_has_retry_after() {
        let response = ProxyError::RateLimitExceeded {
            retry_after: Duration::from_secs(42),
        }
        .into_response();
        assert_eq!(response.headers().get(header::RETRY_AFTER).unwrap(), "42");
    }
}
