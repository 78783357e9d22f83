//! # Cache Admin Interface
//!
//! Raw key-value maintenance endpoints over the cache store. They bypass the
//! read-through gateway entirely: no key normalization, no default TTL.

use super::{CacheStore, MAX_TTL_SECS};
use crate::core::error::{ProxyError, ProxyResult};
use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Cache admin state
#[derive(Clone)]
pub struct CacheAdminState {
    pub store: Arc<dyn CacheStore>,
}

/// Cache admin router
pub struct CacheAdminRouter;

impl CacheAdminRouter {
    /// Create cache admin router with routes mounted under `prefix`
    pub fn create_router(state: CacheAdminState, prefix: &str) -> Router {
        let prefix = prefix.trim_end_matches('/');
        Router::new()
            .route(&format!("{prefix}/set-key"), post(set_key))
            .route(&format!("{prefix}/get-key/:key"), get(get_key))
            .route(&format!("{prefix}/delete-key/:key"), delete(delete_key))
            .route(&format!("{prefix}/get-keys"), get(list_keys))
            .route(&format!("{prefix}/delete-all-keys"), delete(delete_all_keys))
            .with_state(state)
    }
}

/// Set key request
#[derive(Debug, Serialize, Deserialize)]
pub struct SetKeyRequest {
    pub key: String,
    pub value: serde_json::Value,
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

/// Single key response
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyValueResponse {
    pub key: String,
    pub value: serde_json::Value,
}

/// Key listing response
#[derive(Debug, Serialize, Deserialize)]
pub struct KeysResponse {
    pub keys: Vec<String>,
}

/// Generic acknowledgement
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Store a JSON value under a raw key
pub async fn set_key(
    State(state): State<CacheAdminState>,
    Json(request): Json<SetKeyRequest>,
) -> ProxyResult<Json<MessageResponse>> {
    if request.key.trim().is_empty() {
        return Err(ProxyError::validation("key", "must not be empty"));
    }

    let bytes = serde_json::to_vec(&request.value)?;
    match request.ttl_seconds {
        Some(secs) if !(1..=MAX_TTL_SECS).contains(&secs) => {
            return Err(ProxyError::validation(
                "ttl_seconds",
                format!("must be between 1 and {}", MAX_TTL_SECS),
            ))
        }
        Some(secs) => {
            state
                .store
                .set_with_ttl(&request.key, &bytes, Duration::from_secs(secs))
                .await?
        }
        None => state.store.set(&request.key, &bytes).await?,
    }

    info!("Cache key '{}' set via admin API", request.key);
    Ok(Json(MessageResponse {
        message: format!("Stored {} with value {}", request.key, request.value),
    }))
}

/// Read a raw key
pub async fn get_key(
    State(state): State<CacheAdminState>,
    Path(key): Path<String>,
) -> ProxyResult<Json<KeyValueResponse>> {
    let bytes = state
        .store
        .get(&key)
        .await?
        .ok_or_else(|| ProxyError::not_found(key.clone()))?;

    Ok(Json(KeyValueResponse {
        value: decode_value(bytes),
        key,
    }))
}

/// Delete a raw key
pub async fn delete_key(
    State(state): State<CacheAdminState>,
    Path(key): Path<String>,
) -> ProxyResult<Json<MessageResponse>> {
    if !state.store.delete(&key).await? {
        return Err(ProxyError::not_found(key));
    }

    info!("Cache key '{}' deleted via admin API", key);
    Ok(Json(MessageResponse {
        message: format!("Deleted key: {}", key),
    }))
}

/// List every key in the store
pub async fn list_keys(State(state): State<CacheAdminState>) -> ProxyResult<Json<KeysResponse>> {
    let mut keys = state.store.keys().await?;
    keys.sort();
    Ok(Json(KeysResponse { keys }))
}

/// Delete every key in the store
pub async fn delete_all_keys(
    State(state): State<CacheAdminState>,
) -> ProxyResult<Json<MessageResponse>> {
    let deleted = state.store.clear().await?;
    let message = if deleted == 0 {
        "No keys found in cache".to_string()
    } else {
        warn!("{} cache keys deleted via admin API", deleted);
        format!("Successfully deleted {} keys from cache", deleted)
    };
    Ok(Json(MessageResponse { message }))
}

/// Stored bytes are JSON when written by this service; anything else is shown
/// as text, or base64 when it is not valid UTF-8.
fn decode_value(bytes: Vec<u8>) -> serde_json::Value {
    if let Ok(value) = serde_json::from_slice(&bytes) {
        return value;
    }
    match String::from_utf8(bytes) {
        Ok(text) => serde_json::Value::String(text),
        Err(err) => serde_json::Value::String(
            base64::engine::general_purpose::STANDARD.encode(err.into_bytes()),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caching::InMemoryCache;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    fn create_test_server() -> (TestServer, Arc<InMemoryCache>) {
        let store = Arc::new(InMemoryCache::default());
        let state = CacheAdminState {
            store: store.clone(),
        };
        let app = CacheAdminRouter::create_router(state, "/api/v1");
        (TestServer::new(app).unwrap(), store)
    }

    #[tokio::test]
    async fn test_key_operations() {
        let (server, _store) = create_test_server();

        let response = server
            .post("/api/v1/set-key")
            .json(&json!({"key": "greeting", "value": {"hello": "world"}}))
            .await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let response = server.get("/api/v1/get-key/greeting").await;
        assert_eq!(response.status_code(), StatusCode::OK);
        let body: KeyValueResponse = response.json();
        assert_eq!(body.key, "greeting");
        assert_eq!(body.value, json!({"hello": "world"}));

        let response = server.delete("/api/v1/delete-key/greeting").await;
        assert_eq!(response.status_code(), StatusCode::OK);

        let response = server.get("/api/v1/get-key/greeting").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Key not found");
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_not_found() {
        let (server, _store) = create_test_server();

        let response = server.delete("/api/v1/delete-key/nothing-here").await;
        assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_set_key_without_ttl_does_not_expire() {
        let (server, store) = create_test_server();

        server
            .post("/api/v1/set-key")
            .json(&json!({"key": "pinned", "value": 42}))
            .await
            .assert_status_ok();

        assert_eq!(store.get("pinned").await.unwrap(), Some(b"42".to_vec()));
    }

    #[tokio::test]
    async fn test_zero_ttl_is_rejected() {
        let (server, _store) = create_test_server();

        let response = server
            .post("/api/v1/set-key")
            .json(&json!({"key": "k", "value": 1, "ttl_seconds": 0}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_rejected() {
        let (server, store) = create_test_server();

        let response = server
            .post("/api/v1/set-key")
            .json(&json!({"key": "k", "value": 1, "ttl_seconds": u64::MAX}))
            .await;
        assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["error"], "Invalid request");
        assert!(store.is_empty());

        server
            .post("/api/v1/set-key")
            .json(&json!({"key": "k", "value": 1, "ttl_seconds": MAX_TTL_SECS}))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_list_and_clear() {
        let (server, store) = create_test_server();
        store.set("genres", b"{}").await.unwrap();
        store.set("platforms", b"{}").await.unwrap();

        let body: KeysResponse = server.get("/api/v1/get-keys").await.json();
        assert_eq!(body.keys, vec!["genres".to_string(), "platforms".to_string()]);

        let body: MessageResponse = server.delete("/api/v1/delete-all-keys").await.json();
        assert_eq!(body.message, "Successfully deleted 2 keys from cache");
        assert!(store.is_empty());

        let body: MessageResponse = server.delete("/api/v1/delete-all-keys").await.json();
        assert_eq!(body.message, "No keys found in cache");
    }

    #[test]
    fn test_decode_value_falls_back_for_foreign_bytes() {
        assert_eq!(decode_value(b"plain text".to_vec()), json!("plain text"));
        assert_eq!(decode_value(vec![0xff, 0xfe]), json!("//4="));
    }
}
