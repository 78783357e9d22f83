//! # Admin Key-Value Integration Tests

use axum::http::StatusCode;
use axum_test::TestServer;
use game_catalog_proxy::caching::InMemoryCache;
use game_catalog_proxy::core::config::ProxyConfig;
use game_catalog_proxy::upstream::RawgClient;
use game_catalog_proxy::ProxyServer;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn server_with(configure: impl FnOnce(&mut ProxyConfig)) -> (TestServer, MockServer) {
    let upstream = MockServer::start().await;
    let mut config = ProxyConfig::default();
    config.upstream.base_url = upstream.uri();
    configure(&mut config);

    let client = Arc::new(RawgClient::new(&config.upstream).unwrap());
    let proxy = ProxyServer::with_components(config, Arc::new(InMemoryCache::default()), client, None);
    (TestServer::new(proxy.router()).unwrap(), upstream)
}

#[tokio::test]
async fn test_admin_round_trip_through_full_router() {
    let (server, _upstream) = server_with(|_| {}).await;

    server
        .post("/api/v1/set-key")
        .json(&json!({"key": "motd", "value": "hello", "ttl_seconds": 60}))
        .await
        .assert_status_ok();

    let body: Value = server.get("/api/v1/get-key/motd").await.json();
    assert_eq!(body, json!({"key": "motd", "value": "hello"}));

    let body: Value = server.get("/api/v1/get-keys").await.json();
    assert_eq!(body, json!({"keys": ["motd"]}));

    server.delete("/api/v1/delete-key/motd").await.assert_status_ok();
    let response = server.get("/api/v1/get-key/motd").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_sees_entries_written_by_catalog_routes() {
    let (server, upstream) = server_with(|_| {}).await;

    Mock::given(method("GET"))
        .and(path("/genres"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": ["rpg"]})))
        .expect(2)
        .mount(&upstream)
        .await;

    server.get("/api/v1/genres").await.assert_status_ok();

    let body: Value = server.get("/api/v1/get-key/genres").await.json();
    assert_eq!(body["value"], json!({"results": ["rpg"]}));

    // Clearing the store forces the next request upstream again.
    let body: Value = server.delete("/api/v1/delete-all-keys").await.json();
    assert_eq!(body["message"], "Successfully deleted 1 keys from cache");
    assert_eq!(server.get("/api/v1/genres").await.header("x-cache"), "MISS");
}

#[tokio::test]
async fn test_admin_set_key_with_huge_ttl_is_a_client_error() {
    let (server, _upstream) = server_with(|_| {}).await;

    let response = server
        .post("/api/v1/set-key")
        .json(&json!({"key": "motd", "value": "hello", "ttl_seconds": u64::MAX}))
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["details"]
        .as_str()
        .unwrap()
        .starts_with("ttl_seconds"));

    let body: Value = server.get("/api/v1/get-keys").await.json();
    assert_eq!(body, json!({"keys": []}));
}

#[tokio::test]
async fn test_admin_routes_can_be_disabled() {
    let (server, _upstream) = server_with(|config| config.admin.enabled = false).await;

    let response = server.get("/api/v1/get-keys").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_routes_follow_custom_prefix() {
    let (server, _upstream) = server_with(|config| config.server.api_prefix = "/v2/".to_string()).await;

    server.get("/v2/get-keys").await.assert_status_ok();
    assert_eq!(
        server.get("/api/v1/get-keys").await.status_code(),
        StatusCode::NOT_FOUND
    );
}
