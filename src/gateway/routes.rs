//! Catalog route handlers.
//!
//! Every handler funnels into [`serve`], which strips markup from the input,
//! asks the read-through gateway, and tags the response with `x-cache`.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::sync::Arc;

use crate::caching::{RawParams, ReadThroughGateway, ResourceFamily};
use crate::core::error::ProxyResult;
use crate::middleware::{sanitize_params, strip_html};

/// Header reporting whether the payload came from the cache
pub const CACHE_STATUS_HEADER: &str = "x-cache";

/// State shared by the catalog handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<ReadThroughGateway>,
}

async fn serve(
    state: &AppState,
    family: ResourceFamily,
    segment: Option<String>,
    params: RawParams,
) -> ProxyResult<Response> {
    let params = sanitize_params(params);
    let segment = segment.map(|s| strip_html(&s).into_owned());

    let response = state
        .gateway
        .handle(family, segment.as_deref(), &params)
        .await?;

    let mut http = Json(response.payload).into_response();
    http.headers_mut().insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(response.outcome.as_str()),
    );
    Ok(http)
}

pub async fn list_games(
    State(state): State<AppState>,
    Query(params): Query<RawParams>,
) -> ProxyResult<Response> {
    serve(&state, ResourceFamily::Games, None, params).await
}

pub async fn game_detail(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ProxyResult<Response> {
    serve(&state, ResourceFamily::GameDetail, Some(slug), RawParams::new()).await
}

pub async fn game_movies(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ProxyResult<Response> {
    serve(&state, ResourceFamily::GameMovies, Some(slug), RawParams::new()).await
}

pub async fn game_screenshots(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ProxyResult<Response> {
    serve(&state, ResourceFamily::GameScreenshots, Some(slug), RawParams::new()).await
}

pub async fn list_genres(State(state): State<AppState>) -> ProxyResult<Response> {
    serve(&state, ResourceFamily::Genres, None, RawParams::new()).await
}

pub async fn list_platforms(State(state): State<AppState>) -> ProxyResult<Response> {
    serve(&state, ResourceFamily::Platforms, None, RawParams::new()).await
}

/// Liveness check
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "OK" })))
}

/// Prometheus scrape endpoint
pub async fn render_metrics(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}

/// Fallback for unknown paths
pub async fn route_not_found(uri: axum::http::Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not Found",
            "details": format!("No route for {}", uri.path()),
        })),
    )
}
