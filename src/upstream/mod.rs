//! # Upstream Catalog Client
//!
//! The collaborator that talks to the third-party catalog API. One call per
//! invocation: no caching and no retries happen at this layer.

pub mod rawg;

pub use rawg::{RawgClient, UpstreamConfig};

use crate::caching::{NormalizedQuery, ResourceFamily};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Decoded upstream payload, returned to clients verbatim.
pub type Payload = serde_json::Value;

pub type FetchResult<T> = Result<T, FetchError>;

/// Why an upstream call produced no payload.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FetchError {
    #[error("upstream unreachable: {0}")]
    Network(String),

    #[error("upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("upstream did not answer within {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("upstream payload could not be decoded: {0}")]
    Decode(String),
}

impl FetchError {
    /// Label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::Timeout(_) => "timeout",
            Self::Decode(_) => "decode",
        }
    }
}

/// Access to the upstream catalog for one resource family at a time.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Fetch a collection (games listing, genres, platforms).
    async fn fetch_collection(
        &self,
        family: ResourceFamily,
        params: &NormalizedQuery,
    ) -> FetchResult<Payload>;

    /// Fetch one item or sub-resource addressed by `segment`.
    async fn fetch_item(&self, family: ResourceFamily, segment: &str) -> FetchResult<Payload>;
}
