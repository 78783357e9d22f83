//! # Game Catalog Proxy - Core Library Crate
//!
//! A read-through caching proxy in front of the RAWG game catalog API.
//! Catalog requests are answered from the cache when possible; misses are
//! fetched upstream and stored with a lifetime chosen per resource family.
//!
//! ## Module Layout
//! - `core`: error types and configuration
//! - `caching`: key building, TTL policy, stores, the read-through gateway
//! - `upstream`: the catalog API client
//! - `middleware`: rate limiting, request logging, input sanitization
//! - `observability`: logging setup and Prometheus metrics
//! - `gateway`: HTTP routes and the server

/// Error types and configuration
pub mod core;

/// Read-through cache: keys, TTLs, stores, gateway and admin endpoints
pub mod caching;

/// Client for the upstream catalog API
pub mod upstream;

/// Request-level middleware
pub mod middleware;

/// Logging and metrics
pub mod observability;

/// HTTP routes and server
pub mod gateway;

pub use crate::caching::{CacheOutcome, ReadThroughGateway, ResourceFamily};
pub use crate::core::config::ProxyConfig;
pub use crate::core::error::{ProxyError, ProxyResult};
pub use crate::gateway::ProxyServer;
