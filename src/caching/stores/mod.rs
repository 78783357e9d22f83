//! # Cache Stores Module
//!
//! Key-value stores with per-key expiration. Redis is the production backend;
//! the in-memory store serves local development and tests.

pub mod memory;
pub mod redis_store;

pub use memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis_store::{RedisCache, RedisCacheConfig};

use super::CacheResult;
use async_trait::async_trait;
use std::time::Duration;

/// Trait for cache store implementations
///
/// A missing or expired key is `Ok(None)`, never an error. Errors mean the
/// store itself could not be reached or answered badly.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value from the cache
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store a value, replacing any previous one; expiry starts now
    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Store a value without expiry
    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()>;

    /// Delete a value, returning whether it existed
    async fn delete(&self, key: &str) -> CacheResult<bool>;

    /// List all live keys
    async fn keys(&self) -> CacheResult<Vec<String>>;

    /// Remove every entry, returning how many were removed
    async fn clear(&self) -> CacheResult<usize>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
