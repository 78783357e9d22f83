//! # Redis Cache Store
//!
//! Redis-backed store built on the auto-reconnecting `ConnectionManager`.
//! Every command is bounded by the configured operation timeout so a stalled
//! Redis degrades into cache failures instead of hanging requests.

use super::CacheStore;
use crate::caching::{CacheError, CacheResult};
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

/// Keys are scanned and deleted in batches of this size.
const SCAN_BATCH: usize = 1000;

/// Redis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisCacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Key prefix for all cache entries
    pub key_prefix: String,

    /// Connection timeout
    #[serde(with = "humantime_serde")]
    pub connection_timeout: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "catalog:".to_string(),
            connection_timeout: Duration::from_secs(5),
        }
    }
}

/// Redis cache implementation
#[derive(Clone)]
pub struct RedisCache {
    config: RedisCacheConfig,
    connection: ConnectionManager,
    operation_timeout: Duration,
}

impl RedisCache {
    /// Connect to Redis
    pub async fn connect(config: RedisCacheConfig, operation_timeout: Duration) -> CacheResult<Self> {
        let client = Client::open(config.url.as_str())?;

        let connection = tokio::time::timeout(config.connection_timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| CacheError::Timeout)??;

        info!("Redis cache connected (prefix '{}')", config.key_prefix);

        Ok(Self {
            config,
            connection,
            operation_timeout,
        })
    }

    /// Get the full cache key with prefix
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    async fn bounded<T, F>(&self, operation: F) -> CacheResult<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, operation).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout),
        }
    }

    /// Collect every full key under our prefix with SCAN.
    async fn scan_prefixed(&self) -> CacheResult<Vec<String>> {
        let prefix = self.config.key_prefix.clone();
        let pattern = match_pattern(&prefix);
        let mut conn = self.connection.clone();

        self.bounded(async move {
            let mut cursor: u64 = 0;
            let mut all_keys = Vec::new();

            loop {
                let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(SCAN_BATCH)
                    .query_async(&mut conn)
                    .await?;

                all_keys.extend(keys.into_iter().filter(|key| key.starts_with(&prefix)));

                if next_cursor == 0 {
                    break;
                }
                cursor = next_cursor;
            }

            Ok(all_keys)
        })
        .await
    }
}

/// SCAN `MATCH` pattern for every key starting with `prefix`, with glob
/// metacharacters in the prefix taken literally.
fn match_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

/// Strip `prefix` from scanned keys, skipping any that lack it.
fn unprefixed(prefix: &str, full_keys: &[String]) -> Vec<String> {
    let mut keys: Vec<String> = full_keys
        .iter()
        .filter_map(|full_key| full_key.strip_prefix(prefix))
        .map(str::to_string)
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();

        let value: Option<Vec<u8>> = self.bounded(async move { conn.get(&full_key).await }).await?;
        debug!(key, found = value.is_some(), "Redis cache lookup");
        Ok(value)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let full_key = self.full_key(key);
        let ttl_seconds = ttl.as_secs().max(1);
        let mut conn = self.connection.clone();

        self.bounded(async move {
            redis::cmd("SET")
                .arg(&full_key)
                .arg(value)
                .arg("EX")
                .arg(ttl_seconds)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await?;

        debug!("Set Redis cache key: {} with TTL: {}s", key, ttl_seconds);
        Ok(())
    }

    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();

        self.bounded(async move { conn.set::<_, _, ()>(&full_key, value).await })
            .await
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();

        let deleted: i64 = self.bounded(async move { conn.del(&full_key).await }).await?;
        Ok(deleted > 0)
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let full_keys = self.scan_prefixed().await?;
        Ok(unprefixed(&self.config.key_prefix, &full_keys))
    }

    async fn clear(&self) -> CacheResult<usize> {
        let keys = self.scan_prefixed().await?;
        let mut removed = 0usize;

        for batch in keys.chunks(SCAN_BATCH) {
            let mut conn = self.connection.clone();
            let batch = batch.to_vec();
            let deleted: i64 = self.bounded(async move { conn.del(batch).await }).await?;
            removed += usize::try_from(deleted).unwrap_or_default();
        }

        info!("Cleared {} keys from Redis cache", removed);
        Ok(removed)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
