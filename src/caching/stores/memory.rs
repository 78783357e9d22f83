//! # In-Memory Cache Store
//!
//! A `DashMap`-backed store with lazy expiry on read, a bounded entry count
//! and an optional background sweep of expired entries.

use super::CacheStore;
use crate::caching::CacheResult;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant};
use tracing::debug;

/// In-memory cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    pub max_entries: usize,

    /// Cleanup interval for expired entries
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-memory cache implementation
#[derive(Clone)]
pub struct InMemoryCache {
    config: InMemoryCacheConfig,
    entries: Arc<DashMap<String, MemoryEntry>>,
    evictions: Arc<AtomicU64>,
}

impl InMemoryCache {
    pub fn new(config: InMemoryCacheConfig) -> Self {
        Self {
            config,
            entries: Arc::new(DashMap::new()),
            evictions: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Spawn the periodic sweep of expired entries.
    pub fn spawn_cleanup(&self) -> JoinHandle<()> {
        let entries = self.entries.clone();
        let period = self.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                ticker.tick().await;
                let removed = Self::purge_expired(&entries);
                if removed > 0 {
                    debug!("Cleaned up {} expired cache entries", removed);
                }
            }
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    fn purge_expired(entries: &DashMap<String, MemoryEntry>) -> usize {
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(entries.len())
    }

    /// Make room for one new entry.
    ///
    /// Expired entries go first; if the store is still full the entry closest
    /// to expiry is dropped (entries without expiry are dropped last).
    fn evict_if_needed(&self, incoming_key: &str) {
        if self.entries.len() < self.config.max_entries || self.entries.contains_key(incoming_key) {
            return;
        }

        Self::purge_expired(&self.entries);
        if self.entries.len() < self.config.max_entries {
            return;
        }

        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| (entry.expires_at.is_none(), entry.expires_at))
            .map(|entry| entry.key().clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
            self.evictions.fetch_add(1, Ordering::Relaxed);
            debug!("Evicted cache key {} to stay within {} entries", key, self.config.max_entries);
        }
    }

    fn insert(&self, key: &str, value: &[u8], expires_at: Option<Instant>) {
        self.evict_if_needed(key);
        self.entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_vec(),
                expires_at,
            },
        );
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(InMemoryCacheConfig::default())
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.entries.remove_if(key, |_, entry| entry.is_expired(now));
        }
        Ok(None)
    }

    async fn set_with_ttl(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        // A deadline past the clock's range never arrives.
        self.insert(key, value, Instant::now().checked_add(ttl));
        Ok(())
    }

    async fn set(&self, key: &str, value: &[u8]) -> CacheResult<()> {
        self.insert(key, value, None);
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .is_some_and(|(_, entry)| !entry.is_expired(now)))
    }

    async fn keys(&self) -> CacheResult<Vec<String>> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear(&self) -> CacheResult<usize> {
        let live = self.keys().await?.len();
        self.entries.clear();
        Ok(live)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
