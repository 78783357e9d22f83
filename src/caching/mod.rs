//! # Caching System Module
//!
//! The read-through cache that sits between the HTTP routes and the upstream
//! catalog API.
//!
//! ## Architecture
//! 1. **Key Generator**: normalizes query parameters and derives cache keys
//! 2. **TTL Policy**: entry lifetime per resource family
//! 3. **Cache Stores**: Redis and in-memory implementations of [`CacheStore`]
//! 4. **Gateway**: build key, check store, fetch on miss, store best-effort
//! 5. **Deduplication**: optional single-flight for concurrent misses
//! 6. **Admin Interface**: raw key-value maintenance endpoints
//!
//! ## Usage Example
//! ```rust,ignore
//! let gateway = ReadThroughGateway::new(store, upstream, TtlPolicy::default());
//! let response = gateway.handle(ResourceFamily::Genres, None, &RawParams::new()).await?;
//! if response.outcome == CacheOutcome::Hit {
//!     // served without contacting upstream
//! }
//! ```

pub mod admin;
pub mod deduplication;
pub mod family;
pub mod gateway;
pub mod key_generator;
pub mod stores;
pub mod ttl;

pub use admin::{CacheAdminRouter, CacheAdminState};
pub use deduplication::SingleFlight;
pub use family::ResourceFamily;
pub use gateway::{CacheOutcome, GatewayResponse, ReadThroughGateway};
pub use key_generator::{CacheKey, KeyBuilder, NormalizedQuery, QueryValue, RawParams};
pub use stores::{CacheStore, InMemoryCache, InMemoryCacheConfig, RedisCache, RedisCacheConfig};
pub use ttl::{TtlConfig, TtlPolicy, MAX_TTL_SECS};

/// Cache operation result
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache operation timeout")]
    Timeout,

    #[error("Cache not available")]
    Unavailable,
}
