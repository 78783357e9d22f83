//! # TTL Policy
//!
//! Maps each resource family to the lifetime of its cache entries.
//!
//! Resolution order for a family: explicit per-family override, then the
//! global override, then the built-in default. The global override replaces
//! every family's default uniformly, which is how the proxy has always been
//! deployed (`REDIS_CACHE_EXPIRATION`); per-family overrides exist so that a
//! deployment can keep long taxonomy lifetimes while shortening others.

use super::ResourceFamily;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Single game, movies and screenshots: 24 hours.
pub const GAME_DETAIL_TTL_SECS: u64 = 86_400;

/// Game listings: 7 days.
pub const GAMES_LIST_TTL_SECS: u64 = 604_800;

/// Genres and platforms change rarely: 30 days.
pub const TAXONOMY_TTL_SECS: u64 = 2_592_000;

/// Longest lifetime any entry may be given: 100 years.
pub const MAX_TTL_SECS: u64 = 100 * 365 * 86_400;

/// TTL section of the cache configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    /// Applies to every family without an explicit entry in `families`
    pub override_seconds: Option<u64>,

    /// Per-family lifetimes in seconds
    pub families: HashMap<ResourceFamily, u64>,
}

/// Read-only TTL lookup shared by all requests.
#[derive(Debug, Clone, Default)]
pub struct TtlPolicy {
    config: TtlConfig,
}

impl TtlPolicy {
    pub fn new(config: TtlConfig) -> Self {
        Self { config }
    }

    pub fn default_secs(family: ResourceFamily) -> u64 {
        match family {
            ResourceFamily::Games => GAMES_LIST_TTL_SECS,
            ResourceFamily::GameDetail
            | ResourceFamily::GameMovies
            | ResourceFamily::GameScreenshots => GAME_DETAIL_TTL_SECS,
            ResourceFamily::Genres | ResourceFamily::Platforms => TAXONOMY_TTL_SECS,
        }
    }

    pub fn ttl_for(&self, family: ResourceFamily) -> Duration {
        let secs = self
            .config
            .families
            .get(&family)
            .copied()
            .or(self.config.override_seconds)
            .unwrap_or_else(|| Self::default_secs(family));
        Duration::from_secs(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_per_family() {
        let policy = TtlPolicy::default();
        assert_eq!(policy.ttl_for(ResourceFamily::GameDetail), Duration::from_secs(86_400));
        assert_eq!(policy.ttl_for(ResourceFamily::GameMovies), Duration::from_secs(86_400));
        assert_eq!(policy.ttl_for(ResourceFamily::GameScreenshots), Duration::from_secs(86_400));
        assert_eq!(policy.ttl_for(ResourceFamily::Games), Duration::from_secs(604_800));
        assert_eq!(policy.ttl_for(ResourceFamily::Genres), Duration::from_secs(2_592_000));
        assert_eq!(policy.ttl_for(ResourceFamily::Platforms), Duration::from_secs(2_592_000));
    }

    #[test]
    fn test_global_override_applies_uniformly() {
        let policy = TtlPolicy::new(TtlConfig {
            override_seconds: Some(60),
            ..Default::default()
        });
        for family in ResourceFamily::ALL {
            assert_eq!(policy.ttl_for(family), Duration::from_secs(60));
        }
    }

    #[test]
    fn test_max_ttl_fits_redis_expiry() {
        assert!(MAX_TTL_SECS.checked_mul(1000).is_some_and(|ms| ms < i64::MAX as u64));
    }

    #[test]
    fn test_family_override_beats_global() {
        let mut families = HashMap::new();
        families.insert(ResourceFamily::Genres, TAXONOMY_TTL_SECS);
        let policy = TtlPolicy::new(TtlConfig {
            override_seconds: Some(60),
            families,
        });
        assert_eq!(policy.ttl_for(ResourceFamily::Genres), Duration::from_secs(TAXONOMY_TTL_SECS));
        assert_eq!(policy.ttl_for(ResourceFamily::Games), Duration::from_secs(60));
    }
}
