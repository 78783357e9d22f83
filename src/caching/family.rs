//! # Resource Families
//!
//! A resource family is a class of upstream catalog data that shares one key
//! prefix, one set of accepted query parameters and one TTL rule.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cacheable categories of catalog data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceFamily {
    /// Paginated, filterable game listing
    Games,
    /// A single game looked up by slug
    GameDetail,
    /// Trailers attached to a game
    GameMovies,
    /// Screenshots attached to a game
    GameScreenshots,
    /// Genre taxonomy
    Genres,
    /// Top-level (parent) platform taxonomy
    Platforms,
}

/// Query parameters the game listing forwards upstream.
const GAMES_PARAMS: &[&str] = &[
    "page",
    "page_size",
    "search",
    "ordering",
    "parent_platforms",
    "genres",
];

/// Numeric selectors: zero, negative or non-numeric values mean "not set".
const SELECTOR_PARAMS: &[&str] = &["page", "page_size", "parent_platforms", "genres"];

impl ResourceFamily {
    pub const ALL: [ResourceFamily; 6] = [
        Self::Games,
        Self::GameDetail,
        Self::GameMovies,
        Self::GameScreenshots,
        Self::Genres,
        Self::Platforms,
    ];

    /// Stable identifier, also used as the cache key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Games => "games",
            Self::GameDetail => "game-detail",
            Self::GameMovies => "game-movies",
            Self::GameScreenshots => "game-screenshots",
            Self::Genres => "genres",
            Self::Platforms => "platforms",
        }
    }

    /// Human readable name used in error messages.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Games => "games",
            Self::GameDetail => "game details",
            Self::GameMovies => "game movies",
            Self::GameScreenshots => "game screenshots",
            Self::Genres => "genres",
            Self::Platforms => "platforms",
        }
    }

    pub fn accepted_params(&self) -> &'static [&'static str] {
        match self {
            Self::Games => GAMES_PARAMS,
            _ => &[],
        }
    }

    pub fn is_selector_param(name: &str) -> bool {
        SELECTOR_PARAMS.contains(&name)
    }

    /// Whether requests for this family address one item by path segment.
    pub fn requires_segment(&self) -> bool {
        matches!(
            self,
            Self::GameDetail | Self::GameMovies | Self::GameScreenshots
        )
    }

    /// Path on the upstream API, relative to its base URL.
    ///
    /// `segment` is expected to be URL-safe already for item families.
    pub fn upstream_path(&self, segment: Option<&str>) -> String {
        let segment = segment.unwrap_or_default();
        match self {
            Self::Games => "/games".to_string(),
            Self::GameDetail => format!("/games/{}", segment),
            Self::GameMovies => format!("/games/{}/movies", segment),
            Self::GameScreenshots => format!("/games/{}/screenshots", segment),
            Self::Genres => "/genres".to_string(),
            Self::Platforms => "/platforms/lists/parents".to_string(),
        }
    }
}

impl fmt::Display for ResourceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
