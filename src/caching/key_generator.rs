//! # Cache Key Generator
//!
//! Derives deterministic cache keys from a resource family, an optional path
//! segment and the request's query parameters.
//!
//! Keys have the shape `family[:segment][:name=value&name=value]`. Parameters
//! are normalized first (see [`NormalizedQuery`]) and serialized sorted by
//! name, so the key never depends on the order in which a client sent them.

use super::ResourceFamily;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Query parameters exactly as received.
pub type RawParams = HashMap<String, String>;

/// Keys longer than this are replaced by a SHA-256 digest.
pub const DEFAULT_MAX_KEY_LENGTH: usize = 250;

/// A single normalized parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Number(u64),
    Text(String),
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// The subset of query parameters that identifies a request.
///
/// Built by keeping only the parameters the family accepts, trimming every
/// value, dropping empty values and dropping numeric selectors that are not a
/// positive integer. An absent parameter and one set to an excluded value
/// therefore normalize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedQuery(BTreeMap<String, QueryValue>);

impl NormalizedQuery {
    pub fn from_raw(family: ResourceFamily, raw: &RawParams) -> Self {
        let mut params = BTreeMap::new();

        for name in family.accepted_params() {
            let Some(value) = raw.get(*name) else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            if ResourceFamily::is_selector_param(name) {
                match value.parse::<u64>() {
                    Ok(n) if n > 0 => {
                        params.insert((*name).to_string(), QueryValue::Number(n));
                    }
                    _ => {}
                }
            } else {
                params.insert((*name).to_string(), QueryValue::Text(value.to_string()));
            }
        }

        Self(params)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, name: &str) -> Option<&QueryValue> {
        self.0.get(name)
    }

    /// Name/value pairs in key order, ready to hand to an HTTP client.
    pub fn pairs(&self) -> Vec<(&str, String)> {
        self.0
            .iter()
            .map(|(name, value)| (name.as_str(), value.to_string()))
            .collect()
    }

    /// Form-urlencoded, name-sorted serialization.
    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in &self.0 {
            serializer.append_pair(name, &value.to_string());
        }
        serializer.finish()
    }
}

/// Opaque cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Pure key builder.
#[derive(Debug, Clone)]
pub struct KeyBuilder {
    max_length: usize,
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }
}

impl KeyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Normalize `raw` and derive the key for it.
    pub fn build_key(
        &self,
        family: ResourceFamily,
        segment: Option<&str>,
        raw: &RawParams,
    ) -> CacheKey {
        let query = NormalizedQuery::from_raw(family, raw);
        self.key_for(family, segment, &query)
    }

    /// Derive the key for an already normalized query.
    pub fn key_for(
        &self,
        family: ResourceFamily,
        segment: Option<&str>,
        query: &NormalizedQuery,
    ) -> CacheKey {
        let mut components = vec![family.as_str().to_string()];

        if let Some(segment) = segment.map(str::trim).filter(|s| !s.is_empty()) {
            components.push(segment.to_string());
        }

        if !query.is_empty() {
            components.push(query.to_query_string());
        }

        self.truncate_key(family, components.join(":"))
    }

    fn truncate_key(&self, family: ResourceFamily, key: String) -> CacheKey {
        if key.len() <= self.max_length {
            return CacheKey(key);
        }

        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        CacheKey(format!("{}:hash:{}", family, hex::encode(hasher.finalize())))
    }
}
