//! Cache keys and TTLs per tool
//!
//! A key is the tool's prefix followed by each cache-relevant parameter
//! rendered as JSON, joined with `:`. JSON values are self-delimiting, so
//! `"a:b"` and `"a", "b"` never collide.

use std::fmt;
use std::time::Duration;

use serde_json::Value;

use crate::tools::{ToolName, ToolParams};

/// Prefix and lifetime for a cacheable tool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Key prefix
    pub prefix: &'static str,
    /// Entry lifetime
    pub ttl: Duration,
}

/// Cache policy for `tool`; `None` for per-caller tools that are never cached
#[must_use]
pub const fn policy(tool: ToolName) -> Option<CachePolicy> {
    let (prefix, secs) = match tool {
        ToolName::SearchAnime => ("search:anime", 3600),
        ToolName::TrendingAnime => ("trending:anime", 900),
        ToolName::SeasonAnime => ("season:anime", 1800),
        ToolName::CharacterInfo => ("character", 7 * 24 * 3600),
        ToolName::RecommendAnime => ("recommend:anime", 3600),
        ToolName::UserList => return None,
    };
    Some(CachePolicy {
        prefix,
        ttl: Duration::from_secs(secs),
    })
}

/// A derived cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key text as stored in the backend
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key and TTL for `params`, or `None` if the tool is never cached
#[must_use]
pub fn derive_key<P: ToolParams>(params: &P) -> Option<(CacheKey, Duration)> {
    let policy = policy(P::TOOL)?;
    let key = std::iter::once(policy.prefix.to_string())
        .chain(params.cache_components().iter().map(Value::to_string))
        .collect::<Vec<_>>()
        .join(":");
    Some((CacheKey(key), policy.ttl))
}
