//! Response cache stores
//!
//! Caching is a pure optimisation: every store answers `get` with `None` when
//! it cannot serve a value and treats `set` as best effort. A store is picked
//! once at startup by [`from_config`] and shared by every tool call.
//!
//! | backend    | store           | notes                                  |
//! |------------|-----------------|----------------------------------------|
//! | `redis`    | [`RedisCache`]  | `SET key value EX ttl`, shared         |
//! | `memory`   | [`MemoryCache`] | in-process TTL map                     |
//! | `disabled` | [`NullCache`]   | always misses, writes are no-ops       |

mod memory;
mod redis_backend;

pub use self::memory::{CacheStatsSnapshot, MemoryCache};
pub use self::redis_backend::RedisCache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::info;

use crate::config::{CacheBackendKind, CacheConfig};
use crate::{Error, Result};

/// Key/value store with per-entry expiry.
///
/// Implementations never surface failures: a broken backend reads as a miss
/// and drops writes.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up `key`; `None` when absent, expired or unreachable.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Store `payload` under `key` for `ttl`. Best effort.
    async fn set(&self, key: &str, payload: &Value, ttl: Duration);

    /// Backend name for health output and logs
    fn backend(&self) -> &'static str;

    /// Whether the backend answers right now. In-process stores always do.
    async fn ping(&self) -> bool {
        true
    }
}

/// Store used when caching is disabled or unconfigured
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

#[async_trait]
impl CacheStore for NullCache {
    async fn get(&self, _key: &str) -> Option<Value> {
        None
    }

    async fn set(&self, _key: &str, _payload: &Value, _ttl: Duration) {}

    fn backend(&self) -> &'static str {
        "disabled"
    }
}

/// Failures inside a cache backend. Never leaves this module's stores.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Could not reach the backend
    #[error("Connection error: {0}")]
    Connection(String),

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend rejected the command
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Build the process-wide cache store described by `config`.
///
/// Fails only on misconfiguration (e.g. `backend: redis` without a URL); an
/// unreachable Redis is not an error here.
pub fn from_config(config: &CacheConfig) -> Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match (config.backend, config.redis_url.as_deref()) {
        (CacheBackendKind::Disabled, _) | (CacheBackendKind::Auto, None) => Arc::new(NullCache),
        (CacheBackendKind::Memory, _) => Arc::new(MemoryCache::with_capacity(config.max_entries)),
        (CacheBackendKind::Redis | CacheBackendKind::Auto, Some(url)) => Arc::new(
            RedisCache::open(url, config.connect_timeout)
                .map_err(|e| Error::Config(format!("Invalid cache.redis_url: {e}")))?,
        ),
        (CacheBackendKind::Redis, None) => {
            return Err(Error::Config(
                "cache.backend is 'redis' but cache.redis_url is not set".to_string(),
            ));
        }
    };

    info!(backend = store.backend(), "Response cache ready");
    Ok(store)
}
