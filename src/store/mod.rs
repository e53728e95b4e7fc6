//! Key-value store implementations.

use crate::error::Result;
use std::time::Duration;

#[cfg(feature = "inmemory")]
pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

#[cfg(feature = "inmemory")]
pub use inmemory::InMemoryStore;
#[cfg(feature = "redis")]
pub use redis::{RedisConfig, RedisStore};

/// Remaining lifetime of a store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyTtl {
    /// Key does not exist
    Missing,
    /// Key exists without expiry
    Persistent,
    /// Key expires after this duration
    Expires(Duration),
}

impl KeyTtl {
    /// Interpret a `TTL` reply: `-2` missing, `-1` no expiry, otherwise seconds.
    pub fn from_reply(seconds: i64) -> Self {
        match seconds {
            -1 => KeyTtl::Persistent,
            s if s < 0 => KeyTtl::Missing,
            s => KeyTtl::Expires(Duration::from_secs(s as u64)),
        }
    }

    pub fn remaining(&self) -> Option<Duration> {
        match self {
            KeyTtl::Expires(d) => Some(*d),
            _ => None,
        }
    }
}

/// Capabilities the facade needs from the remote store.
///
/// Mirrors the Redis command set it uses: hashes for tenant data, a set for
/// presence, key expiry, and `CONFIG SET` for the eviction policy.
///
/// All methods take `&self`; implementations share their connection state
/// internally so one handle can serve concurrent callers.
#[allow(async_fn_in_trait)]
pub trait CacheStore: Send + Sync + Clone {
    /// `HSET key field value`
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip or when `key` is not a hash.
    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<()>;

    /// `HGET key field`; `Ok(None)` when the key or field is absent.
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip or when `key` is not a hash.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>>;

    /// `HGETALL key` as raw `(field, value)` pairs; empty when the key is absent.
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip or when `key` is not a hash.
    async fn hgetall(&self, key: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;

    /// `HDEL key field`
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip or when `key` is not a hash.
    async fn hdel(&self, key: &str, field: &str) -> Result<()>;

    /// `DEL key`
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip.
    async fn del(&self, key: &str) -> Result<()>;

    /// `EXPIRE key seconds`; a no-op for missing keys.
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// `PERSIST key`
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip.
    async fn persist(&self, key: &str) -> Result<()>;

    /// `TTL key`
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip.
    async fn ttl(&self, key: &str) -> Result<KeyTtl>;

    /// `SADD key member`
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip or when `key` is not a set.
    async fn sadd(&self, key: &str, member: Vec<u8>) -> Result<()>;

    /// `SREM key member`
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip or when `key` is not a set.
    async fn srem(&self, key: &str, member: &[u8]) -> Result<()>;

    /// `SMEMBERS key`; empty when the key is absent.
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip or when `key` is not a set.
    async fn smembers(&self, key: &str) -> Result<Vec<Vec<u8>>>;

    /// `CONFIG SET parameter value`
    ///
    /// # Errors
    /// Returns `Err` on a failed round-trip or an unsupported parameter.
    async fn config_set(&self, parameter: &str, value: &str) -> Result<()>;

    /// Health check - verify the store is reachable.
    ///
    /// # Errors
    /// Returns `Err` if the store is not accessible
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}
