//! In-memory store (default, thread-safe, async).
//!
//! Uses DashMap for concurrent access with per-key sharding. Follows Redis
//! semantics for the commands the facade issues: hashes and sets live under
//! typed keys, empty collections disappear, and expiry is enforced lazily on
//! access.

use super::{CacheStore, KeyTtl};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Eviction policies accepted by `CONFIG SET maxmemory-policy`.
const EVICTION_POLICIES: &[&str] = &[
    "noeviction",
    "allkeys-lru",
    "allkeys-lfu",
    "allkeys-random",
    "volatile-lru",
    "volatile-lfu",
    "volatile-random",
    "volatile-ttl",
];

enum StoredValue {
    Hash(HashMap<String, Vec<u8>>),
    Set(HashSet<Vec<u8>>),
}

impl StoredValue {
    fn is_empty(&self) -> bool {
        match self {
            StoredValue::Hash(h) => h.is_empty(),
            StoredValue::Set(s) => s.is_empty(),
        }
    }
}

/// Stored key with optional expiration.
struct StoreEntry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl StoreEntry {
    fn new(value: StoredValue) -> Self {
        StoreEntry {
            value,
            expires_at: None,
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

fn wrong_type(key: &str) -> Error {
    Error::BackendError(format!(
        "WRONGTYPE Operation against a key holding the wrong kind of value: {}",
        key
    ))
}

/// Thread-safe async in-memory store.
///
/// Clones share the same data.
///
/// # Example
///
/// ```no_run
/// use tenant_cache::store::{CacheStore, InMemoryStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryStore::new();
///
///     store.hset("tenant", "field", b"value".to_vec()).await?;
///     assert_eq!(store.hget("tenant", "field").await?, Some(b"value".to_vec()));
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryStore {
    store: Arc<DashMap<String, StoreEntry>>,
    eviction_policy: Arc<RwLock<Option<String>>>,
}

impl InMemoryStore {
    /// Create a new, empty in-memory store.
    pub fn new() -> Self {
        InMemoryStore {
            store: Arc::new(DashMap::new()),
            eviction_policy: Arc::new(RwLock::new(None)),
        }
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        self.store.iter().filter(|entry| !entry.is_expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Eviction policy last set through `CONFIG SET maxmemory-policy`.
    pub fn eviction_policy(&self) -> Option<String> {
        self.eviction_policy
            .read()
            .ok()
            .and_then(|policy| policy.clone())
    }

    fn purge_if_expired(&self, key: &str) {
        if self.store.remove_if(key, |_, entry| entry.is_expired()).is_some() {
            debug!("✓ InMemory EXPIRED {}", key);
        }
    }

    fn remove_if_empty(&self, key: &str) {
        self.store.remove_if(key, |_, entry| entry.value.is_empty());
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore for InMemoryStore {
    async fn hset(&self, key: &str, field: &str, value: Vec<u8>) -> Result<()> {
        self.purge_if_expired(key);
        let mut entry = self
            .store
            .entry(key.to_string())
            .or_insert_with(|| StoreEntry::new(StoredValue::Hash(HashMap::new())));

        match &mut entry.value {
            StoredValue::Hash(hash) => {
                hash.insert(field.to_string(), value);
                debug!("✓ InMemory HSET {} {}", key, field);
                Ok(())
            }
            StoredValue::Set(_) => Err(wrong_type(key)),
        }
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<Vec<u8>>> {
        self.purge_if_expired(key);
        match self.store.get(key) {
            Some(entry) => match &entry.value {
                StoredValue::Hash(hash) => Ok(hash.get(field).cloned()),
                StoredValue::Set(_) => Err(wrong_type(key)),
            },
            None => Ok(None),
        }
    }

    async fn hgetall(&self, key: &str) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.purge_if_expired(key);
        match self.store.get(key) {
            Some(entry) => match &entry.value {
                StoredValue::Hash(hash) => Ok(hash
                    .iter()
                    .map(|(field, value)| (field.clone().into_bytes(), value.clone()))
                    .collect()),
                StoredValue::Set(_) => Err(wrong_type(key)),
            },
            None => Ok(Vec::new()),
        }
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<()> {
        self.purge_if_expired(key);
        if let Some(mut entry) = self.store.get_mut(key) {
            match &mut entry.value {
                StoredValue::Hash(hash) => {
                    hash.remove(field);
                }
                StoredValue::Set(_) => return Err(wrong_type(key)),
            }
        }
        self.remove_if_empty(key);
        debug!("✓ InMemory HDEL {} {}", key, field);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.store.remove(key);
        debug!("✓ InMemory DEL {}", key);
        Ok(())
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        self.purge_if_expired(key);
        if ttl.is_zero() {
            self.store.remove(key);
            return Ok(());
        }
        if let Some(mut entry) = self.store.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
            debug!("✓ InMemory EXPIRE {} ({:?})", key, ttl);
        }
        Ok(())
    }

    async fn persist(&self, key: &str) -> Result<()> {
        self.purge_if_expired(key);
        if let Some(mut entry) = self.store.get_mut(key) {
            entry.expires_at = None;
            debug!("✓ InMemory PERSIST {}", key);
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<KeyTtl> {
        self.purge_if_expired(key);
        Ok(match self.store.get(key) {
            Some(entry) => match entry.expires_at {
                Some(exp) => KeyTtl::Expires(exp.saturating_duration_since(Instant::now())),
                None => KeyTtl::Persistent,
            },
            None => KeyTtl::Missing,
        })
    }

    async fn sadd(&self, key: &str, member: Vec<u8>) -> Result<()> {
        self.purge_if_expired(key);
        let mut entry = self
            .store
            .entry(key.to_string())
            .or_insert_with(|| StoreEntry::new(StoredValue::Set(HashSet::new())));

        match &mut entry.value {
            StoredValue::Set(set) => {
                set.insert(member);
                debug!("✓ InMemory SADD {}", key);
                Ok(())
            }
            StoredValue::Hash(_) => Err(wrong_type(key)),
        }
    }

    async fn srem(&self, key: &str, member: &[u8]) -> Result<()> {
        self.purge_if_expired(key);
        if let Some(mut entry) = self.store.get_mut(key) {
            match &mut entry.value {
                StoredValue::Set(set) => {
                    set.remove(member);
                }
                StoredValue::Hash(_) => return Err(wrong_type(key)),
            }
        }
        self.remove_if_empty(key);
        debug!("✓ InMemory SREM {}", key);
        Ok(())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<Vec<u8>>> {
        self.purge_if_expired(key);
        match self.store.get(key) {
            Some(entry) => match &entry.value {
                StoredValue::Set(set) => Ok(set.iter().cloned().collect()),
                StoredValue::Hash(_) => Err(wrong_type(key)),
            },
            None => Ok(Vec::new()),
        }
    }

    async fn config_set(&self, parameter: &str, value: &str) -> Result<()> {
        if !parameter.eq_ignore_ascii_case("maxmemory-policy") {
            return Err(Error::BackendError(format!(
                "ERR Unknown option or number of arguments for CONFIG SET - '{}'",
                parameter
            )));
        }
        if !EVICTION_POLICIES.contains(&value) {
            return Err(Error::BackendError(format!(
                "ERR Invalid argument '{}' for CONFIG SET '{}'",
                value, parameter
            )));
        }

        let mut policy = self
            .eviction_policy
            .write()
            .map_err(|e| Error::BackendError(format!("eviction policy lock poisoned: {}", e)))?;
        *policy = Some(value.to_string());
        info!("✓ InMemory CONFIG SET {} {}", parameter, value);
        Ok(())
    }
}
