//! Tenant-scoped cache facade - main entry point.
//!
//! Every tenant owns one hash in the store, named by its tenant key. Fields of
//! that hash are the cache entries; the hash carries a single TTL shared by all
//! of them. A separate global set tracks connected users.
//!
//! Cache operations never fail observably: store and decoding errors become an
//! absent/empty result, get logged, and reach [`CacheMetrics::record_error`].
//! Presence operations are the exception and return [`Result`].

use crate::error::{Error, Result};
use crate::key::CacheKeyBuilder;
use crate::observability::{CacheMetrics, NoOpMetrics, TtlPolicy};
use crate::serialization::{decode_value, deserialize_from_cache, serialize_for_cache};
use crate::settings::CacheSettings;
use crate::store::{CacheStore, KeyTtl};
use crate::tenant::Tenant;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Eviction policy configured on the store at construction.
pub const EVICTION_POLICY: &str = "allkeys-lru";

/// Per-tenant cache over a [`CacheStore`].
///
/// Cloning is cheap and clones share the store handle, tenant, settings and
/// metrics. Construct once at startup and hand clones (or references) to
/// consumers.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tenant_cache::{CacheSettings, TenantCache};
/// use tenant_cache::store::InMemoryStore;
///
/// # #[tokio::main]
/// # async fn main() {
/// let cache = TenantCache::with_store(
///     InMemoryStore::new(),
///     Arc::new("12345678000199".to_string()),
///     Arc::new(CacheSettings::default()),
/// )
/// .await;
///
/// cache.write("answer", &42i64).await;
/// assert_eq!(cache.get::<i64>("answer").await, Some(42));
/// # }
/// ```
#[derive(Clone)]
pub struct TenantCache<S: CacheStore> {
    store: Option<S>,
    tenant: Arc<dyn Tenant>,
    settings: Arc<CacheSettings>,
    metrics: Arc<dyn CacheMetrics>,
}

#[cfg(feature = "redis")]
impl TenantCache<crate::store::RedisStore> {
    /// Connect to the Redis server at `url`.
    ///
    /// Never fails: if the pool cannot be built or the server rejects the
    /// eviction policy, the facade starts in degraded mode.
    pub async fn open(url: &str, tenant: Arc<dyn Tenant>, settings: Arc<CacheSettings>) -> Self {
        match crate::store::RedisStore::from_connection_string(url).await {
            Ok(store) => Self::with_store(store, tenant, settings).await,
            Err(e) => {
                warn!("⚠ Cache store unavailable, running degraded: {}", e);
                Self::degraded(tenant, settings)
            }
        }
    }
}

impl<S: CacheStore> TenantCache<S> {
    /// Wrap `store`, setting its eviction policy to `allkeys-lru`.
    ///
    /// If the store cannot be configured the facade starts in degraded mode.
    pub async fn with_store(
        store: S,
        tenant: Arc<dyn Tenant>,
        settings: Arc<CacheSettings>,
    ) -> Self {
        let store = match store.config_set("maxmemory-policy", EVICTION_POLICY).await {
            Ok(()) => {
                info!("✓ Tenant cache ready for {}", tenant.tenant_key());
                Some(store)
            }
            Err(e) => {
                warn!("⚠ Cache store unavailable, running degraded: {}", e);
                None
            }
        };

        TenantCache {
            store,
            tenant,
            settings,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// A facade with no store: every cache operation is a no-op and presence
    /// operations fail with `Error::ConnectionUnavailable`.
    pub fn degraded(tenant: Arc<dyn Tenant>, settings: Arc<CacheSettings>) -> Self {
        TenantCache {
            store: None,
            tenant,
            settings,
            metrics: Arc::new(NoOpMetrics),
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn is_degraded(&self) -> bool {
        self.store.is_none()
    }

    /// Name of this tenant's hash.
    pub fn tenant_key(&self) -> String {
        CacheKeyBuilder::tenant_hash(self.tenant.as_ref())
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    fn store(&self) -> Result<&S> {
        self.store.as_ref().ok_or_else(|| {
            Error::ConnectionUnavailable("cache is running in degraded mode".to_string())
        })
    }

    fn swallow(&self, operation: &str, field: &str, error: &Error) {
        debug!(
            "Cache {} for {}/{} failed, treating as absent: {}",
            operation,
            self.tenant.tenant_key(),
            field,
            error
        );
        self.metrics.record_error(operation, field, error);
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read `field` from the tenant hash.
    ///
    /// Returns `None` when caching is disabled, the field is absent, the store
    /// fails, or the stored bytes decode neither as integer text nor as a `T`
    /// blob.
    pub async fn get<T: DeserializeOwned>(&self, field: &str) -> Option<T> {
        if !self.settings.is_enabled() {
            return None;
        }

        let timer = Instant::now();
        match self.try_get(field).await {
            Ok(Some(value)) => {
                self.metrics.record_hit(field, timer.elapsed());
                Some(value)
            }
            Ok(None) => {
                self.metrics.record_miss(field, timer.elapsed());
                None
            }
            Err(e) => {
                self.swallow("get", field, &e);
                None
            }
        }
    }

    /// Indexed read; same contract as [`get`](Self::get).
    pub async fn get_item<T: DeserializeOwned>(&self, field: &str) -> Option<T> {
        self.get(field).await
    }

    pub(crate) async fn try_get<T: DeserializeOwned>(&self, field: &str) -> Result<Option<T>> {
        let key = self.tenant_key();
        match self.store()?.hget(&key, field).await? {
            Some(bytes) => decode_value(&bytes).map(Some),
            None => Ok(None),
        }
    }

    /// All fields of the tenant hash.
    ///
    /// All-or-nothing: if any field name is not UTF-8 or any value does not
    /// decode as a `T` blob, the result is empty. `dict::<CacheValue>()` reads
    /// any hash, whatever types its fields were written with.
    pub async fn dict<T: DeserializeOwned>(&self) -> HashMap<String, T> {
        match self.try_dict().await {
            Ok(entries) => entries,
            Err(e) => {
                self.swallow("dict", "*", &e);
                HashMap::new()
            }
        }
    }

    pub(crate) async fn try_dict<T: DeserializeOwned>(&self) -> Result<HashMap<String, T>> {
        let key = self.tenant_key();
        self.store()?
            .hgetall(&key)
            .await?
            .into_iter()
            .map(|(field, value)| -> Result<(String, T)> {
                let field = String::from_utf8(field).map_err(|e| {
                    Error::DeserializationError(format!("hash field is not UTF-8: {}", e))
                })?;
                let value = deserialize_from_cache(&value)?;
                Ok((field, value))
            })
            .collect()
    }

    /// Current TTL of the tenant hash; `KeyTtl::Missing` if it cannot be read.
    pub async fn ttl(&self) -> KeyTtl {
        let key = self.tenant_key();
        let result = match self.store() {
            Ok(store) => store.ttl(&key).await,
            Err(e) => Err(e),
        };
        result.unwrap_or_else(|e| {
            self.swallow("ttl", "*", &e);
            KeyTtl::Missing
        })
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Store `value` under `field` without touching the hash's TTL.
    pub async fn set<V: Serialize + ?Sized>(&self, field: &str, value: &V) {
        if !self.settings.is_enabled() {
            return;
        }

        let timer = Instant::now();
        match self.try_set(field, value).await {
            Ok(()) => self.metrics.record_write(field, timer.elapsed()),
            Err(e) => self.swallow("set", field, &e),
        }
    }

    pub(crate) async fn try_set<V: Serialize + ?Sized>(
        &self,
        field: &str,
        value: &V,
    ) -> Result<()> {
        let store = self.store()?;
        let bytes = serialize_for_cache(value)?;
        store.hset(&self.tenant_key(), field, bytes).await
    }

    /// Store `value` under `field` and apply the default TTL to the hash.
    pub async fn write<V: Serialize + ?Sized>(&self, field: &str, value: &V) {
        self.write_with_policy(field, value, TtlPolicy::Default).await
    }

    /// Store `value` under `field` and set the hash's TTL.
    ///
    /// `None` applies the default TTL, `Some(Duration::ZERO)` makes the hash
    /// persistent, any other duration becomes the hash's expiry.
    pub async fn write_with_ttl<V: Serialize + ?Sized>(
        &self,
        field: &str,
        value: &V,
        ttl: Option<Duration>,
    ) {
        self.write_with_policy(field, value, TtlPolicy::from(ttl)).await
    }

    /// Store `value` under `field` and apply `policy` to the whole hash.
    pub async fn write_with_policy<V: Serialize + ?Sized>(
        &self,
        field: &str,
        value: &V,
        policy: TtlPolicy,
    ) {
        if !self.settings.is_enabled() {
            return;
        }

        let timer = Instant::now();
        match self.try_write(field, value, policy).await {
            Ok(()) => self.metrics.record_write(field, timer.elapsed()),
            Err(e) => self.swallow("write", field, &e),
        }
    }

    pub(crate) async fn try_write<V: Serialize + ?Sized>(
        &self,
        field: &str,
        value: &V,
        policy: TtlPolicy,
    ) -> Result<()> {
        let store = self.store()?;
        let bytes = serialize_for_cache(value)?;
        let key = self.tenant_key();

        store.hset(&key, field, bytes).await?;
        match policy.resolve(self.settings.default_timeout()) {
            Some(ttl) => store.expire(&key, ttl).await?,
            None => store.persist(&key).await?,
        }

        debug!("» Cache write {}/{} ({:?})", key, field, policy);
        Ok(())
    }

    /// Write every entry with the default TTL.
    ///
    /// A failed entry does not stop the remaining ones.
    pub async fn store_dict<K, V, I>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        let mut count = 0usize;
        for (field, value) in entries {
            self.write(field.as_ref(), &value).await;
            count += 1;
        }
        info!(
            "Stored {} entries for tenant {}",
            count,
            self.tenant.tenant_key()
        );
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Remove `field` from the tenant hash.
    ///
    /// Also deletes a top-level key named `field`, left behind by deployments
    /// that cached values as plain keys.
    pub async fn delete(&self, field: &str) {
        let timer = Instant::now();
        match self.try_delete(field).await {
            Ok(()) => {
                info!("Deleted cache field {}", field);
                self.metrics.record_delete(field, timer.elapsed());
            }
            Err(e) => self.swallow("delete", field, &e),
        }
    }

    pub(crate) async fn try_delete(&self, field: &str) -> Result<()> {
        let store = self.store()?;
        store.hdel(&self.tenant_key(), field).await?;
        store.del(field).await
    }

    /// Drop the tenant hash with all its fields.
    pub async fn clear(&self) {
        let key = self.tenant_key();
        let result = match self.store() {
            Ok(store) => store.del(&key).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => info!("Cleared cache for tenant {}", key),
            Err(e) => self.swallow("clear", "*", &e),
        }
    }

    // ------------------------------------------------------------------
    // Presence
    // ------------------------------------------------------------------

    /// Register `user` in the global presence set.
    ///
    /// # Errors
    /// `Error::ConnectionUnavailable` in degraded mode; store and serialization
    /// errors are returned as-is.
    pub async fn add_user<U: Serialize + ?Sized>(&self, user: &U) -> Result<()> {
        let store = self.store()?;
        let member = serialize_for_cache(user)?;
        store.sadd(CacheKeyBuilder::presence_set(), member).await
    }

    /// Remove `user` from the global presence set.
    ///
    /// # Errors
    /// `Error::ConnectionUnavailable` in degraded mode; store and serialization
    /// errors are returned as-is.
    pub async fn remove_user<U: Serialize + ?Sized>(&self, user: &U) -> Result<()> {
        let store = self.store()?;
        let member = serialize_for_cache(user)?;
        store.srem(CacheKeyBuilder::presence_set(), &member).await
    }

    /// All users in the global presence set.
    ///
    /// # Errors
    /// `Error::ConnectionUnavailable` in degraded mode; store errors and members
    /// that do not decode as `U` are returned as-is.
    pub async fn list_users<U>(&self) -> Result<HashSet<U>>
    where
        U: DeserializeOwned + Eq + Hash,
    {
        let members = self
            .store()?
            .smembers(CacheKeyBuilder::presence_set())
            .await?;
        members
            .iter()
            .map(|member| deserialize_from_cache(member))
            .collect()
    }

    /// True when the store answers a health check.
    pub async fn health_check(&self) -> bool {
        match self.store() {
            Ok(store) => store.health_check().await.unwrap_or(false),
            Err(_) => false,
        }
    }
}

impl<S: CacheStore> fmt::Debug for TenantCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TenantCache")
            .field("tenant", &self.tenant.tenant_key())
            .field("degraded", &self.is_degraded())
            .field("caching", &self.settings.is_enabled())
            .finish()
    }
}

#[cfg(all(test, feature = "inmemory"))]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TENANT: &str = "12345678000199";

    async fn cache() -> (TenantCache<InMemoryStore>, InMemoryStore) {
        let store = InMemoryStore::new();
        let cache = TenantCache::with_store(
            store.clone(),
            Arc::new(TENANT.to_string()),
            Arc::new(CacheSettings::default()),
        )
        .await;
        (cache, store)
    }

    #[derive(Default)]
    struct CountingMetrics {
        errors: AtomicUsize,
        hits: AtomicUsize,
    }

    impl CacheMetrics for CountingMetrics {
        fn record_hit(&self, _field: &str, _duration: Duration) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }

        fn record_error(&self, _operation: &str, _field: &str, _error: &Error) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_construction_sets_eviction_policy() {
        let (cache, store) = cache().await;
        assert!(!cache.is_degraded());
        assert_eq!(store.eviction_policy().as_deref(), Some(EVICTION_POLICY));
    }

    #[tokio::test]
    async fn test_values_live_in_tenant_hash() {
        let (cache, store) = cache().await;
        cache.write("answer", &42i64).await;

        assert!(store.hget(TENANT, "answer").await.unwrap().is_some());
        assert_eq!(cache.tenant_key(), TENANT);
    }

    #[tokio::test]
    async fn test_try_get_reports_decode_error() {
        let (cache, store) = cache().await;
        store
            .hset(TENANT, "broken", b"\x00garbage".to_vec())
            .await
            .unwrap();

        assert!(cache.try_get::<String>("broken").await.is_err());
        assert_eq!(cache.get::<String>("broken").await, None);
    }

    #[tokio::test]
    async fn test_swallowed_errors_reach_metrics() {
        let (cache, store) = cache().await;
        let metrics = Arc::new(CountingMetrics::default());
        let cache = cache.with_metrics(metrics.clone());

        store.hset(TENANT, "broken", vec![0xff]).await.unwrap();
        cache.write("ok", "fine").await;

        assert_eq!(cache.get::<String>("broken").await, None);
        assert_eq!(cache.get::<String>("ok").await.as_deref(), Some("fine"));

        assert_eq!(metrics.errors.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_try_write_persistent_policy() {
        let (cache, _store) = cache().await;
        cache
            .try_write("a", &1i64, TtlPolicy::Persistent)
            .await
            .expect("Failed to write");
        assert_eq!(cache.ttl().await, KeyTtl::Persistent);
    }

    #[tokio::test]
    async fn test_degraded_try_dict_is_connection_error() {
        let cache: TenantCache<InMemoryStore> = TenantCache::degraded(
            Arc::new(TENANT.to_string()),
            Arc::new(CacheSettings::default()),
        );
        let err = cache.try_dict::<i64>().await.unwrap_err();
        assert!(err.is_connection());
        assert!(!cache.health_check().await);
    }

    #[tokio::test]
    async fn test_debug_names_tenant_and_mode() {
        let (cache, _store) = cache().await;
        let rendered = format!("{:?}", cache);
        assert!(rendered.contains(TENANT));
        assert!(rendered.contains("degraded: false"));
    }
}
