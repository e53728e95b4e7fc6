//! Metrics hooks and TTL policies for the tenant cache.
//!
//! # Metrics
//!
//! The facade swallows store and decoding failures, so [`CacheMetrics`] is
//! where they stay visible. Implement it to feed your monitoring system:
//!
//! ```ignore
//! use tenant_cache::observability::CacheMetrics;
//! use tenant_cache::Error;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _field: &str, _duration: Duration) {
//!         // counter!("tenant_cache_hits").inc();
//!     }
//!     fn record_error(&self, operation: &str, _field: &str, _error: &Error) {
//!         // counter!("tenant_cache_errors", "op" => operation).inc();
//!     }
//! }
//!
//! let cache = cache.with_metrics(Arc::new(PrometheusMetrics));
//! ```
//!
//! # TTL Policies
//!
//! Expiry is attached to the whole tenant hash, so a write's policy applies to
//! every field of that tenant:
//!
//! | Policy | Effect on the tenant hash |
//! |--------|---------------------------|
//! | `Default` | expire after `CACHE_DEFAULT_TIMEOUT` |
//! | `Persistent` | remove any expiry |
//! | `Fixed(d)` | expire after `d` |

use crate::error::Error;
use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a read that found a value.
    fn record_hit(&self, field: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", field, duration);
    }

    /// Record a read that found nothing.
    fn record_miss(&self, field: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", field, duration);
    }

    /// Record a hash write.
    fn record_write(&self, field: &str, duration: Duration) {
        debug!("Cache WRITE: {} took {:?}", field, duration);
    }

    /// Record a field deletion.
    fn record_delete(&self, field: &str, duration: Duration) {
        debug!("Cache DELETE: {} took {:?}", field, duration);
    }

    /// Record an error the facade swallowed.
    fn record_error(&self, operation: &str, field: &str, error: &Error) {
        warn!("Cache ERROR in {} for {}: {}", operation, field, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _field: &str, _duration: Duration) {}
    fn record_miss(&self, _field: &str, _duration: Duration) {}
    fn record_write(&self, _field: &str, _duration: Duration) {}
    fn record_delete(&self, _field: &str, _duration: Duration) {}
    fn record_error(&self, _operation: &str, _field: &str, _error: &Error) {}
}

/// TTL policy applied to the tenant hash on a write.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TtlPolicy {
    /// Use the process-wide default timeout
    #[default]
    Default,

    /// Remove any expiry from the hash
    Persistent,

    /// Expire the hash after this duration
    Fixed(Duration),
}

impl TtlPolicy {
    /// Expiry to set on the hash, or `None` to make it persistent.
    ///
    /// A zero default timeout resolves to persistent: expiring a key after zero
    /// seconds deletes it.
    pub fn resolve(&self, default_timeout: Duration) -> Option<Duration> {
        match self {
            TtlPolicy::Default if default_timeout.is_zero() => None,
            TtlPolicy::Default => Some(default_timeout),
            TtlPolicy::Persistent => None,
            TtlPolicy::Fixed(d) => Some(*d),
        }
    }
}

impl From<Option<Duration>> for TtlPolicy {
    /// `None` → default, `Some(0)` → persistent, `Some(n)` → fixed.
    fn from(ttl: Option<Duration>) -> Self {
        match ttl {
            None => TtlPolicy::Default,
            Some(d) if d.is_zero() => TtlPolicy::Persistent,
            Some(d) => TtlPolicy::Fixed(d),
        }
    }
}
