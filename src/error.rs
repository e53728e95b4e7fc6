//! Error types for the tenant cache.

use std::fmt;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the tenant cache.
///
/// The cache operations on [`TenantCache`](crate::TenantCache) never hand these
/// to the caller: they are converted into an absent/empty result and reported
/// to the configured [`CacheMetrics`](crate::observability::CacheMetrics).
/// Presence operations return them as-is.
#[derive(Debug, Clone)]
pub enum Error {
    /// Serialization failed when converting a value to blob bytes.
    SerializationError(String),

    /// Deserialization failed when converting stored bytes back to a value.
    ///
    /// Raised for corrupted payloads, non-UTF-8 hash fields, or a stored value
    /// whose shape does not match the requested type.
    DeserializationError(String),

    /// The store returned an error for a round-trip.
    ///
    /// Common causes:
    /// - Connection lost or network timeout
    /// - Protocol error
    /// - `WRONGTYPE` reply (hash command against a set key, or vice versa)
    BackendError(String),

    /// No usable store connection.
    ///
    /// The facade is in degraded mode, or the pool could not hand out a
    /// connection. Presence operations surface this to the caller.
    ConnectionUnavailable(String),

    /// Invalid configuration value (environment variable, connection URL).
    ConfigError(String),

    /// Stored bytes are not a blob envelope (bad magic).
    InvalidCacheEntry(String),

    /// Blob envelope written with a different schema version.
    VersionMismatch {
        /// Expected schema version (from compiled code)
        expected: u32,
        /// Found schema version (from stored entry)
        found: u32,
    },

    /// Generic error with custom message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            Error::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::ConnectionUnavailable(msg) => write!(f, "Connection unavailable: {}", msg),
            Error::ConfigError(msg) => write!(f, "Config error: {}", msg),
            Error::InvalidCacheEntry(msg) => write!(f, "Invalid cache entry: {}", msg),
            Error::VersionMismatch { expected, found } => {
                write!(
                    f,
                    "Cache version mismatch: expected {}, found {}",
                    expected, found
                )
            }
            Error::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// True when the error means the store could not be reached at all.
    pub fn is_connection(&self) -> bool {
        matches!(self, Error::ConnectionUnavailable(_))
    }
}

impl From<String> for Error {
    fn from(e: String) -> Self {
        Error::Other(e)
    }
}

impl From<&str> for Error {
    fn from(e: &str) -> Self {
        Error::Other(e.to_string())
    }
}

#[cfg(feature = "redis")]
impl From<deadpool_redis::redis::RedisError> for Error {
    fn from(e: deadpool_redis::redis::RedisError) -> Self {
        if e.is_connection_refusal() || e.is_connection_dropped() {
            Error::ConnectionUnavailable(format!("Redis error: {}", e))
        } else {
            Error::BackendError(format!("Redis error: {}", e))
        }
    }
}
