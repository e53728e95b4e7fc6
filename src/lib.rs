//! # tenant-cache
//!
//! A per-tenant caching facade over a remote key-value store.
//!
//! ## Features
//!
//! - **Tenant-scoped:** Each tenant's entries live in one store hash, named by
//!   the tenant key, with a single TTL for the whole hash
//! - **Fail-silent:** Cache reads and writes never return errors; failures show
//!   up as absent values, in the log, and through [`observability::CacheMetrics`]
//! - **Explicit TTL policy:** [`TtlPolicy`] selects default, persistent, or a
//!   fixed expiry per write
//! - **Presence registry:** A global set of connected users, which does report
//!   errors
//! - **Store agnostic:** In-memory (default) and Redis stores behind
//!   [`CacheStore`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tenant_cache::{CacheSettings, TenantCache};
//!
//! // 1. Load CACHING / CACHE_DEFAULT_TIMEOUT
//! let settings = Arc::new(CacheSettings::from_env()?);
//!
//! // 2. Open once at startup; an unreachable server gives a degraded facade
//! let cache = TenantCache::open("redis://localhost:6379/0", Arc::new(company), settings).await;
//!
//! // 3. Use it - TenantCache is Clone for sharing across tasks
//! cache.write("price_table", &prices).await;
//! cache.write_with_ttl("session", &token, Some(Duration::from_secs(30))).await;
//! let prices: Option<Vec<Price>> = cache.get("price_table").await;
//!
//! cache.add_user(&user).await?;
//! ```

#[macro_use]
extern crate log;

pub mod error;
pub mod facade;
pub mod key;
pub mod observability;
pub mod serialization;
pub mod settings;
pub mod store;
pub mod tenant;
pub mod value;

// Re-exports for convenience
pub use error::{Error, Result};
pub use facade::TenantCache;
pub use observability::TtlPolicy;
pub use settings::CacheSettings;
pub use store::{CacheStore, KeyTtl};
pub use tenant::Tenant;
pub use value::CacheValue;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
