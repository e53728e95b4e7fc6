//! Runtime settings read by the facade on every gated operation.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Environment variable holding the master caching switch.
pub const CACHING_VAR: &str = "CACHING";

/// Environment variable holding the default hash TTL, in seconds.
pub const DEFAULT_TIMEOUT_VAR: &str = "CACHE_DEFAULT_TIMEOUT";

const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Caching feature flag and default TTL.
///
/// Shared between the facade and the application through an `Arc`; both
/// values may be changed while the facade is in use.
#[derive(Debug)]
pub struct CacheSettings {
    caching: AtomicBool,
    default_timeout_secs: AtomicU64,
}

impl CacheSettings {
    pub fn new(caching: bool, default_timeout: Duration) -> Self {
        CacheSettings {
            caching: AtomicBool::new(caching),
            default_timeout_secs: AtomicU64::new(default_timeout.as_secs()),
        }
    }

    /// Load from `CACHING` and `CACHE_DEFAULT_TIMEOUT`.
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if a variable is set to a malformed value.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve variable names. Unset variables keep
    /// their defaults (caching on, 300 seconds).
    ///
    /// # Errors
    /// Returns `Error::ConfigError` if a variable is set to a malformed value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let caching = match lookup(CACHING_VAR) {
            Some(raw) => parse_flag(&raw)?,
            None => true,
        };

        let timeout = match lookup(DEFAULT_TIMEOUT_VAR) {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                Error::ConfigError(format!("{} must be whole seconds: {}", DEFAULT_TIMEOUT_VAR, e))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };

        debug!("Cache settings: caching={}, default_timeout={}s", caching, timeout);
        Ok(Self::new(caching, Duration::from_secs(timeout)))
    }

    pub fn is_enabled(&self) -> bool {
        self.caching.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.caching.store(enabled, Ordering::Relaxed);
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs.load(Ordering::Relaxed))
    }

    pub fn set_default_timeout(&self, timeout: Duration) {
        self.default_timeout_secs
            .store(timeout.as_secs(), Ordering::Relaxed);
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::new(true, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(Error::ConfigError(format!(
            "{} must be a boolean, got {:?}",
            CACHING_VAR, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = CacheSettings::from_lookup(lookup(&[])).unwrap();
        assert!(settings.is_enabled());
        assert_eq!(settings.default_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_reads_variables() {
        let settings = CacheSettings::from_lookup(lookup(&[
            ("CACHING", "False"),
            ("CACHE_DEFAULT_TIMEOUT", " 60 "),
        ]))
        .unwrap();
        assert!(!settings.is_enabled());
        assert_eq!(settings.default_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_malformed_values_rejected() {
        let err = CacheSettings::from_lookup(lookup(&[("CACHING", "maybe")])).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));

        let err =
            CacheSettings::from_lookup(lookup(&[("CACHE_DEFAULT_TIMEOUT", "5m")])).unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[test]
    fn test_runtime_updates() {
        let settings = CacheSettings::default();
        settings.set_enabled(false);
        settings.set_default_timeout(Duration::from_secs(10));
        assert!(!settings.is_enabled());
        assert_eq!(settings.default_timeout(), Duration::from_secs(10));
    }
}
