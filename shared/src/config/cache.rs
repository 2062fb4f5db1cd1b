//! Redis and revocation store configuration

use serde::{Deserialize, Serialize};

use super::auth::env_parse;

/// Redis connection configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis connection URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Maximum retry attempts for a failed command
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries in milliseconds (doubled per attempt)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,

    /// Cache key prefix
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl CacheConfig {
    /// Create from environment variables (`REDIS_URL`, `REDIS_MAX_RETRIES`, `SG_KEY_PREFIX`)
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("REDIS_URL").unwrap_or_else(|_| default_url()),
            max_retries: env_parse("REDIS_MAX_RETRIES", default_max_retries()),
            retry_delay_ms: env_parse("REDIS_RETRY_DELAY_MS", default_retry_delay()),
            key_prefix: std::env::var("SG_KEY_PREFIX").unwrap_or_else(|_| default_key_prefix()),
        }
    }

    /// Create a new cache configuration with URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Set the key prefix for all cache keys
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Generate a cache key with prefix
    pub fn make_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }
}

/// Revocation store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store (single instance, tests)
    Memory,
    /// Shared Redis store (multiple instances)
    Redis,
}

/// Revocation store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RevocationConfig {
    /// Backing store
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,

    /// Whether the background purge task runs
    #[serde(default = "default_purge_enabled")]
    pub purge_enabled: bool,

    /// How often expired entries are purged, in seconds
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

impl Default for RevocationConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            purge_enabled: default_purge_enabled(),
            purge_interval_secs: default_purge_interval(),
        }
    }
}

impl RevocationConfig {
    /// Create from environment variables (`SG_STORE_BACKEND`, `SG_PURGE_INTERVAL_SECS`)
    pub fn from_env() -> Self {
        let backend = match std::env::var("SG_STORE_BACKEND").as_deref() {
            Ok("memory") => StoreBackend::Memory,
            Ok("redis") => StoreBackend::Redis,
            _ => default_backend(),
        };

        Self {
            backend,
            purge_enabled: env_parse("SG_PURGE_ENABLED", default_purge_enabled()),
            purge_interval_secs: env_parse("SG_PURGE_INTERVAL_SECS", default_purge_interval()),
        }
    }
}

fn default_url() -> String {
    String::from("redis://localhost:6379")
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    50
}

fn default_key_prefix() -> String {
    String::from("sg")
}

fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_purge_enabled() -> bool {
    true
}

fn default_purge_interval() -> u64 {
    300 // 5 minutes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_cache_key_prefix() {
        let config = CacheConfig::new("redis://cache:6379").with_prefix("auth");
        assert_eq!(config.make_key("revoked:abc"), "auth:revoked:abc");

        let bare = CacheConfig::default().with_prefix("");
        assert_eq!(bare.make_key("revoked:abc"), "revoked:abc");
    }

    #[test]
    fn test_store_backend_serde() {
        let backend: StoreBackend = serde_json::from_str("\"redis\"").unwrap();
        assert_eq!(backend, StoreBackend::Redis);
    }
}
