//! Configuration module with sub-modules per concern
//!
//! - `auth` - Signing keys, token lifetimes and per-client policies
//! - `cache` - Redis connection and revocation store configuration
//! - `environment` - Environment detection and logging configuration

pub mod auth;
pub mod cache;
pub mod environment;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use auth::{AuthConfig, ClientPolicyConfig, JwtConfig, KeyConfig, SessionConfig};
pub use cache::{CacheConfig, RevocationConfig, StoreBackend};
pub use environment::{Environment, LogFormat, LoggingConfig};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,

    /// Redis connection configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Revocation store configuration
    #[serde(default)]
    pub revocation: RevocationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            revocation: RevocationConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            revocation: RevocationConfig {
                backend: StoreBackend::Memory,
                ..Default::default()
            },
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            auth: AuthConfig::from_env(),
            cache: CacheConfig::from_env(),
            revocation: RevocationConfig {
                backend: StoreBackend::Redis,
                ..RevocationConfig::from_env()
            },
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Load configuration from environment
    pub fn from_env() -> Self {
        let env = Environment::from_env();
        match env {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
            Environment::Staging => {
                let mut config = Self::production();
                config.environment = Environment::Staging;
                config.logging = LoggingConfig::for_environment(Environment::Staging);
                config
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_development_uses_memory_store() {
        let config = AppConfig::development();
        assert_eq!(config.revocation.backend, StoreBackend::Memory);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"environment":"staging"}"#).unwrap();
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.auth.session.access_ttl_secs, 900);
        assert_eq!(config.revocation.purge_interval_secs, 300);
    }
}
