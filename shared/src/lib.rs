//! Shared configuration types for SessionGuard
//!
//! This crate provides the configuration surface consumed by the token core and
//! the infrastructure layer:
//! - Signing key and token policy configuration
//! - Revocation store backend and purge scheduling
//! - Environment detection and logging configuration

pub mod config;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CacheConfig, ClientPolicyConfig, Environment, JwtConfig,
    KeyConfig, LogFormat, LoggingConfig, RevocationConfig, SessionConfig, StoreBackend,
};
