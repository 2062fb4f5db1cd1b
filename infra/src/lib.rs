//! # Infrastructure Layer
//!
//! Concrete backends and process wiring for the SessionGuard token core:
//! - **Cache**: Redis client with retry/backoff and the Redis revocation store
//! - **Store**: backend selection between the in-memory and Redis stores
//! - **Settings**: layered configuration loading (`config` + `dotenvy`)
//! - **Telemetry**: `tracing-subscriber` initialisation
//! - **Bootstrap**: builds the signer, store, session service and purge task
//!
//! ## Features
//!
//! - `redis-cache`: Enable the Redis revocation store (default)

// Re-export core types for convenience
pub use sg_core::errors::*;

/// Cache module - Redis client and revocation store
#[cfg(feature = "redis-cache")]
pub mod cache;

pub mod bootstrap;
pub mod settings;
pub mod store;
pub mod telemetry;

pub use bootstrap::{build_session_guard, SessionGuard};
pub use settings::load_settings;
pub use store::AnyRevocationStore;
pub use telemetry::init_tracing;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[cfg(feature = "redis-cache")]
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings could not be loaded or deserialized
    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    /// Value could not be (de)serialized for storage
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Tracing subscriber could not be installed
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// Error raised by the token core while wiring services
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<InfrastructureError> for StoreError {
    fn from(error: InfrastructureError) -> Self {
        match error {
            InfrastructureError::Serialization(e) => StoreError::Serialization {
                message: e.to_string(),
            },
            other => StoreError::Unavailable {
                message: other.to_string(),
            },
        }
    }
}
