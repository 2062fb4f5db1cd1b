//! Revocation store backend selection

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use sg_core::clock::Clock;
use sg_core::domain::entities::{
    FamilyRevocation, FamilySession, RecordOutcome, RevocationEntry,
};
use sg_core::errors::StoreError;
use sg_core::repositories::{InMemoryRevocationStore, RevocationStore};
use sg_shared::config::{CacheConfig, RevocationConfig, StoreBackend};

#[cfg(feature = "redis-cache")]
use crate::cache::{RedisClient, RedisRevocationStore};
use crate::InfrastructureError;

/// Revocation store chosen at startup from [`RevocationConfig::backend`]
pub enum AnyRevocationStore {
    Memory(InMemoryRevocationStore),
    #[cfg(feature = "redis-cache")]
    Redis(RedisRevocationStore),
}

impl AnyRevocationStore {
    /// Open the configured backend
    ///
    /// The in-memory store judges expiry by `clock`; Redis relies on server time.
    /// Fails when Redis is selected but unreachable, or when the crate was
    /// built without the `redis-cache` feature.
    pub async fn connect(
        revocation: &RevocationConfig,
        cache: &CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, InfrastructureError> {
        match revocation.backend {
            StoreBackend::Memory => {
                info!("Using in-memory revocation store");
                Ok(Self::Memory(InMemoryRevocationStore::with_clock(clock)))
            }
            #[cfg(feature = "redis-cache")]
            StoreBackend::Redis => {
                let _ = clock;
                let client = RedisClient::new(cache.clone()).await?;
                info!("Using Redis revocation store");
                Ok(Self::Redis(RedisRevocationStore::new(client)))
            }
            #[cfg(not(feature = "redis-cache"))]
            StoreBackend::Redis => {
                let _ = (cache, clock);
                Err(InfrastructureError::Config(
                    "Redis backend requested but the redis-cache feature is disabled".to_string(),
                ))
            }
        }
    }

    pub fn backend(&self) -> StoreBackend {
        match self {
            Self::Memory(_) => StoreBackend::Memory,
            #[cfg(feature = "redis-cache")]
            Self::Redis(_) => StoreBackend::Redis,
        }
    }
}

#[async_trait]
impl RevocationStore for AnyRevocationStore {
    async fn record(&self, entry: RevocationEntry) -> Result<RecordOutcome, StoreError> {
        match self {
            Self::Memory(store) => store.record(entry).await,
            #[cfg(feature = "redis-cache")]
            Self::Redis(store) => store.record(entry).await,
        }
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError> {
        match self {
            Self::Memory(store) => store.is_revoked(token_id).await,
            #[cfg(feature = "redis-cache")]
            Self::Redis(store) => store.is_revoked(token_id).await,
        }
    }

    async fn revoke_family(&self, revocation: FamilyRevocation) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.revoke_family(revocation).await,
            #[cfg(feature = "redis-cache")]
            Self::Redis(store) => store.revoke_family(revocation).await,
        }
    }

    async fn is_family_revoked(&self, family_id: &str) -> Result<bool, StoreError> {
        match self {
            Self::Memory(store) => store.is_family_revoked(family_id).await,
            #[cfg(feature = "redis-cache")]
            Self::Redis(store) => store.is_family_revoked(family_id).await,
        }
    }

    async fn track_family(&self, session: FamilySession) -> Result<(), StoreError> {
        match self {
            Self::Memory(store) => store.track_family(session).await,
            #[cfg(feature = "redis-cache")]
            Self::Redis(store) => store.track_family(session).await,
        }
    }

    async fn families_for_subject(&self, subject: &str) -> Result<Vec<FamilySession>, StoreError> {
        match self {
            Self::Memory(store) => store.families_for_subject(subject).await,
            #[cfg(feature = "redis-cache")]
            Self::Redis(store) => store.families_for_subject(subject).await,
        }
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        match self {
            Self::Memory(store) => store.purge_expired().await,
            #[cfg(feature = "redis-cache")]
            Self::Redis(store) => store.purge_expired().await,
        }
    }
}
