//! Test doubles for rotation and session tests

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entities::revocation::{
    FamilyRevocation, FamilySession, RecordOutcome, RevocationEntry,
};
use crate::domain::entities::token::{AccessClaims, RefreshClaims};
use crate::errors::{StoreError, TokenError};
use crate::repositories::{InMemoryRevocationStore, RevocationStore};
use crate::services::token::{Signer, TokenSigner};

/// Signer whose signing can be switched off
pub struct FlakySigner {
    pub inner: Signer,
    pub fail_signing: AtomicBool,
}

impl FlakySigner {
    pub fn new(inner: Signer) -> Self {
        Self {
            inner,
            fail_signing: AtomicBool::new(false),
        }
    }

    pub fn break_signing(&self) {
        self.fail_signing.store(true, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), TokenError> {
        if self.fail_signing.load(Ordering::SeqCst) {
            return Err(TokenError::SigningFailed);
        }
        Ok(())
    }
}

impl TokenSigner for FlakySigner {
    fn issuer(&self) -> &str {
        self.inner.issuer()
    }

    fn audience(&self) -> &str {
        self.inner.audience()
    }

    fn sign_access(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        self.check()?;
        self.inner.sign_access(claims)
    }

    fn sign_refresh(&self, claims: &RefreshClaims) -> Result<String, TokenError> {
        self.check()?;
        self.inner.sign_refresh(claims)
    }

    fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.inner.verify_access(token)
    }

    fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.inner.verify_refresh(token)
    }
}

/// Store that can be taken offline and counts writes
#[derive(Default)]
pub struct ToggleStore {
    pub inner: InMemoryRevocationStore,
    pub offline: AtomicBool,
    pub writes: AtomicUsize,
    /// Delay applied to every write, in milliseconds
    pub write_delay_ms: AtomicU64,
}

impl ToggleStore {
    pub fn with_inner(inner: InMemoryRevocationStore) -> Self {
        Self {
            inner,
            ..Default::default()
        }
    }

    pub fn slow_writes(self, delay: Duration) -> Self {
        self.set_write_delay(delay);
        self
    }

    pub fn set_write_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.write_delay_ms.store(millis, Ordering::SeqCst);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn before_write(&self) -> Result<(), StoreError> {
        self.check()?;
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for ToggleStore {
    async fn record(&self, entry: RevocationEntry) -> Result<RecordOutcome, StoreError> {
        self.before_write().await?;
        self.inner.record(entry).await
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.is_revoked(token_id).await
    }

    async fn revoke_family(&self, revocation: FamilyRevocation) -> Result<(), StoreError> {
        self.before_write().await?;
        self.inner.revoke_family(revocation).await
    }

    async fn is_family_revoked(&self, family_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.is_family_revoked(family_id).await
    }

    async fn track_family(&self, session: FamilySession) -> Result<(), StoreError> {
        self.before_write().await?;
        self.inner.track_family(session).await
    }

    async fn families_for_subject(&self, subject: &str) -> Result<Vec<FamilySession>, StoreError> {
        self.check()?;
        self.inner.families_for_subject(subject).await
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.check()?;
        self.inner.purge_expired().await
    }
}
