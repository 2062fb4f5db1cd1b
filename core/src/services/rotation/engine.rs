//! Refresh token rotation
//!
//! Per family the lifecycle is `ACTIVE(g) -> ROTATING -> ACTIVE(g+1)`, or `REVOKED`
//! which is terminal. The only serialization point is the store's write-once
//! record of the presented token id: whoever records it first rotates, everyone
//! else is treated as a replay and poisons the family.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::domain::entities::revocation::{
    FamilyRevocation, RecordOutcome, RevocationEntry, RevocationReason,
};
use crate::domain::entities::token::{timestamp, RefreshClaims, TokenPair};
use crate::domain::events::{AuthEvent, AuthEventType};
use crate::errors::TokenError;
use crate::repositories::RevocationStore;
use crate::services::audit::AuthEventSink;
use crate::services::store_guard::GuardedStore;
use crate::services::token::{TokenFactory, TokenPolicies};

/// Verifies, spends and replaces refresh tokens
pub struct RotationEngine<S: RevocationStore> {
    factory: Arc<TokenFactory>,
    store: GuardedStore<S>,
    policies: Arc<TokenPolicies>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn AuthEventSink>,
}

impl<S: RevocationStore> RotationEngine<S> {
    pub fn new(
        factory: Arc<TokenFactory>,
        store: GuardedStore<S>,
        policies: Arc<TokenPolicies>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn AuthEventSink>,
    ) -> Self {
        Self {
            factory,
            store,
            policies,
            clock,
            events,
        }
    }

    /// Rotate a refresh token using the store's default timeout
    pub async fn rotate(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        self.rotate_with_timeout(refresh_token, self.store.default_timeout())
            .await
    }

    /// Rotate a refresh token
    ///
    /// # Returns
    /// * `Ok(TokenPair)` - Generation `g+1` of the same family plus a new access token
    /// * `Err(TokenError::InvalidToken)` - Bad signature, expired, malformed or replayed
    /// * `Err(TokenError::StoreUnavailable)` - Store failed or timed out; retryable
    /// * `Err(TokenError::RotationFailed)` - Minting failed after the token was spent;
    ///   the family is revoked
    pub async fn rotate_with_timeout(
        &self,
        refresh_token: &str,
        timeout: Duration,
    ) -> Result<TokenPair, TokenError> {
        self.rotate_inner(refresh_token, timeout)
            .await
            .map_err(TokenError::into_refresh_rejection)
    }

    async fn rotate_inner(
        &self,
        refresh_token: &str,
        timeout: Duration,
    ) -> Result<TokenPair, TokenError> {
        let claims = self
            .factory
            .signer()
            .verify_refresh(refresh_token)
            .map_err(|e| {
                debug!(error = %e, "Refresh token rejected");
                e
            })?;

        if self.store.is_family_revoked(&claims.fid, timeout).await?
            || self.store.is_revoked(&claims.jti, timeout).await?
        {
            return Err(self.poison(&claims, timeout).await);
        }

        let entry = RevocationEntry::new(
            claims.jti.clone(),
            claims.fid.clone(),
            RevocationReason::Rotated,
            self.clock.now(),
            timestamp(claims.exp),
        );
        match self.store.record(entry, timeout).await? {
            RecordOutcome::Recorded => {}
            RecordOutcome::AlreadyRecorded => {
                // Lost the race to a concurrent rotation of the same generation
                return Err(self.poison(&claims, timeout).await);
            }
        }

        let policy = self.policies.for_client(claims.client);
        let (access, refresh) = match self.factory.next_generation(&claims, policy) {
            Ok(pair) => pair,
            Err(e) => {
                error!(
                    family_id = %claims.fid,
                    generation = claims.gen,
                    error = %e,
                    "Minting failed after refresh token was spent"
                );
                if let Err(store_error) = self
                    .store
                    .revoke_family(self.tombstone(&claims), timeout)
                    .await
                {
                    error!(
                        family_id = %claims.fid,
                        error = %store_error,
                        "Failed to revoke family after rotation failure"
                    );
                }
                return Err(TokenError::RotationFailed);
            }
        };

        debug!(
            subject = %claims.sub,
            family_id = %claims.fid,
            generation = refresh.claims.gen,
            "Refresh token rotated"
        );
        self.events.emit(
            &AuthEvent::new(
                AuthEventType::Rotate,
                claims.sub.clone(),
                claims.fid.clone(),
                self.clock.now(),
            )
            .with_generation(refresh.claims.gen),
        );

        Ok(TokenPair::from_tokens(&access, &refresh))
    }

    /// Revoke the family of a replayed token
    ///
    /// Returns `ReuseDetected` once the tombstone is written, or the store error
    /// when it could not be.
    async fn poison(&self, claims: &RefreshClaims, timeout: Duration) -> TokenError {
        warn!(
            subject = %claims.sub,
            family_id = %claims.fid,
            generation = claims.gen,
            "Refresh token reuse detected, revoking family"
        );
        self.events.emit(
            &AuthEvent::new(
                AuthEventType::ReuseDetected,
                claims.sub.clone(),
                claims.fid.clone(),
                self.clock.now(),
            )
            .with_generation(claims.gen),
        );

        match self.store.revoke_family(self.tombstone(claims), timeout).await {
            Ok(()) => TokenError::ReuseDetected,
            Err(e) => {
                error!(family_id = %claims.fid, error = %e, "Failed to revoke family");
                e.into()
            }
        }
    }

    fn tombstone(&self, claims: &RefreshClaims) -> FamilyRevocation {
        FamilyRevocation {
            family_id: claims.fid.clone(),
            reason: RevocationReason::Revoked,
            revoked_at: self.clock.now(),
            expires_at: claims.session_expires_at(),
        }
    }
}
