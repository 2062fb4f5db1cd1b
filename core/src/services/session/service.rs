//! Authentication session service

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use sg_shared::config::AuthConfig;

use crate::clock::Clock;
use crate::domain::entities::principal::Principal;
use crate::domain::entities::revocation::{
    FamilyRevocation, FamilySession, RevocationEntry, RevocationReason,
};
use crate::domain::entities::token::{timestamp, ClientKind, TokenPair};
use crate::domain::events::{AuthEvent, AuthEventType};
use crate::errors::{DomainResult, TokenError};
use crate::repositories::RevocationStore;
use crate::services::audit::AuthEventSink;
use crate::services::rotation::RotationEngine;
use crate::services::store_guard::GuardedStore;
use crate::services::token::{Signer, TokenFactory, TokenPolicies, TokenSigner};

/// Live session of a subject, as listed by [`AuthSessionService::active_sessions`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub family_id: String,
    pub session_binding_id: String,
    pub client: ClientKind,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<FamilySession> for SessionInfo {
    fn from(session: FamilySession) -> Self {
        Self {
            family_id: session.family_id,
            session_binding_id: session.session_binding_id,
            client: session.client,
            created_at: session.created_at,
            expires_at: session.expires_at,
        }
    }
}

/// Façade over the signer, factory, rotation engine and revocation store
///
/// `authenticate` touches only the signer and never blocks. Every other
/// operation goes through the store with a timeout and fails closed.
pub struct AuthSessionService<S: RevocationStore> {
    signer: Arc<dyn TokenSigner>,
    factory: Arc<TokenFactory>,
    engine: RotationEngine<S>,
    store: GuardedStore<S>,
    policies: Arc<TokenPolicies>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn AuthEventSink>,
}

impl<S: RevocationStore> AuthSessionService<S> {
    /// Creates a new session service
    ///
    /// # Arguments
    ///
    /// * `signer` - Signs and verifies every token
    /// * `store` - Revocation store shared with the purge task
    /// * `policies` - Token lifetimes per client kind
    /// * `store_timeout` - Default timeout for store calls
    /// * `clock` - The single time source for issuance and expiry
    /// * `events` - Receives login, rotate, reuse and logout events
    pub fn new(
        signer: Arc<dyn TokenSigner>,
        store: Arc<S>,
        policies: TokenPolicies,
        store_timeout: Duration,
        clock: Arc<dyn Clock>,
        events: Arc<dyn AuthEventSink>,
    ) -> Self {
        let factory = Arc::new(TokenFactory::new(signer.clone(), clock.clone()));
        let store = GuardedStore::new(store, store_timeout);
        let policies = Arc::new(policies);
        let engine = RotationEngine::new(
            factory.clone(),
            store.clone(),
            policies.clone(),
            clock.clone(),
            events.clone(),
        );

        Self {
            signer,
            factory,
            engine,
            store,
            policies,
            clock,
            events,
        }
    }

    /// Build the service from configuration, loading keys from disk
    pub fn from_config(
        config: &AuthConfig,
        store: Arc<S>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn AuthEventSink>,
    ) -> DomainResult<Self> {
        if config.jwt.is_using_development_secret() {
            warn!("Signing with the development secret; configure real keys for production");
        }

        let signer = Arc::new(Signer::from_config(&config.jwt, clock.clone())?);
        Ok(Self::new(
            signer,
            store,
            TokenPolicies::from_config(&config.session),
            Duration::from_millis(config.session.store_timeout_ms),
            clock,
            events,
        ))
    }

    pub fn store(&self) -> &Arc<S> {
        self.store.inner()
    }

    pub fn signer(&self) -> &Arc<dyn TokenSigner> {
        &self.signer
    }

    /// Open a browser session for a verified principal
    pub async fn login(&self, principal: &Principal) -> Result<TokenPair, TokenError> {
        self.login_with_client(principal, ClientKind::Browser).await
    }

    /// Open a session under the policy of the given client kind
    ///
    /// The new family is indexed under the subject before any token is returned;
    /// if the index write fails no tokens are handed out.
    pub async fn login_with_client(
        &self,
        principal: &Principal,
        client: ClientKind,
    ) -> Result<TokenPair, TokenError> {
        let policy = self.policies.for_client(client);
        let (access, refresh) = self.factory.start_session(principal, client, policy)?;

        let session = FamilySession {
            subject: principal.subject().to_string(),
            family_id: refresh.claims.fid.clone(),
            session_binding_id: principal.session_binding_id().to_string(),
            client,
            created_at: self.clock.now(),
            expires_at: refresh.claims.session_expires_at(),
        };
        self.store
            .track_family(session, self.store.default_timeout())
            .await?;

        info!(
            subject = %principal.subject(),
            family_id = %refresh.claims.fid,
            client = %client,
            "Login succeeded"
        );
        self.events.emit(
            &AuthEvent::new(
                AuthEventType::Login,
                principal.subject(),
                refresh.claims.fid.clone(),
                self.clock.now(),
            )
            .with_generation(0),
        );

        Ok(TokenPair::from_tokens(&access, &refresh))
    }

    /// Verify an access token and return its principal
    ///
    /// Stateless: signature, issuer, audience, structure and expiry only.
    pub fn authenticate(&self, access_token: &str) -> Result<Principal, TokenError> {
        let claims = self.signer.verify_access(access_token)?;
        Ok(claims.principal())
    }

    /// Like [`authenticate`](Self::authenticate), but also rejects tokens whose
    /// family has been revoked
    pub async fn authenticate_strict(&self, access_token: &str) -> Result<Principal, TokenError> {
        let claims = self.signer.verify_access(access_token)?;
        if self
            .store
            .is_family_revoked(&claims.fid, self.store.default_timeout())
            .await?
        {
            debug!(family_id = %claims.fid, "Access token from revoked family");
            return Err(TokenError::InvalidToken);
        }
        Ok(claims.principal())
    }

    /// Rotate a refresh token into a new pair
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, TokenError> {
        self.engine.rotate(refresh_token).await
    }

    pub async fn refresh_with_timeout(
        &self,
        refresh_token: &str,
        timeout: Duration,
    ) -> Result<TokenPair, TokenError> {
        self.engine.rotate_with_timeout(refresh_token, timeout).await
    }

    /// Revoke the family of a refresh token
    pub async fn logout(&self, refresh_token: &str) -> Result<(), TokenError> {
        self.logout_with_timeout(refresh_token, self.store.default_timeout())
            .await
    }

    /// Revoke the family of a refresh token
    ///
    /// Idempotent for a valid token. Invalid or expired tokens are rejected with
    /// `InvalidToken`.
    pub async fn logout_with_timeout(
        &self,
        refresh_token: &str,
        timeout: Duration,
    ) -> Result<(), TokenError> {
        let claims = self
            .signer
            .verify_refresh(refresh_token)
            .map_err(TokenError::into_refresh_rejection)?;

        let now = self.clock.now();
        self.store
            .revoke_family(
                FamilyRevocation {
                    family_id: claims.fid.clone(),
                    reason: RevocationReason::Logout,
                    revoked_at: now,
                    expires_at: claims.session_expires_at(),
                },
                timeout,
            )
            .await?;

        // The family tombstone already rejects the token; this records its id for audits
        let entry = RevocationEntry::new(
            claims.jti.clone(),
            claims.fid.clone(),
            RevocationReason::Logout,
            now,
            timestamp(claims.exp),
        );
        self.store.record(entry, timeout).await?;

        info!(subject = %claims.sub, family_id = %claims.fid, "Logout");
        self.events.emit(&AuthEvent::new(
            AuthEventType::Logout,
            claims.sub.clone(),
            claims.fid.clone(),
            now,
        ));
        Ok(())
    }

    /// Revoke every tracked family of a subject
    ///
    /// # Returns
    /// Number of families revoked by this call
    pub async fn logout_all(&self, subject: &str) -> Result<usize, TokenError> {
        let timeout = self.store.default_timeout();
        let families = self.store.families_for_subject(subject, timeout).await?;
        let now = self.clock.now();

        let mut revoked = 0;
        for session in families {
            if session.is_expired(now)
                || self.store.is_family_revoked(&session.family_id, timeout).await?
            {
                continue;
            }

            self.store
                .revoke_family(
                    FamilyRevocation {
                        family_id: session.family_id.clone(),
                        reason: RevocationReason::Logout,
                        revoked_at: now,
                        expires_at: session.expires_at,
                    },
                    timeout,
                )
                .await?;
            revoked += 1;

            self.events.emit(&AuthEvent::new(
                AuthEventType::Logout,
                subject,
                session.family_id,
                now,
            ));
        }

        info!(subject = %subject, revoked, "Logged out of all sessions");
        Ok(revoked)
    }

    /// Tracked families of a subject that are neither expired nor revoked
    pub async fn active_sessions(&self, subject: &str) -> Result<Vec<SessionInfo>, TokenError> {
        let timeout = self.store.default_timeout();
        let families = self.store.families_for_subject(subject, timeout).await?;
        let now = self.clock.now();

        let mut active = Vec::with_capacity(families.len());
        for session in families {
            if session.is_expired(now)
                || self.store.is_family_revoked(&session.family_id, timeout).await?
            {
                continue;
            }
            active.push(SessionInfo::from(session));
        }
        Ok(active)
    }
}
