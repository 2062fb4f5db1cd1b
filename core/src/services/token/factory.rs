//! Builds and signs access and refresh claim sets

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use tracing::debug;
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::entities::principal::Principal;
use crate::domain::entities::token::{
    AccessClaims, AccessToken, ClientKind, RefreshClaims, RefreshToken, TokenKind,
};
use crate::errors::TokenError;

use super::policy::TokenPolicy;
use super::signer::TokenSigner;

/// Length of a family id in random bytes before encoding
pub const FAMILY_ID_BYTES: usize = 32;

/// Position of a refresh token within its family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionLineage {
    pub family_id: String,
    pub generation: u64,

    /// Absolute session cap as a Unix timestamp, fixed at login
    pub session_expires_at: i64,

    pub client: ClientKind,
}

impl SessionLineage {
    /// Lineage of the token that follows `claims` in its family
    pub fn next_after(claims: &RefreshClaims) -> Self {
        Self {
            family_id: claims.fid.clone(),
            generation: claims.gen + 1,
            session_expires_at: claims.sexp,
            client: claims.client,
        }
    }
}

/// Fresh family id: 256 random bits, base64url without padding
pub fn new_family_id() -> String {
    let mut bytes = [0u8; FAMILY_ID_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Mints tokens for a principal under a policy
pub struct TokenFactory {
    signer: Arc<dyn TokenSigner>,
    clock: Arc<dyn Clock>,
}

impl TokenFactory {
    pub fn new(signer: Arc<dyn TokenSigner>, clock: Arc<dyn Clock>) -> Self {
        Self { signer, clock }
    }

    pub fn signer(&self) -> &Arc<dyn TokenSigner> {
        &self.signer
    }

    /// Issue an access token bound to a family
    ///
    /// Expiry is `now + access_ttl`, never past `session_expires_at`.
    pub fn issue_access_token(
        &self,
        principal: &Principal,
        family_id: &str,
        session_expires_at: i64,
        policy: &TokenPolicy,
    ) -> Result<AccessToken, TokenError> {
        check_attributes(principal, policy)?;

        let now = self.clock.now_secs();
        let exp = (now + policy.access_ttl.num_seconds()).min(session_expires_at);

        let claims = AccessClaims {
            typ: TokenKind::Access,
            sub: principal.subject().to_string(),
            roles: principal.roles().clone(),
            sid: principal.session_binding_id().to_string(),
            fid: family_id.to_string(),
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
            iss: self.signer.issuer().to_string(),
            aud: self.signer.audience().to_string(),
            attrs: principal.attributes().clone(),
        };
        let token = self.signer.sign_access(&claims)?;
        Ok(AccessToken { token, claims })
    }

    /// Issue a refresh token at the given lineage
    ///
    /// Expiry is `min(now + refresh_ttl, session_expires_at)`.
    pub fn issue_refresh_token(
        &self,
        principal: &Principal,
        lineage: &SessionLineage,
        policy: &TokenPolicy,
    ) -> Result<RefreshToken, TokenError> {
        check_attributes(principal, policy)?;

        let now = self.clock.now_secs();
        let exp = (now + policy.refresh_ttl.num_seconds()).min(lineage.session_expires_at);
        if exp <= now {
            return Err(TokenError::Expired);
        }

        let claims = RefreshClaims {
            typ: TokenKind::Refresh,
            sub: principal.subject().to_string(),
            roles: principal.roles().clone(),
            attrs: principal.attributes().clone(),
            sid: principal.session_binding_id().to_string(),
            fid: lineage.family_id.clone(),
            gen: lineage.generation,
            iat: now,
            exp,
            sexp: lineage.session_expires_at,
            jti: Uuid::new_v4().to_string(),
            iss: self.signer.issuer().to_string(),
            aud: self.signer.audience().to_string(),
            client: lineage.client,
        };
        let token = self.signer.sign_refresh(&claims)?;
        Ok(RefreshToken { token, claims })
    }

    /// Mint generation 0 of a new family
    pub fn start_session(
        &self,
        principal: &Principal,
        client: ClientKind,
        policy: &TokenPolicy,
    ) -> Result<(AccessToken, RefreshToken), TokenError> {
        let lineage = SessionLineage {
            family_id: new_family_id(),
            generation: 0,
            session_expires_at: self.clock.now_secs() + policy.absolute_session.num_seconds(),
            client,
        };

        let refresh = self.issue_refresh_token(principal, &lineage, policy)?;
        let access = self.issue_access_token(
            principal,
            &lineage.family_id,
            lineage.session_expires_at,
            policy,
        )?;

        debug!(
            subject = %principal.subject(),
            family_id = %lineage.family_id,
            client = %client,
            "Started token family"
        );
        Ok((access, refresh))
    }

    /// Mint the successor pair of a verified refresh token
    pub fn next_generation(
        &self,
        current: &RefreshClaims,
        policy: &TokenPolicy,
    ) -> Result<(AccessToken, RefreshToken), TokenError> {
        let principal = current.principal();
        let lineage = SessionLineage::next_after(current);

        let refresh = self.issue_refresh_token(&principal, &lineage, policy)?;
        let access = self.issue_access_token(
            &principal,
            &lineage.family_id,
            lineage.session_expires_at,
            policy,
        )?;
        Ok((access, refresh))
    }
}

fn check_attributes(principal: &Principal, policy: &TokenPolicy) -> Result<(), TokenError> {
    principal
        .attributes()
        .validate(policy.allowed_attributes.as_deref())
}
