//! Compact JWS signing and verification over a rotating key ring

use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, encode, Header, Validation};
use tracing::{debug, info, warn};

use sg_shared::config::JwtConfig;

use crate::clock::Clock;
use crate::domain::entities::token::{AccessClaims, RefreshClaims, TokenClaims};
use crate::errors::TokenError;

use super::key_manager::{parse_algorithm, KeyRing, SigningKey};

/// Signing seam used by the factory, rotation engine and session service
pub trait TokenSigner: Send + Sync {
    fn issuer(&self) -> &str;
    fn audience(&self) -> &str;

    fn sign_access(&self, claims: &AccessClaims) -> Result<String, TokenError>;
    fn sign_refresh(&self, claims: &RefreshClaims) -> Result<String, TokenError>;

    /// Verify signature, issuer, audience, structure and expiry of an access token
    fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError>;

    /// Verify signature, issuer, audience, structure and expiry of a refresh token
    fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError>;
}

/// JWT signer holding the key ring for the process lifetime
///
/// Reads go through `ArcSwap`, so verification never blocks on a rollover.
pub struct Signer {
    ring: ArcSwap<KeyRing>,
    issuer: String,
    audience: String,
    rollover_grace: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("ring", &**self.ring.load())
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl Signer {
    /// Creates a signer with a single active key
    ///
    /// # Arguments
    ///
    /// * `active` - Key used for signing; must carry its private half
    /// * `issuer` - `iss` written into and required from every token
    /// * `audience` - `aud` written into and required from every token
    /// * `clock` - Time source for expiry and grace-window checks
    pub fn new(
        active: SigningKey,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, TokenError> {
        Ok(Self::from_ring(KeyRing::new(active)?, issuer, audience, clock))
    }

    pub fn from_ring(
        ring: KeyRing,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ring: ArcSwap::from_pointee(ring),
            issuer: issuer.into(),
            audience: audience.into(),
            rollover_grace: Duration::days(1),
            clock,
        }
    }

    /// How long a rolled-over key keeps verifying
    pub fn with_rollover_grace(mut self, grace: Duration) -> Self {
        self.rollover_grace = grace;
        self
    }

    /// Build the signer from configuration, loading key material from disk
    ///
    /// A configured previous key is accepted until `now + rollover_grace_secs`.
    pub fn from_config(config: &JwtConfig, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        let algorithm = parse_algorithm(&config.algorithm)?;
        let grace = Duration::seconds(config.rollover_grace_secs);

        let mut ring = KeyRing::new(SigningKey::from_config(&config.active_key, algorithm)?)?;
        if let Some(previous) = &config.previous_key {
            let now = clock.now();
            ring = ring.with_previous(
                SigningKey::from_config(previous, algorithm)?,
                now,
                now + grace,
            )?;
        }

        info!(
            algorithm = ?algorithm,
            active_key = %config.active_key.key_id,
            previous_key = ?config.previous_key.as_ref().map(|k| k.key_id.as_str()),
            "Signer initialized"
        );

        Ok(Self::from_ring(ring, config.issuer.clone(), config.audience.clone(), clock)
            .with_rollover_grace(grace))
    }

    /// Swap in a new active key
    ///
    /// The current active key stays valid for verification only until the grace
    /// window elapses. Any key retired by an earlier rollover is dropped.
    pub fn rollover(&self, next: SigningKey) -> Result<(), TokenError> {
        if !next.can_sign() {
            return Err(TokenError::KeyLoad {
                message: format!("Key '{}' has no private key", next.key_id()),
            });
        }
        if next.key_id() == self.ring.load().active().key_id() {
            return Err(TokenError::KeyLoad {
                message: format!("Key id '{}' is already active", next.key_id()),
            });
        }

        let now = self.clock.now();
        let accept_until = now + self.rollover_grace;
        let next = Arc::new(next);
        let previous = self
            .ring
            .rcu(|ring| ring.rolled_over(next.clone(), now, accept_until));

        info!(
            retired_key = %previous.active().key_id(),
            active_key = %next.key_id(),
            accept_until = %accept_until,
            "Signing key rolled over"
        );
        Ok(())
    }

    pub fn active_key_id(&self) -> String {
        self.ring.load().active().key_id().to_string()
    }

    /// Snapshot of the current key ring
    pub fn key_ring(&self) -> Arc<KeyRing> {
        self.ring.load_full()
    }

    /// Sign any closed claim set with the active key
    pub fn sign<C: TokenClaims>(&self, claims: &C) -> Result<String, TokenError> {
        let ring = self.ring.load();
        let key = ring.active();
        let encoding_key = key.encoding_key().ok_or(TokenError::SigningFailed)?;

        let mut header = Header::new(key.algorithm());
        header.kid = Some(key.key_id().to_string());

        encode(&header, claims, encoding_key).map_err(|e| {
            warn!(key_id = %key.key_id(), error = %e, "Token signing failed");
            TokenError::SigningFailed
        })
    }

    /// Verify a token and decode it into the expected claim set
    ///
    /// Check order: header, key selection, signature with issuer and audience,
    /// claim structure, then expiry against the injected clock.
    pub fn verify<C: TokenClaims>(&self, token: &str) -> Result<C, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        let key_id = header.kid.as_deref().ok_or(TokenError::Malformed)?;

        let now = self.clock.now();
        let ring = self.ring.load();
        let key = ring.verification_key(key_id, now).ok_or_else(|| {
            debug!(key_id = %key_id, "No verification key for token");
            TokenError::SignatureInvalid
        })?;

        if header.alg != key.algorithm() {
            return Err(TokenError::SignatureInvalid);
        }

        let mut validation = Validation::new(key.algorithm());
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_audience(&[self.audience.as_str()]);

        let claims = decode::<C>(token, key.decoding_key(), &validation)
            .map_err(|e| map_decode_error(e.kind()))?
            .claims;

        claims.check_structure()?;

        if now.timestamp() >= claims.expires_at() {
            return Err(TokenError::Expired);
        }
        Ok(claims)
    }
}

impl TokenSigner for Signer {
    fn issuer(&self) -> &str {
        &self.issuer
    }

    fn audience(&self) -> &str {
        &self.audience
    }

    fn sign_access(&self, claims: &AccessClaims) -> Result<String, TokenError> {
        self.sign(claims)
    }

    fn sign_refresh(&self, claims: &RefreshClaims) -> Result<String, TokenError> {
        self.sign(claims)
    }

    fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(token)
    }

    fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(token)
    }
}

fn map_decode_error(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidIssuer
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidRsaKey(_) => TokenError::SignatureInvalid,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}
