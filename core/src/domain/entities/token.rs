//! Token claim sets and minted token values.

use std::collections::BTreeSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::attributes::TokenAttributes;
use super::principal::Principal;
use crate::errors::TokenError;

/// Access token expiration time (15 minutes)
pub const ACCESS_TOKEN_EXPIRY_MINUTES: i64 = 15;

/// Refresh token idle expiration time (7 days)
pub const REFRESH_TOKEN_EXPIRY_DAYS: i64 = 7;

/// Absolute session cap (30 days)
pub const ABSOLUTE_SESSION_DAYS: i64 = 30;

/// JWT issuer
pub const JWT_ISSUER: &str = "sessionguard";

/// JWT audience
pub const JWT_AUDIENCE: &str = "sessionguard-api";

/// Discriminates access from refresh claim sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Client kind a session was opened from; selects the token policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    #[default]
    Browser,
    TrustedDevice,
}

impl std::fmt::Display for ClientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientKind::Browser => write!(f, "browser"),
            ClientKind::TrustedDevice => write!(f, "trusted_device"),
        }
    }
}

/// Behaviour shared by the closed claim sets
pub trait TokenClaims: Serialize + DeserializeOwned + Send + Sync {
    /// Kind this claim set must carry in `typ`
    const KIND: TokenKind;

    fn kind(&self) -> TokenKind;
    fn token_id(&self) -> &str;
    fn expires_at(&self) -> i64;

    /// Structural checks run after signature verification
    fn check_structure(&self) -> Result<(), TokenError> {
        if self.kind() != Self::KIND {
            return Err(TokenError::Malformed);
        }
        Ok(())
    }
}

/// Access token claims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccessClaims {
    pub typ: TokenKind,

    /// Subject
    pub sub: String,

    pub roles: BTreeSet<String>,

    /// Session binding id
    pub sid: String,

    /// Refresh family this access token was minted under
    pub fid: String,

    /// Issued at timestamp
    pub iat: i64,

    /// Expiration timestamp
    pub exp: i64,

    /// JWT ID
    pub jti: String,

    pub iss: String,
    pub aud: String,

    #[serde(default, skip_serializing_if = "TokenAttributes::is_empty")]
    pub attrs: TokenAttributes,
}

impl AccessClaims {
    /// Principal reconstructed from verified claims
    pub fn principal(&self) -> Principal {
        Principal::new(self.sub.clone(), self.roles.iter().cloned(), self.sid.clone())
            .with_attributes(self.attrs.clone())
    }
}

impl TokenClaims for AccessClaims {
    const KIND: TokenKind = TokenKind::Access;

    fn kind(&self) -> TokenKind {
        self.typ
    }

    fn token_id(&self) -> &str {
        &self.jti
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }

    fn check_structure(&self) -> Result<(), TokenError> {
        if self.typ != Self::KIND || self.exp <= self.iat {
            return Err(TokenError::Malformed);
        }
        self.attrs.validate(None).map_err(|_| TokenError::Malformed)
    }
}

/// Refresh token claims
///
/// Carries roles and attributes so a rotation can mint the next access token
/// without consulting the principal source again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshClaims {
    pub typ: TokenKind,
    pub sub: String,
    pub roles: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "TokenAttributes::is_empty")]
    pub attrs: TokenAttributes,

    pub sid: String,

    /// Family id, stable across rotations
    pub fid: String,

    /// Generation within the family, starts at 0
    pub gen: u64,

    pub iat: i64,
    pub exp: i64,

    /// Absolute session expiry, fixed at login
    pub sexp: i64,

    pub jti: String,
    pub iss: String,
    pub aud: String,
    pub client: ClientKind,
}

impl RefreshClaims {
    pub fn principal(&self) -> Principal {
        Principal::new(self.sub.clone(), self.roles.iter().cloned(), self.sid.clone())
            .with_attributes(self.attrs.clone())
    }

    pub fn session_expires_at(&self) -> DateTime<Utc> {
        timestamp(self.sexp)
    }
}

impl TokenClaims for RefreshClaims {
    const KIND: TokenKind = TokenKind::Refresh;

    fn kind(&self) -> TokenKind {
        self.typ
    }

    fn token_id(&self) -> &str {
        &self.jti
    }

    fn expires_at(&self) -> i64 {
        self.exp
    }

    fn check_structure(&self) -> Result<(), TokenError> {
        if self.typ != Self::KIND || self.exp <= self.iat || self.exp > self.sexp {
            return Err(TokenError::Malformed);
        }
        self.attrs.validate(None).map_err(|_| TokenError::Malformed)
    }
}

/// Signed access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub claims: AccessClaims,
}

impl AccessToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp(self.claims.exp)
    }
}

/// Signed refresh token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshToken {
    pub token: String,
    pub claims: RefreshClaims,
}

impl RefreshToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        timestamp(self.claims.exp)
    }

    pub fn family_id(&self) -> &str {
        &self.claims.fid
    }

    pub fn generation(&self) -> u64 {
        self.claims.gen
    }
}

/// Token pair returned to the client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// JWT access token
    pub access_token: String,

    /// JWT refresh token
    pub refresh_token: String,

    /// Access token lifetime in seconds
    pub access_expires_in: i64,

    /// Refresh token lifetime in seconds
    pub refresh_expires_in: i64,

    pub family_id: String,
    pub generation: u64,
}

impl TokenPair {
    /// Builds the client-facing pair from freshly minted tokens
    pub fn from_tokens(access: &AccessToken, refresh: &RefreshToken) -> Self {
        Self {
            access_token: access.token.clone(),
            refresh_token: refresh.token.clone(),
            access_expires_in: access.claims.exp - access.claims.iat,
            refresh_expires_in: refresh.claims.exp - refresh.claims.iat,
            family_id: refresh.claims.fid.clone(),
            generation: refresh.claims.gen,
        }
    }
}

pub(crate) fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
