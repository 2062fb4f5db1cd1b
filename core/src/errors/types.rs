//! Error types for token handling and revocation storage
//!
//! `TokenError` is the taxonomy callers see. Cryptographic and expiry failures are
//! deterministic and never retried; store failures are retryable with backoff.

use thiserror::Error;

/// Token-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Structurally invalid token (encoding, JSON, unknown or missing claims, wrong kind)
    #[error("Malformed token")]
    Malformed,

    /// Signature, key id, algorithm, issuer or audience did not check out
    #[error("Token signature verification failed")]
    SignatureInvalid,

    #[error("Token expired")]
    Expired,

    /// Refresh rejection that does not reveal which check failed
    #[error("Invalid token")]
    InvalidToken,

    /// A spent or revoked refresh token was presented again
    #[error("Refresh token reuse detected")]
    ReuseDetected,

    #[error("Revocation store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    /// Minting failed after the presented token was revoked; the family is left revoked
    #[error("Token rotation failed")]
    RotationFailed,

    #[error("Token signing failed")]
    SigningFailed,

    #[error("Token attributes rejected: {reason}")]
    AttributesRejected { reason: String },

    /// Key material could not be parsed or does not fit the configured algorithm
    #[error("Key loading failed: {message}")]
    KeyLoad { message: String },
}

impl TokenError {
    /// Whether the caller may retry the same request with backoff
    pub fn is_retryable(&self) -> bool {
        matches!(self, TokenError::StoreUnavailable { .. })
    }

    /// Collapse verification failures and reuse signals into `InvalidToken`
    ///
    /// Refresh responses must not tell an attacker whether a token was expired,
    /// tampered with, or already spent.
    pub fn into_refresh_rejection(self) -> Self {
        match self {
            TokenError::Malformed
            | TokenError::SignatureInvalid
            | TokenError::Expired
            | TokenError::ReuseDetected => TokenError::InvalidToken,
            other => other,
        }
    }
}

/// Revocation store failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Store call timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Store serialization error: {message}")]
    Serialization { message: String },
}

impl From<StoreError> for TokenError {
    fn from(error: StoreError) -> Self {
        TokenError::StoreUnavailable {
            reason: error.to_string(),
        }
    }
}
