//! Revocation records owned by the revocation store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::ClientKind;

/// Why a refresh token id was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevocationReason {
    /// Spent by a successful rotation
    Rotated,
    /// Revoked as part of a poisoned family
    Revoked,
    Logout,
}

/// A recorded refresh token id
///
/// Write-once: the first record for a token id wins and later records report
/// [`RecordOutcome::AlreadyRecorded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    pub token_id: String,
    pub family_id: String,
    pub reason: RevocationReason,
    pub recorded_at: DateTime<Utc>,

    /// When the entry may be evicted; aligned with the token's own expiry
    pub expires_at: DateTime<Utc>,
}

impl RevocationEntry {
    pub fn new(
        token_id: impl Into<String>,
        family_id: impl Into<String>,
        reason: RevocationReason,
        recorded_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            token_id: token_id.into(),
            family_id: family_id.into(),
            reason,
            recorded_at,
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Family tombstone, outlives every generation of the family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyRevocation {
    pub family_id: String,
    pub reason: RevocationReason,
    pub revoked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl FamilyRevocation {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Subject-to-family index entry written at login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilySession {
    pub subject: String,
    pub family_id: String,
    pub session_binding_id: String,
    pub client: ClientKind,
    pub created_at: DateTime<Utc>,

    /// Absolute session cap
    pub expires_at: DateTime<Utc>,
}

impl FamilySession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Result of a write-once record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    AlreadyRecorded,
}

impl RecordOutcome {
    pub fn was_recorded(self) -> bool {
        matches!(self, RecordOutcome::Recorded)
    }
}
