//! Revocation store contract.

use async_trait::async_trait;

use crate::domain::entities::revocation::{
    FamilyRevocation, FamilySession, RecordOutcome, RevocationEntry,
};
use crate::errors::StoreError;

/// Key-value store of spent and revoked refresh token ids
///
/// Entries are keyed by token id, with a secondary index by family id. Implementations
/// must make [`record`](RevocationStore::record) a conditional write: the first record
/// for a token id wins and every later record reports
/// [`RecordOutcome::AlreadyRecorded`] without modifying the stored entry. Rotation
/// relies on this as its only serialization point.
///
/// Entries and tombstones may be evicted once their `expires_at` has passed.
#[async_trait]
pub trait RevocationStore: Send + Sync + 'static {
    /// Record a token id, write-once
    ///
    /// # Returns
    /// * `Ok(RecordOutcome::Recorded)` - This call created the entry
    /// * `Ok(RecordOutcome::AlreadyRecorded)` - The token id was already present
    /// * `Err(StoreError)` - The backend could not be reached
    async fn record(&self, entry: RevocationEntry) -> Result<RecordOutcome, StoreError>;

    /// Whether a live entry exists for the token id
    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError>;

    /// Write a family tombstone
    ///
    /// Idempotent: revoking an already revoked family keeps the first tombstone and
    /// returns `Ok(())`.
    async fn revoke_family(&self, revocation: FamilyRevocation) -> Result<(), StoreError>;

    /// Whether a live tombstone exists for the family
    async fn is_family_revoked(&self, family_id: &str) -> Result<bool, StoreError>;

    /// Index a new family under its subject
    async fn track_family(&self, session: FamilySession) -> Result<(), StoreError>;

    /// Families indexed under a subject, oldest first
    ///
    /// May include expired or revoked families that have not been purged yet.
    async fn families_for_subject(&self, subject: &str) -> Result<Vec<FamilySession>, StoreError>;

    /// Evict everything past its expiry
    ///
    /// # Returns
    /// Number of entries, tombstones and session index records removed
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}
