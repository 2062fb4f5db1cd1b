//! Redis-backed revocation store
//!
//! Key layout, under the configured prefix:
//! - `revoked:{token_id}` - JSON revocation entry, written with `SET NX EXAT`
//! - `family:{family_id}` - JSON family tombstone, written with `SET NX EXAT`
//! - `sessions:{subject}` - hash of family id to JSON session record
//!
//! Every key carries its own absolute expiry, so Redis evicts spent entries and
//! `purge_expired` has nothing to do.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use sg_core::domain::entities::{
    FamilyRevocation, FamilySession, RecordOutcome, RevocationEntry,
};
use sg_core::errors::StoreError;
use sg_core::repositories::RevocationStore;

use super::redis_client::RedisClient;

const REVOKED_PREFIX: &str = "revoked";
const FAMILY_PREFIX: &str = "family";
const SESSIONS_PREFIX: &str = "sessions";

/// Stored value for a conditional write
///
/// `write_id` lets a retried `SET NX` recognise its own earlier write, so a
/// reply lost to a dropped connection is not mistaken for a competing writer.
#[derive(Debug, Serialize, Deserialize)]
struct Stamped<T> {
    write_id: String,
    value: T,
}

/// Revocation store shared by every instance through Redis
#[derive(Clone)]
pub struct RedisRevocationStore {
    client: RedisClient,
}

impl RedisRevocationStore {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &RedisClient {
        &self.client
    }

    fn revoked_key(&self, token_id: &str) -> String {
        self.client.key(&format!("{}:{}", REVOKED_PREFIX, token_id))
    }

    fn family_key(&self, family_id: &str) -> String {
        self.client.key(&format!("{}:{}", FAMILY_PREFIX, family_id))
    }

    fn sessions_key(&self, subject: &str) -> String {
        self.client.key(&format!("{}:{}", SESSIONS_PREFIX, subject))
    }

    /// Write-once set; `Ok(true)` when this call's value is the stored one
    async fn write_once<T>(&self, key: &str, value: T, expires_at: i64) -> Result<bool, StoreError>
    where
        T: Serialize + for<'de> Deserialize<'de>,
    {
        let write_id = Uuid::new_v4().to_string();
        let payload = serde_json::to_string(&Stamped {
            write_id: write_id.clone(),
            value,
        })
        .map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;

        // EXAT must lie in the future or Redis drops the key on arrival
        let expires_at = expires_at.max(chrono::Utc::now().timestamp() + 1);

        if self
            .client
            .set_if_absent_until(key, &payload, expires_at)
            .await?
        {
            return Ok(true);
        }

        // The key existed. It may be our own write from a retried attempt.
        let stored = match self.client.get(key).await? {
            Some(stored) => stored,
            None => return Ok(false),
        };
        match serde_json::from_str::<Stamped<T>>(&stored) {
            Ok(existing) => Ok(existing.write_id == write_id),
            Err(e) => {
                warn!(key = %key, error = %e, "Unreadable value under revocation key");
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl RevocationStore for RedisRevocationStore {
    async fn record(&self, entry: RevocationEntry) -> Result<RecordOutcome, StoreError> {
        let key = self.revoked_key(&entry.token_id);
        let expires_at = entry.expires_at.timestamp();

        if self.write_once(&key, entry, expires_at).await? {
            Ok(RecordOutcome::Recorded)
        } else {
            debug!(key = %key, "Token id already recorded");
            Ok(RecordOutcome::AlreadyRecorded)
        }
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError> {
        Ok(self.client.exists(&self.revoked_key(token_id)).await?)
    }

    async fn revoke_family(&self, revocation: FamilyRevocation) -> Result<(), StoreError> {
        let key = self.family_key(&revocation.family_id);
        let expires_at = revocation.expires_at.timestamp();

        if !self.write_once(&key, revocation, expires_at).await? {
            debug!(key = %key, "Family already revoked");
        }
        Ok(())
    }

    async fn is_family_revoked(&self, family_id: &str) -> Result<bool, StoreError> {
        Ok(self.client.exists(&self.family_key(family_id)).await?)
    }

    async fn track_family(&self, session: FamilySession) -> Result<(), StoreError> {
        let key = self.sessions_key(&session.subject);
        let payload = serde_json::to_string(&session).map_err(|e| StoreError::Serialization {
            message: e.to_string(),
        })?;

        self.client
            .hash_set_until(
                &key,
                &session.family_id,
                &payload,
                session.expires_at.timestamp(),
            )
            .await?;
        Ok(())
    }

    async fn families_for_subject(&self, subject: &str) -> Result<Vec<FamilySession>, StoreError> {
        let key = self.sessions_key(subject);
        let raw = self.client.hash_values(&key).await?;

        let now = chrono::Utc::now();
        let mut families = Vec::with_capacity(raw.len());
        let mut stale = Vec::new();
        for (family_id, payload) in raw {
            let session: FamilySession =
                serde_json::from_str(&payload).map_err(|e| StoreError::Serialization {
                    message: e.to_string(),
                })?;
            if session.is_expired(now) {
                stale.push(family_id);
            } else {
                families.push(session);
            }
        }

        // The hash outlives its oldest members; drop those lazily
        if !stale.is_empty() {
            if let Err(e) = self.client.hash_delete(&key, &stale).await {
                warn!(subject = %subject, error = %e, "Failed to prune expired sessions");
            }
        }

        families.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(families)
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}
