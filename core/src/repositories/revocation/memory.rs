//! In-memory revocation store backed by `DashMap`
//!
//! The entry API of `DashMap` holds the shard lock for the duration of the
//! check-and-insert, which makes `record` a conditional write without any
//! process-wide lock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::domain::entities::revocation::{
    FamilyRevocation, FamilySession, RecordOutcome, RevocationEntry,
};
use crate::errors::StoreError;

use super::traits::RevocationStore;

/// Process-local revocation store
///
/// Suitable for single-instance deployments and tests. State is lost on restart.
#[derive(Debug)]
pub struct InMemoryRevocationStore {
    entries: DashMap<String, RevocationEntry>,
    /// Secondary index: family id -> recorded token ids
    family_tokens: DashMap<String, HashSet<String>>,
    tombstones: DashMap<String, FamilyRevocation>,
    /// Subject -> family id -> session
    sessions: DashMap<String, HashMap<String, FamilySession>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            family_tokens: DashMap::new(),
            tombstones: DashMap::new(),
            sessions: DashMap::new(),
            clock,
        }
    }

    /// Number of stored token entries, live or not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recorded token ids of a family
    pub fn tokens_in_family(&self, family_id: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .family_tokens
            .get(family_id)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Stored entry for a token id, regardless of expiry
    pub fn entry(&self, token_id: &str) -> Option<RevocationEntry> {
        self.entries.get(token_id).map(|entry| entry.value().clone())
    }
}

impl Default for InMemoryRevocationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn record(&self, entry: RevocationEntry) -> Result<RecordOutcome, StoreError> {
        let family_id = entry.family_id.clone();
        let token_id = entry.token_id.clone();

        let outcome = match self.entries.entry(token_id.clone()) {
            Entry::Occupied(_) => RecordOutcome::AlreadyRecorded,
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
                RecordOutcome::Recorded
            }
        };

        if outcome.was_recorded() {
            self.family_tokens
                .entry(family_id)
                .or_default()
                .insert(token_id);
        }
        Ok(outcome)
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        let expired = match self.entries.get(token_id) {
            None => return Ok(false),
            Some(entry) => entry.is_expired(now),
        };

        if expired {
            self.entries
                .remove_if(token_id, |_, entry| entry.is_expired(now));
            return Ok(false);
        }
        Ok(true)
    }

    async fn revoke_family(&self, revocation: FamilyRevocation) -> Result<(), StoreError> {
        let family_id = revocation.family_id.clone();
        match self.tombstones.entry(family_id.clone()) {
            Entry::Occupied(_) => {
                debug!(family_id = %family_id, "Family already revoked");
            }
            Entry::Vacant(vacant) => {
                vacant.insert(revocation);
            }
        }
        Ok(())
    }

    async fn is_family_revoked(&self, family_id: &str) -> Result<bool, StoreError> {
        let now = self.clock.now();
        Ok(self
            .tombstones
            .get(family_id)
            .map(|tombstone| !tombstone.is_expired(now))
            .unwrap_or(false))
    }

    async fn track_family(&self, session: FamilySession) -> Result<(), StoreError> {
        self.sessions
            .entry(session.subject.clone())
            .or_default()
            .insert(session.family_id.clone(), session);
        Ok(())
    }

    async fn families_for_subject(&self, subject: &str) -> Result<Vec<FamilySession>, StoreError> {
        let mut families: Vec<FamilySession> = self
            .sessions
            .get(subject)
            .map(|sessions| sessions.values().cloned().collect())
            .unwrap_or_default();
        families.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(families)
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut removed = 0;

        let mut purged_tokens: Vec<(String, String)> = Vec::new();
        self.entries.retain(|token_id, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                purged_tokens.push((entry.family_id.clone(), token_id.clone()));
            }
            keep
        });
        removed += purged_tokens.len();

        for (family_id, token_id) in purged_tokens {
            if let Some(mut ids) = self.family_tokens.get_mut(&family_id) {
                ids.remove(&token_id);
            }
            self.family_tokens
                .remove_if(&family_id, |_, ids| ids.is_empty());
        }

        self.tombstones.retain(|_, tombstone| {
            let keep = !tombstone.is_expired(now);
            if !keep {
                removed += 1;
            }
            keep
        });

        self.sessions.retain(|_, sessions| {
            let before = sessions.len();
            sessions.retain(|_, session| !session.is_expired(now));
            removed += before - sessions.len();
            !sessions.is_empty()
        });

        Ok(removed)
    }
}
