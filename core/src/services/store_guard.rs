//! Timeout and detachment rules for revocation store calls
//!
//! Reads are bounded by a timeout and simply abandoned when it elapses. Writes are
//! spawned as their own tasks before the caller waits on them, so a dropped caller
//! future or an elapsed timeout never cancels a write once it has been issued.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::error;

use crate::domain::entities::revocation::{
    FamilyRevocation, FamilySession, RecordOutcome, RevocationEntry,
};
use crate::errors::StoreError;
use crate::repositories::RevocationStore;

/// Revocation store wrapped with call timeouts
pub struct GuardedStore<S: RevocationStore> {
    store: Arc<S>,
    default_timeout: Duration,
}

impl<S: RevocationStore> Clone for GuardedStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            default_timeout: self.default_timeout,
        }
    }
}

impl<S: RevocationStore> GuardedStore<S> {
    pub fn new(store: Arc<S>, default_timeout: Duration) -> Self {
        Self {
            store,
            default_timeout,
        }
    }

    pub fn inner(&self) -> &Arc<S> {
        &self.store
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub async fn is_revoked(&self, token_id: &str, timeout: Duration) -> Result<bool, StoreError> {
        read_with_timeout(timeout, self.store.is_revoked(token_id)).await
    }

    pub async fn is_family_revoked(
        &self,
        family_id: &str,
        timeout: Duration,
    ) -> Result<bool, StoreError> {
        read_with_timeout(timeout, self.store.is_family_revoked(family_id)).await
    }

    pub async fn families_for_subject(
        &self,
        subject: &str,
        timeout: Duration,
    ) -> Result<Vec<FamilySession>, StoreError> {
        read_with_timeout(timeout, self.store.families_for_subject(subject)).await
    }

    pub async fn record(
        &self,
        entry: RevocationEntry,
        timeout: Duration,
    ) -> Result<RecordOutcome, StoreError> {
        detached_write(self.store.clone(), timeout, move |store| async move {
            store.record(entry).await
        })
        .await
    }

    pub async fn revoke_family(
        &self,
        revocation: FamilyRevocation,
        timeout: Duration,
    ) -> Result<(), StoreError> {
        detached_write(self.store.clone(), timeout, move |store| async move {
            store.revoke_family(revocation).await
        })
        .await
    }

    pub async fn track_family(
        &self,
        session: FamilySession,
        timeout: Duration,
    ) -> Result<(), StoreError> {
        detached_write(self.store.clone(), timeout, move |store| async move {
            store.track_family(session).await
        })
        .await
    }
}

/// Await a store read, failing with `StoreError::Timeout` when it takes too long
pub async fn read_with_timeout<T, F>(timeout: Duration, read: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, read).await {
        Ok(result) => result,
        Err(_) => Err(timeout_error(timeout)),
    }
}

/// Spawn a store write and wait for it up to `timeout`
///
/// On timeout the write keeps running in the background; the caller sees
/// `StoreError::Timeout` and must treat the outcome as unknown.
pub async fn detached_write<S, T, F, Fut>(
    store: Arc<S>,
    timeout: Duration,
    write: F,
) -> Result<T, StoreError>
where
    S: RevocationStore,
    T: Send + 'static,
    F: FnOnce(Arc<S>) -> Fut,
    Fut: Future<Output = Result<T, StoreError>> + Send + 'static,
{
    let handle = tokio::spawn(write(store));
    match tokio::time::timeout(timeout, handle).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => {
            error!(error = %join_error, "Revocation store write task failed");
            Err(StoreError::Unavailable {
                message: format!("write task failed: {}", join_error),
            })
        }
        Err(_) => Err(timeout_error(timeout)),
    }
}

fn timeout_error(timeout: Duration) -> StoreError {
    StoreError::Timeout {
        millis: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}
