//! Unit tests for the in-memory revocation store

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::clock::{Clock, ManualClock};
use crate::domain::entities::revocation::{
    FamilyRevocation, FamilySession, RecordOutcome, RevocationEntry, RevocationReason,
};
use crate::domain::entities::token::ClientKind;
use crate::repositories::revocation::{InMemoryRevocationStore, RevocationStore};

fn store_at(clock: Arc<ManualClock>) -> InMemoryRevocationStore {
    InMemoryRevocationStore::with_clock(clock)
}

fn entry(token_id: &str, family_id: &str, now: DateTime<Utc>, ttl: Duration) -> RevocationEntry {
    RevocationEntry::new(token_id, family_id, RevocationReason::Rotated, now, now + ttl)
}

fn tombstone(family_id: &str, now: DateTime<Utc>, ttl: Duration) -> FamilyRevocation {
    FamilyRevocation {
        family_id: family_id.to_string(),
        reason: RevocationReason::Revoked,
        revoked_at: now,
        expires_at: now + ttl,
    }
}

fn session(subject: &str, family_id: &str, created_at: DateTime<Utc>) -> FamilySession {
    FamilySession {
        subject: subject.to_string(),
        family_id: family_id.to_string(),
        session_binding_id: "device".to_string(),
        client: ClientKind::Browser,
        created_at,
        expires_at: created_at + Duration::days(30),
    }
}

#[tokio::test]
async fn test_record_is_write_once() {
    let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
    let store = store_at(clock.clone());
    let now = clock.now();

    let first = store.record(entry("jti-1", "fam", now, Duration::hours(1))).await.unwrap();
    assert_eq!(first, RecordOutcome::Recorded);

    let mut second = entry("jti-1", "fam", now, Duration::hours(9));
    second.reason = RevocationReason::Logout;
    let outcome = store.record(second).await.unwrap();
    assert_eq!(outcome, RecordOutcome::AlreadyRecorded);

    // The first write is kept
    let stored = store.entry("jti-1").unwrap();
    assert_eq!(stored.reason, RevocationReason::Rotated);
    assert_eq!(stored.expires_at, now + Duration::hours(1));
    assert!(store.is_revoked("jti-1").await.unwrap());
    assert!(!store.is_revoked("jti-2").await.unwrap());
}

#[tokio::test]
async fn test_concurrent_records_have_one_winner() {
    let store = Arc::new(InMemoryRevocationStore::new());
    let now = Utc::now();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .record(entry("contended", "fam", now, Duration::hours(1)))
                .await
                .unwrap()
        }));
    }

    let mut recorded = 0;
    for handle in handles {
        if handle.await.unwrap().was_recorded() {
            recorded += 1;
        }
    }
    assert_eq!(recorded, 1);
}

#[tokio::test]
async fn test_expired_entry_is_not_revoked() {
    let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
    let store = store_at(clock.clone());
    let now = clock.now();

    store.record(entry("jti", "fam", now, Duration::minutes(5))).await.unwrap();
    clock.advance(Duration::minutes(5));

    assert!(!store.is_revoked("jti").await.unwrap());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_revoke_family_is_idempotent() {
    let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
    let store = store_at(clock.clone());
    let now = clock.now();

    store.revoke_family(tombstone("fam", now, Duration::days(30))).await.unwrap();
    store.revoke_family(tombstone("fam", now, Duration::days(1))).await.unwrap();
    assert!(store.is_family_revoked("fam").await.unwrap());

    // The first tombstone's expiry is kept
    clock.advance(Duration::days(2));
    assert!(store.is_family_revoked("fam").await.unwrap());

    clock.advance(Duration::days(28));
    assert!(!store.is_family_revoked("fam").await.unwrap());
}

#[tokio::test]
async fn test_family_index_tracks_recorded_tokens() {
    let store = InMemoryRevocationStore::new();
    let now = Utc::now();

    store.record(entry("b", "fam", now, Duration::hours(1))).await.unwrap();
    store.record(entry("a", "fam", now, Duration::hours(1))).await.unwrap();
    store.record(entry("c", "other", now, Duration::hours(1))).await.unwrap();

    assert_eq!(store.tokens_in_family("fam"), vec!["a".to_string(), "b".to_string()]);
    assert_eq!(store.tokens_in_family("missing"), Vec::<String>::new());
}

#[tokio::test]
async fn test_families_for_subject() {
    let store = InMemoryRevocationStore::new();
    let now = Utc::now();

    store.track_family(session("alice", "fam-2", now + Duration::seconds(5))).await.unwrap();
    store.track_family(session("alice", "fam-1", now)).await.unwrap();
    store.track_family(session("bob", "fam-3", now)).await.unwrap();

    let families = store.families_for_subject("alice").await.unwrap();
    let ids: Vec<&str> = families.iter().map(|s| s.family_id.as_str()).collect();
    assert_eq!(ids, vec!["fam-1", "fam-2"]);
    assert!(store.families_for_subject("carol").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_purge_expired() {
    let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
    let store = store_at(clock.clone());
    let now = clock.now();

    store.record(entry("short", "fam-a", now, Duration::minutes(10))).await.unwrap();
    store.record(entry("long", "fam-b", now, Duration::days(7))).await.unwrap();
    store.revoke_family(tombstone("fam-a", now, Duration::hours(1))).await.unwrap();
    store.track_family(session("alice", "fam-a", now)).await.unwrap();

    clock.advance(Duration::hours(2));
    let removed = store.purge_expired().await.unwrap();

    assert_eq!(removed, 2);
    assert_eq!(store.len(), 1);
    assert!(store.tokens_in_family("fam-a").is_empty());
    assert!(!store.is_family_revoked("fam-a").await.unwrap());
    assert_eq!(store.families_for_subject("alice").await.unwrap().len(), 1);

    clock.advance(Duration::days(30));
    let removed = store.purge_expired().await.unwrap();
    assert_eq!(removed, 2);
    assert!(store.is_empty());
    assert!(store.families_for_subject("alice").await.unwrap().is_empty());
}
