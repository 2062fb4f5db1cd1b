//! End-to-end session scenarios through the public API

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;
use jsonwebtoken::Algorithm;
use tokio::sync::mpsc::UnboundedReceiver;

use sg_core::{
    AuthEvent, AuthEventType, AuthSessionService, ChannelEventSink, Clock, DomainError,
    FamilyRevocation, PrincipalStore,
    FamilySession, InMemoryRevocationStore, ManualClock, Principal, RecordOutcome,
    RevocationEntry, RevocationReason, RevocationStore, Signer, SigningKey, StoreError,
    TokenError, TokenPolicies, TokenPolicy,
};

const RSA_PRIVATE: &str = include_str!("fixtures/rsa_private.pem");
const RSA_PUBLIC: &str = include_str!("fixtures/rsa_public.pem");
const RSA_NEXT_PRIVATE: &str = include_str!("fixtures/rsa_next_private.pem");
const RSA_NEXT_PUBLIC: &str = include_str!("fixtures/rsa_next_public.pem");

/// In-memory store that can be switched off
struct FlakyStore {
    inner: InMemoryRevocationStore,
    down: AtomicBool,
}

impl FlakyStore {
    fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: InMemoryRevocationStore::with_clock(clock),
            down: AtomicBool::new(false),
        }
    }

    fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable {
                message: "connection reset".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RevocationStore for FlakyStore {
    async fn record(&self, entry: RevocationEntry) -> Result<RecordOutcome, StoreError> {
        self.check()?;
        self.inner.record(entry).await
    }

    async fn is_revoked(&self, token_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.is_revoked(token_id).await
    }

    async fn revoke_family(&self, revocation: FamilyRevocation) -> Result<(), StoreError> {
        self.check()?;
        self.inner.revoke_family(revocation).await
    }

    async fn is_family_revoked(&self, family_id: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.is_family_revoked(family_id).await
    }

    async fn track_family(&self, session: FamilySession) -> Result<(), StoreError> {
        self.check()?;
        self.inner.track_family(session).await
    }

    async fn families_for_subject(&self, subject: &str) -> Result<Vec<FamilySession>, StoreError> {
        self.check()?;
        self.inner.families_for_subject(subject).await
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        self.check()?;
        self.inner.purge_expired().await
    }
}

struct World {
    service: Arc<AuthSessionService<FlakyStore>>,
    signer: Arc<Signer>,
    clock: Arc<ManualClock>,
    events: UnboundedReceiver<AuthEvent>,
}

impl World {
    fn new() -> Self {
        let clock = Arc::new(ManualClock::at_secs(1_700_000_000));
        let key = SigningKey::from_pem("2024-01", Algorithm::RS256, RSA_PRIVATE, RSA_PUBLIC).unwrap();
        let signer = Arc::new(
            Signer::new(key, "sessionguard", "sessionguard-api", clock.clone())
                .unwrap()
                .with_rollover_grace(Duration::hours(24)),
        );
        let (sink, events) = ChannelEventSink::new();

        let service = AuthSessionService::new(
            signer.clone(),
            Arc::new(FlakyStore::new(clock.clone())),
            TokenPolicies::uniform(TokenPolicy::default()),
            StdDuration::from_millis(250),
            clock.clone(),
            Arc::new(sink),
        );

        Self {
            service: Arc::new(service),
            signer,
            clock,
            events,
        }
    }

    fn event_types(&mut self) -> Vec<AuthEventType> {
        let mut types = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            types.push(event.event_type);
        }
        types
    }
}

fn user() -> Principal {
    Principal::new("u-1001", ["customer"], "session-cookie-1")
}

/// Single-user directory keyed by API key
struct ApiKeyDirectory;

#[async_trait]
impl PrincipalStore for ApiKeyDirectory {
    type Credentials = String;

    async fn verify(&self, api_key: &String) -> Result<Principal, DomainError> {
        if api_key == "key-1001" {
            Ok(user())
        } else {
            Err(DomainError::Unauthorized)
        }
    }
}

#[tokio::test]
async fn scenario_a_reuse_poisons_family() {
    let mut world = World::new();
    let service = &world.service;

    let login = service.login(&user()).await.unwrap();
    let first = service.refresh(&login.refresh_token).await.unwrap();

    // Attacker replays the original refresh token
    let replay = service.refresh(&login.refresh_token).await;
    assert_eq!(replay, Err(TokenError::InvalidToken));

    // The legitimate client's current token is dead too
    assert_eq!(
        service.refresh(&first.refresh_token).await,
        Err(TokenError::InvalidToken)
    );
    assert_eq!(
        service.authenticate_strict(&first.access_token).await,
        Err(TokenError::InvalidToken)
    );
    assert!(service.active_sessions("u-1001").await.unwrap().is_empty());

    let events = world.event_types();
    assert_eq!(events[0], AuthEventType::Login);
    assert_eq!(events[1], AuthEventType::Rotate);
    assert!(events[2..].iter().all(|e| *e == AuthEventType::ReuseDetected));
}

#[tokio::test]
async fn scenario_b_access_token_expires_at_fifteen_minutes() {
    let world = World::new();
    let login = world.service.login(&user()).await.unwrap();

    world.clock.advance(Duration::minutes(14) + Duration::seconds(59));
    let principal = world.service.authenticate(&login.access_token).unwrap();
    assert_eq!(principal.subject(), "u-1001");

    world.clock.advance(Duration::seconds(1));
    assert_eq!(
        world.service.authenticate(&login.access_token),
        Err(TokenError::Expired)
    );

    // The refresh token still works and yields a fresh access token
    let rotated = world.service.refresh(&login.refresh_token).await.unwrap();
    assert!(world.service.authenticate(&rotated.access_token).is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_c_concurrent_rotation() {
    let world = World::new();
    let login = world.service.login(&user()).await.unwrap();

    let (left, right) = tokio::join!(
        {
            let service = world.service.clone();
            let token = login.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&token).await })
        },
        {
            let service = world.service.clone();
            let token = login.refresh_token.clone();
            tokio::spawn(async move { service.refresh(&token).await })
        }
    );
    let results = [left.unwrap(), right.unwrap()];

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let losers: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
    assert_eq!(winners.len(), 1);
    assert_eq!(losers, vec![&TokenError::InvalidToken]);

    // The loser's replay revoked the family, including the winner's new token
    assert_eq!(
        world.service.refresh(&winners[0].refresh_token).await,
        Err(TokenError::InvalidToken)
    );
}

#[tokio::test]
async fn scenario_d_store_outage_issues_nothing() {
    let world = World::new();
    let login = world.service.login(&user()).await.unwrap();

    world.service.store().set_down(true);
    let result = world.service.refresh(&login.refresh_token).await;
    match result {
        Err(error @ TokenError::StoreUnavailable { .. }) => assert!(error.is_retryable()),
        other => panic!("expected StoreUnavailable, got {:?}", other),
    }

    world.service.store().set_down(false);
    let claims = world.signer.verify::<sg_core::RefreshClaims>(&login.refresh_token).unwrap();
    assert!(!world.service.store().is_revoked(&claims.jti).await.unwrap());

    // Retrying after recovery succeeds exactly once
    assert!(world.service.refresh(&login.refresh_token).await.is_ok());
    assert_eq!(
        world.service.refresh(&login.refresh_token).await,
        Err(TokenError::InvalidToken)
    );
}

#[tokio::test]
async fn revoke_family_twice_has_same_end_state() {
    let world = World::new();
    let login = world.service.login(&user()).await.unwrap();
    let store = world.service.store();

    let tombstone = FamilyRevocation {
        family_id: login.family_id.clone(),
        reason: RevocationReason::Revoked,
        revoked_at: world.clock.now(),
        expires_at: world.clock.now() + Duration::days(30),
    };
    store.revoke_family(tombstone.clone()).await.unwrap();
    let after_first = store.is_family_revoked(&login.family_id).await.unwrap();
    store.revoke_family(tombstone).await.unwrap();
    let after_second = store.is_family_revoked(&login.family_id).await.unwrap();

    assert!(after_first);
    assert_eq!(after_first, after_second);
    assert_eq!(
        world.service.refresh(&login.refresh_token).await,
        Err(TokenError::InvalidToken)
    );
}

#[tokio::test]
async fn key_rollover_keeps_sessions_alive_through_grace() {
    let world = World::new();
    let login = world.service.login(&user()).await.unwrap();
    let stale = world.service.login(&user()).await.unwrap();

    let next = SigningKey::from_pem("2024-02", Algorithm::RS256, RSA_NEXT_PRIVATE, RSA_NEXT_PUBLIC)
        .unwrap();
    world.signer.rollover(next).unwrap();

    // Tokens minted under the old key keep working during the grace window
    assert!(world.service.authenticate(&login.access_token).is_ok());
    let rotated = world.service.refresh(&login.refresh_token).await.unwrap();
    let header = jsonwebtoken::decode_header(&rotated.refresh_token).unwrap();
    assert_eq!(header.kid.as_deref(), Some("2024-02"));

    // After the grace window only the new key verifies
    let second = world.service.login(&user()).await.unwrap();
    world.clock.advance(Duration::hours(24));
    assert_eq!(
        world.service.refresh(&stale.refresh_token).await,
        Err(TokenError::InvalidToken)
    );
    assert!(world.service.refresh(&second.refresh_token).await.is_ok());
}

#[tokio::test]
async fn absolute_session_cap_ends_rotation() {
    let world = World::new();
    let mut token = world.service.login(&user()).await.unwrap().refresh_token;

    // Rotate every six days; the fourth hop's token expires at the 30 day cap
    for _ in 0..4 {
        world.clock.advance(Duration::days(6));
        token = world.service.refresh(&token).await.unwrap().refresh_token;
    }
    world.clock.advance(Duration::days(6));
    assert_eq!(world.service.refresh(&token).await, Err(TokenError::InvalidToken));
}

#[tokio::test]
async fn login_accepts_principals_from_external_store() {
    let world = World::new();
    let directory = ApiKeyDirectory;

    assert!(matches!(
        directory.verify(&"wrong".to_string()).await,
        Err(DomainError::Unauthorized)
    ));

    let principal = directory.verify(&"key-1001".to_string()).await.unwrap();
    let login = world.service.login(&principal).await.unwrap();
    let authenticated = world.service.authenticate(&login.access_token).unwrap();
    assert_eq!(authenticated, principal);
}
