//! End-to-end wiring with the in-memory backend

use std::sync::Arc;

use sg_core::{NoOpEventSink, Principal, SigningKey, SystemClock, TokenError};
use sg_infra::{build_session_guard, InfrastructureError};
use sg_shared::config::{AppConfig, Environment, StoreBackend};

#[tokio::test]
async fn test_development_guard_serves_sessions() {
    let config = AppConfig::development();
    let guard = build_session_guard(&config, Arc::new(SystemClock), Arc::new(NoOpEventSink))
        .await
        .unwrap();

    assert_eq!(guard.store.backend(), StoreBackend::Memory);
    assert!(guard.purge_task.is_some());

    let principal = Principal::new("user-1", ["admin"], "device-1");
    let login = guard.service.login(&principal).await.unwrap();
    let rotated = guard.service.refresh(&login.refresh_token).await.unwrap();
    assert_eq!(rotated.generation, 1);
    assert_eq!(
        guard.service.refresh(&login.refresh_token).await,
        Err(TokenError::InvalidToken)
    );

    guard.shutdown();
}

#[tokio::test]
async fn test_runtime_rollover_through_shared_signer() {
    let config = AppConfig::development();
    let guard = build_session_guard(&config, Arc::new(SystemClock), Arc::new(NoOpEventSink))
        .await
        .unwrap();

    let principal = Principal::new("user-1", ["admin"], "device-1");
    let before = guard.service.login(&principal).await.unwrap();

    let next = SigningKey::from_secret(
        "dev-2",
        jsonwebtoken::Algorithm::HS256,
        b"second-development-secret-0123456789",
    )
    .unwrap();
    guard.signer.rollover(next).unwrap();
    assert_eq!(guard.signer.active_key_id(), "dev-2");

    assert!(guard.service.authenticate(&before.access_token).is_ok());
    let after = guard.service.refresh(&before.refresh_token).await.unwrap();
    assert!(guard.service.authenticate(&after.access_token).is_ok());

    guard.shutdown();
}

#[tokio::test]
async fn test_production_rejects_development_secret() {
    let mut config = AppConfig::development();
    config.environment = Environment::Production;

    let result =
        build_session_guard(&config, Arc::new(SystemClock), Arc::new(NoOpEventSink)).await;
    assert!(matches!(result, Err(InfrastructureError::Config(_))));
}
