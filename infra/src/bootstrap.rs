//! Wires configuration into a running session service

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use sg_core::clock::Clock;
use sg_core::errors::DomainError;
use sg_core::services::{
    AuthEventSink, AuthSessionService, PurgeConfig, RevocationPurgeService, Signer,
    TokenPolicies,
};
use sg_shared::config::{AppConfig, StoreBackend};

use crate::store::AnyRevocationStore;
use crate::InfrastructureError;

/// Everything a host process needs to serve authentication
pub struct SessionGuard {
    pub service: Arc<AuthSessionService<AnyRevocationStore>>,

    /// Same signer the service uses; call `rollover` on it to rotate keys at runtime
    pub signer: Arc<Signer>,

    pub store: Arc<AnyRevocationStore>,
    pub purge_task: Option<JoinHandle<()>>,
}

impl SessionGuard {
    /// Stop the background purge task
    pub fn shutdown(self) {
        if let Some(task) = self.purge_task {
            task.abort();
        }
        info!("Session guard stopped");
    }
}

/// Build the signer, store, session service and purge task from configuration
///
/// Refuses to start in production with the development signing secret.
pub async fn build_session_guard(
    config: &AppConfig,
    clock: Arc<dyn Clock>,
    events: Arc<dyn AuthEventSink>,
) -> Result<SessionGuard, InfrastructureError> {
    if config.auth.jwt.is_using_development_secret() {
        if config.environment.is_production() {
            return Err(InfrastructureError::Config(
                "the development signing secret cannot be used in production".to_string(),
            ));
        }
        warn!("Signing with the development secret; configure real keys for production");
    }

    let signer = Arc::new(
        Signer::from_config(&config.auth.jwt, clock.clone()).map_err(DomainError::from)?,
    );

    let store = Arc::new(
        AnyRevocationStore::connect(&config.revocation, &config.cache, clock.clone()).await?,
    );

    let service = Arc::new(AuthSessionService::new(
        signer.clone(),
        store.clone(),
        TokenPolicies::from_config(&config.auth.session),
        Duration::from_millis(config.auth.session.store_timeout_ms),
        clock,
        events,
    ));

    // Redis expires keys natively
    let purge_task = match store.backend() {
        StoreBackend::Memory => Arc::new(RevocationPurgeService::new(
            store.clone(),
            PurgeConfig::from(&config.revocation),
        ))
        .start_background_task(),
        StoreBackend::Redis => None,
    };

    info!(
        environment = %config.environment,
        backend = ?store.backend(),
        key_id = %signer.active_key_id(),
        "Session guard ready"
    );

    Ok(SessionGuard {
        service,
        signer,
        store,
        purge_task,
    })
}
