//! Background purge of expired revocation entries
//!
//! Entries only need to live as long as the token they describe; once a token
//! would fail verification on expiry alone, its entry can go.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use sg_shared::config::RevocationConfig;

use crate::errors::StoreError;
use crate::repositories::RevocationStore;

/// Configuration for the purge task
#[derive(Debug, Clone)]
pub struct PurgeConfig {
    /// How often to run the purge
    pub interval: Duration,
    pub enabled: bool,
}

impl Default for PurgeConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            enabled: true,
        }
    }
}

impl From<&RevocationConfig> for PurgeConfig {
    fn from(config: &RevocationConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.purge_interval_secs.max(1)),
            enabled: config.purge_enabled,
        }
    }
}

/// Periodically evicts expired entries from a revocation store
pub struct RevocationPurgeService<S: RevocationStore> {
    store: Arc<S>,
    config: PurgeConfig,
}

impl<S: RevocationStore> RevocationPurgeService<S> {
    pub fn new(store: Arc<S>, config: PurgeConfig) -> Self {
        Self { store, config }
    }

    /// Run a single purge cycle
    pub async fn run_purge(&self) -> Result<PurgeResult, StoreError> {
        if !self.config.enabled {
            return Ok(PurgeResult::default());
        }

        let removed = self.store.purge_expired().await?;
        info!(removed, "Revocation purge completed");
        Ok(PurgeResult { removed })
    }

    /// Start the purge as an independent background task
    ///
    /// Returns `None` when purging is disabled.
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Revocation purge is disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            info!(
                interval_secs = self.config.interval.as_secs(),
                "Revocation purge started"
            );

            let mut timer = tokio::time::interval(self.config.interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                timer.tick().await;

                if let Err(e) = self.run_purge().await {
                    error!(error = %e, "Revocation purge cycle failed");
                }
            }
        }))
    }
}

/// Result of a purge cycle
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PurgeResult {
    /// Entries, tombstones and session index records removed
    pub removed: usize,
}
