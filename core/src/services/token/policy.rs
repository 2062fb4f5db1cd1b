//! Token lifetimes per client kind

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Duration;

use sg_shared::config::{ClientPolicyConfig, SessionConfig};

use crate::domain::entities::token::{
    ClientKind, ABSOLUTE_SESSION_DAYS, ACCESS_TOKEN_EXPIRY_MINUTES, REFRESH_TOKEN_EXPIRY_DAYS,
};

/// Lifetimes and attribute allow-list applied when minting for one client kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    pub access_ttl: Duration,

    /// Idle lifetime of each refresh token
    pub refresh_ttl: Duration,

    /// Cap on the whole family, measured from login
    pub absolute_session: Duration,

    /// Attribute names allowed in tokens; `None` accepts any valid name
    pub allowed_attributes: Option<Arc<BTreeSet<String>>>,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl: Duration::minutes(ACCESS_TOKEN_EXPIRY_MINUTES),
            refresh_ttl: Duration::days(REFRESH_TOKEN_EXPIRY_DAYS),
            absolute_session: Duration::days(ABSOLUTE_SESSION_DAYS),
            allowed_attributes: None,
        }
    }
}

impl TokenPolicy {
    pub fn from_client_config(
        config: &ClientPolicyConfig,
        allowed_attributes: Option<Arc<BTreeSet<String>>>,
    ) -> Self {
        Self {
            access_ttl: Duration::seconds(config.access_ttl_secs),
            refresh_ttl: Duration::seconds(config.refresh_ttl_secs),
            absolute_session: Duration::seconds(config.absolute_session_secs),
            allowed_attributes,
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> Self {
        self.access_ttl = ttl;
        self
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> Self {
        self.refresh_ttl = ttl;
        self
    }

    pub fn with_absolute_session(mut self, cap: Duration) -> Self {
        self.absolute_session = cap;
        self
    }

    pub fn with_allowed_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_attributes = Some(Arc::new(names.into_iter().map(Into::into).collect()));
        self
    }
}

/// Policies for every client kind
#[derive(Debug, Clone, Default)]
pub struct TokenPolicies {
    browser: TokenPolicy,
    trusted_device: TokenPolicy,
}

impl TokenPolicies {
    pub fn new(browser: TokenPolicy, trusted_device: TokenPolicy) -> Self {
        Self {
            browser,
            trusted_device,
        }
    }

    /// Same policy for every client kind
    pub fn uniform(policy: TokenPolicy) -> Self {
        Self::new(policy.clone(), policy)
    }

    /// Trusted devices fall back to the browser policy when not configured
    pub fn from_config(config: &SessionConfig) -> Self {
        let allowed = if config.allowed_attributes.is_empty() {
            None
        } else {
            Some(Arc::new(
                config.allowed_attributes.iter().cloned().collect::<BTreeSet<_>>(),
            ))
        };

        let browser = TokenPolicy::from_client_config(&config.browser_policy(), allowed.clone());
        let trusted_device = config
            .trusted_device
            .as_ref()
            .map(|device| TokenPolicy::from_client_config(device, allowed))
            .unwrap_or_else(|| browser.clone());

        Self::new(browser, trusted_device)
    }

    pub fn for_client(&self, client: ClientKind) -> &TokenPolicy {
        match client {
            ClientKind::Browser => &self.browser,
            ClientKind::TrustedDevice => &self.trusted_device,
        }
    }
}
