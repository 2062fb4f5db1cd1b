//! Signing key and token policy configuration

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Placeholder secret shipped for local development only
pub const DEVELOPMENT_SECRET: &str = "development-secret-please-change-in-production";

/// Key material reference for one signing key
///
/// Either `secret` (HMAC algorithms) or PEM paths (asymmetric algorithms) must be set.
/// A verify-only key needs only the public half.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KeyConfig {
    /// Key identifier written into the token header (`kid`)
    pub key_id: String,

    /// Shared secret for HS* algorithms
    #[serde(default)]
    pub secret: Option<String>,

    /// Path to PEM-encoded private key
    #[serde(default)]
    pub private_key_path: Option<String>,

    /// Path to PEM-encoded public key
    #[serde(default)]
    pub public_key_path: Option<String>,
}

impl KeyConfig {
    /// Shared-secret key
    pub fn secret(key_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key_id: key_id.into(),
            secret: Some(secret.into()),
            ..Default::default()
        }
    }

    /// PEM file backed key pair
    pub fn pem_files(
        key_id: impl Into<String>,
        private_key_path: impl Into<String>,
        public_key_path: impl Into<String>,
    ) -> Self {
        Self {
            key_id: key_id.into(),
            secret: None,
            private_key_path: Some(private_key_path.into()),
            public_key_path: Some(public_key_path.into()),
        }
    }

    /// Whether this key can only verify
    pub fn is_verify_only(&self) -> bool {
        self.secret.is_none() && self.private_key_path.is_none()
    }
}

/// JWT signing configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// Signing algorithm name (RS256, ES256, EdDSA, HS256, ...)
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// JWT issuer claim
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// JWT audience claim
    #[serde(default = "default_audience")]
    pub audience: String,

    /// Key used for signing new tokens
    pub active_key: KeyConfig,

    /// Key retired by the last rollover, accepted for verification only
    #[serde(default)]
    pub previous_key: Option<KeyConfig>,

    /// How long tokens signed by the previous key stay verifiable, in seconds
    #[serde(default = "default_rollover_grace")]
    pub rollover_grace_secs: i64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            algorithm: String::from("HS256"),
            issuer: default_issuer(),
            audience: default_audience(),
            active_key: KeyConfig::secret("dev", DEVELOPMENT_SECRET),
            previous_key: None,
            rollover_grace_secs: default_rollover_grace(),
        }
    }
}

impl JwtConfig {
    /// Create from environment variables
    ///
    /// - `SG_JWT_ALGORITHM` (default `RS256`)
    /// - `SG_JWT_ISSUER`, `SG_JWT_AUDIENCE`
    /// - `SG_JWT_KEY_ID`, `SG_JWT_SECRET`, `SG_JWT_PRIVATE_KEY_PATH`, `SG_JWT_PUBLIC_KEY_PATH`
    /// - `SG_JWT_PREVIOUS_KEY_ID`, `SG_JWT_PREVIOUS_SECRET`, `SG_JWT_PREVIOUS_PUBLIC_KEY_PATH`
    /// - `SG_JWT_ROLLOVER_GRACE_SECS`
    pub fn from_env() -> Self {
        let active_key = KeyConfig {
            key_id: std::env::var("SG_JWT_KEY_ID").unwrap_or_else(|_| "primary".to_string()),
            secret: std::env::var("SG_JWT_SECRET").ok(),
            private_key_path: Some(
                std::env::var("SG_JWT_PRIVATE_KEY_PATH")
                    .unwrap_or_else(|_| "keys/jwt_private_key.pem".to_string()),
            ),
            public_key_path: Some(
                std::env::var("SG_JWT_PUBLIC_KEY_PATH")
                    .unwrap_or_else(|_| "keys/jwt_public_key.pem".to_string()),
            ),
        };

        let previous_key = std::env::var("SG_JWT_PREVIOUS_KEY_ID").ok().map(|key_id| KeyConfig {
            key_id,
            secret: std::env::var("SG_JWT_PREVIOUS_SECRET").ok(),
            private_key_path: None,
            public_key_path: std::env::var("SG_JWT_PREVIOUS_PUBLIC_KEY_PATH").ok(),
        });

        Self {
            algorithm: std::env::var("SG_JWT_ALGORITHM").unwrap_or_else(|_| default_algorithm()),
            issuer: std::env::var("SG_JWT_ISSUER").unwrap_or_else(|_| default_issuer()),
            audience: std::env::var("SG_JWT_AUDIENCE").unwrap_or_else(|_| default_audience()),
            active_key,
            previous_key,
            rollover_grace_secs: env_parse("SG_JWT_ROLLOVER_GRACE_SECS", default_rollover_grace()),
        }
    }

    /// Check if using the development secret (security warning)
    pub fn is_using_development_secret(&self) -> bool {
        self.active_key.secret.as_deref() == Some(DEVELOPMENT_SECRET)
    }
}

/// Token lifetimes for one client kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClientPolicyConfig {
    /// Access token lifetime in seconds
    pub access_ttl_secs: i64,

    /// Refresh token idle lifetime in seconds
    pub refresh_ttl_secs: i64,

    /// Absolute session lifetime from login, in seconds
    pub absolute_session_secs: i64,
}

/// Session policy configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Access token lifetime in seconds (browser clients)
    #[serde(default = "default_access_ttl")]
    pub access_ttl_secs: i64,

    /// Refresh token idle lifetime in seconds (browser clients)
    #[serde(default = "default_refresh_ttl")]
    pub refresh_ttl_secs: i64,

    /// Absolute session cap in seconds, carried unchanged across rotations
    #[serde(default = "default_absolute_session")]
    pub absolute_session_secs: i64,

    /// Overrides for trusted devices
    #[serde(default)]
    pub trusted_device: Option<ClientPolicyConfig>,

    /// Default timeout for revocation store calls in milliseconds
    #[serde(default = "default_store_timeout")]
    pub store_timeout_ms: u64,

    /// Attribute names allowed in access tokens (empty = any valid name)
    #[serde(default)]
    pub allowed_attributes: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: default_access_ttl(),
            refresh_ttl_secs: default_refresh_ttl(),
            absolute_session_secs: default_absolute_session(),
            trusted_device: None,
            store_timeout_ms: default_store_timeout(),
            allowed_attributes: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Create from environment variables
    ///
    /// - `SG_ACCESS_TTL_SECS`, `SG_REFRESH_TTL_SECS`, `SG_ABSOLUTE_SESSION_SECS`
    /// - `SG_STORE_TIMEOUT_MS`
    pub fn from_env() -> Self {
        Self {
            access_ttl_secs: env_parse("SG_ACCESS_TTL_SECS", default_access_ttl()),
            refresh_ttl_secs: env_parse("SG_REFRESH_TTL_SECS", default_refresh_ttl()),
            absolute_session_secs: env_parse("SG_ABSOLUTE_SESSION_SECS", default_absolute_session()),
            trusted_device: None,
            store_timeout_ms: env_parse("SG_STORE_TIMEOUT_MS", default_store_timeout()),
            allowed_attributes: Vec::new(),
        }
    }

    /// Set access token lifetime in minutes
    pub fn with_access_ttl_minutes(mut self, minutes: i64) -> Self {
        self.access_ttl_secs = minutes * 60;
        self
    }

    /// Set refresh token idle lifetime in days
    pub fn with_refresh_ttl_days(mut self, days: i64) -> Self {
        self.refresh_ttl_secs = days * 86400;
        self
    }

    /// Browser policy derived from the top-level fields
    pub fn browser_policy(&self) -> ClientPolicyConfig {
        ClientPolicyConfig {
            access_ttl_secs: self.access_ttl_secs,
            refresh_ttl_secs: self.refresh_ttl_secs,
            absolute_session_secs: self.absolute_session_secs,
        }
    }
}

/// Complete authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT configuration
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Session policy configuration
    #[serde(default)]
    pub session: SessionConfig,
}

impl AuthConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        Self {
            jwt: JwtConfig::from_env(),
            session: SessionConfig::from_env(),
        }
    }
}

pub(crate) fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn default_algorithm() -> String {
    String::from("RS256")
}

fn default_issuer() -> String {
    String::from("sessionguard")
}

fn default_audience() -> String {
    String::from("sessionguard-api")
}

fn default_rollover_grace() -> i64 {
    86400 // 1 day
}

fn default_access_ttl() -> i64 {
    900 // 15 minutes
}

fn default_refresh_ttl() -> i64 {
    604800 // 7 days
}

fn default_absolute_session() -> i64 {
    2592000 // 30 days
}

fn default_store_timeout() -> u64 {
    500
}
