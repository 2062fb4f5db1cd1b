//! Key material for JWT signing and verification

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use sg_shared::config::KeyConfig;

use crate::errors::TokenError;

/// Key family an algorithm belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyFamily {
    Hmac,
    Rsa,
    Ec,
    Ed,
}

fn key_family(algorithm: Algorithm) -> KeyFamily {
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => KeyFamily::Hmac,
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => KeyFamily::Rsa,
        Algorithm::ES256 | Algorithm::ES384 => KeyFamily::Ec,
        Algorithm::EdDSA => KeyFamily::Ed,
    }
}

/// Parse an algorithm name such as `RS256` or `EdDSA`
pub fn parse_algorithm(name: &str) -> Result<Algorithm, TokenError> {
    Algorithm::from_str(name).map_err(|_| TokenError::KeyLoad {
        message: format!("Unsupported algorithm: {}", name),
    })
}

/// One signing key with its id and algorithm
///
/// A key without the private half can only verify; it is what a rolled-over key
/// becomes, or what a verifier-only deployment loads.
#[derive(Clone)]
pub struct SigningKey {
    key_id: String,
    algorithm: Algorithm,
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .field("algorithm", &self.algorithm)
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

impl SigningKey {
    /// Shared-secret key for HS256/384/512
    pub fn from_secret(
        key_id: impl Into<String>,
        algorithm: Algorithm,
        secret: &[u8],
    ) -> Result<Self, TokenError> {
        if key_family(algorithm) != KeyFamily::Hmac {
            return Err(key_load(format!("{:?} does not use a shared secret", algorithm)));
        }
        if secret.is_empty() {
            return Err(key_load("Shared secret is empty".to_string()));
        }

        Ok(Self {
            key_id: key_id.into(),
            algorithm,
            encoding_key: Some(EncodingKey::from_secret(secret)),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Asymmetric key pair from PEM strings
    ///
    /// The pair is checked with a probe signature so a private key that does not
    /// match its public key fails here instead of on the first request.
    pub fn from_pem(
        key_id: impl Into<String>,
        algorithm: Algorithm,
        private_key_pem: &str,
        public_key_pem: &str,
    ) -> Result<Self, TokenError> {
        let encoding_key = encoding_key_from_pem(algorithm, private_key_pem.as_bytes())?;
        let decoding_key = decoding_key_from_pem(algorithm, public_key_pem.as_bytes())?;

        let key = Self {
            key_id: key_id.into(),
            algorithm,
            encoding_key: Some(encoding_key),
            decoding_key,
        };
        key.probe()?;
        Ok(key)
    }

    /// Verify-only key from a public PEM
    pub fn verify_only_pem(
        key_id: impl Into<String>,
        algorithm: Algorithm,
        public_key_pem: &str,
    ) -> Result<Self, TokenError> {
        Ok(Self {
            key_id: key_id.into(),
            algorithm,
            encoding_key: None,
            decoding_key: decoding_key_from_pem(algorithm, public_key_pem.as_bytes())?,
        })
    }

    /// Load a key described by configuration
    ///
    /// HMAC algorithms read `secret`; asymmetric algorithms read the PEM files. A
    /// configuration with only `public_key_path` yields a verify-only key.
    pub fn from_config(config: &KeyConfig, algorithm: Algorithm) -> Result<Self, TokenError> {
        if config.key_id.is_empty() {
            return Err(key_load("Key id must not be empty".to_string()));
        }

        if key_family(algorithm) == KeyFamily::Hmac {
            let secret = config.secret.as_deref().ok_or_else(|| {
                key_load(format!("Key '{}' has no shared secret", config.key_id))
            })?;
            return Self::from_secret(config.key_id.clone(), algorithm, secret.as_bytes());
        }

        let public_key_path = config.public_key_path.as_deref().ok_or_else(|| {
            key_load(format!("Key '{}' has no public key path", config.key_id))
        })?;
        let public_pem = read_pem(public_key_path)?;

        match config.private_key_path.as_deref() {
            Some(private_key_path) => {
                let private_pem = read_pem(private_key_path)?;
                Self::from_pem(config.key_id.clone(), algorithm, &private_pem, &public_pem)
            }
            None => Self::verify_only_pem(config.key_id.clone(), algorithm, &public_pem),
        }
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn can_sign(&self) -> bool {
        self.encoding_key.is_some()
    }

    pub(crate) fn encoding_key(&self) -> Option<&EncodingKey> {
        self.encoding_key.as_ref()
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }

    /// Copy of this key without the private half
    pub fn to_verify_only(&self) -> Self {
        Self {
            key_id: self.key_id.clone(),
            algorithm: self.algorithm,
            encoding_key: None,
            decoding_key: self.decoding_key.clone(),
        }
    }

    fn probe(&self) -> Result<(), TokenError> {
        #[derive(Serialize, Deserialize)]
        struct Probe {
            probe: String,
        }

        let Some(encoding_key) = self.encoding_key.as_ref() else {
            return Ok(());
        };

        let claims = Probe {
            probe: self.key_id.clone(),
        };
        let token = encode(&Header::new(self.algorithm), &claims, encoding_key)
            .map_err(|e| key_load(format!("Key '{}' cannot sign: {}", self.key_id, e)))?;

        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        decode::<Probe>(&token, &self.decoding_key, &validation).map_err(|_| {
            key_load(format!(
                "Private and public key of '{}' do not match",
                self.key_id
            ))
        })?;
        Ok(())
    }
}

/// Key retired by a rollover, verify-only until `accept_until`
#[derive(Debug, Clone)]
pub struct RetiredKey {
    pub key: Arc<SigningKey>,
    pub retired_at: DateTime<Utc>,
    pub accept_until: DateTime<Utc>,
}

/// Active signing key plus at most one previous verify-only key
#[derive(Debug, Clone)]
pub struct KeyRing {
    active: Arc<SigningKey>,
    previous: Option<RetiredKey>,
}

impl KeyRing {
    pub fn new(active: SigningKey) -> Result<Self, TokenError> {
        if !active.can_sign() {
            return Err(key_load(format!(
                "Active key '{}' has no private key",
                active.key_id()
            )));
        }
        Ok(Self {
            active: Arc::new(active),
            previous: None,
        })
    }

    /// Ring with a previous key accepted for verification until `accept_until`
    pub fn with_previous(
        mut self,
        previous: SigningKey,
        retired_at: DateTime<Utc>,
        accept_until: DateTime<Utc>,
    ) -> Result<Self, TokenError> {
        if previous.key_id() == self.active.key_id() {
            return Err(key_load(format!(
                "Previous key reuses active key id '{}'",
                previous.key_id()
            )));
        }
        self.previous = Some(RetiredKey {
            key: Arc::new(previous.to_verify_only()),
            retired_at,
            accept_until,
        });
        Ok(self)
    }

    /// New ring with `next` active and the current active key retired
    pub fn rolled_over(
        &self,
        next: Arc<SigningKey>,
        now: DateTime<Utc>,
        accept_until: DateTime<Utc>,
    ) -> Self {
        Self {
            active: next,
            previous: Some(RetiredKey {
                key: Arc::new(self.active.to_verify_only()),
                retired_at: now,
                accept_until,
            }),
        }
    }

    pub fn active(&self) -> &SigningKey {
        &self.active
    }

    pub fn previous(&self) -> Option<&RetiredKey> {
        self.previous.as_ref()
    }

    /// Key that may verify a token carrying `key_id` at `now`
    pub fn verification_key(&self, key_id: &str, now: DateTime<Utc>) -> Option<&SigningKey> {
        if self.active.key_id() == key_id {
            return Some(&self.active);
        }
        match &self.previous {
            Some(retired) if retired.key.key_id() == key_id && now < retired.accept_until => {
                Some(&retired.key)
            }
            _ => None,
        }
    }
}

fn encoding_key_from_pem(algorithm: Algorithm, pem: &[u8]) -> Result<EncodingKey, TokenError> {
    let result = match key_family(algorithm) {
        KeyFamily::Rsa => EncodingKey::from_rsa_pem(pem),
        KeyFamily::Ec => EncodingKey::from_ec_pem(pem),
        KeyFamily::Ed => EncodingKey::from_ed_pem(pem),
        KeyFamily::Hmac => {
            return Err(key_load(format!("{:?} does not use PEM keys", algorithm)));
        }
    };
    result.map_err(|e| key_load(format!("Invalid private key format: {}", e)))
}

fn decoding_key_from_pem(algorithm: Algorithm, pem: &[u8]) -> Result<DecodingKey, TokenError> {
    let result = match key_family(algorithm) {
        KeyFamily::Rsa => DecodingKey::from_rsa_pem(pem),
        KeyFamily::Ec => DecodingKey::from_ec_pem(pem),
        KeyFamily::Ed => DecodingKey::from_ed_pem(pem),
        KeyFamily::Hmac => {
            return Err(key_load(format!("{:?} does not use PEM keys", algorithm)));
        }
    };
    result.map_err(|e| key_load(format!("Invalid public key format: {}", e)))
}

fn read_pem<P: AsRef<Path>>(path: P) -> Result<String, TokenError> {
    fs::read_to_string(path.as_ref()).map_err(|e| {
        key_load(format!(
            "Failed to read key file {}: {}",
            path.as_ref().display(),
            e
        ))
    })
}

fn key_load(message: String) -> TokenError {
    TokenError::KeyLoad { message }
}
