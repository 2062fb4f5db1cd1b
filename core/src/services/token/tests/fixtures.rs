//! Shared key fixtures for token service tests

use std::sync::Arc;

use jsonwebtoken::Algorithm;

use crate::clock::{Clock, ManualClock};
use crate::services::token::{Signer, SigningKey};

pub const RSA_PRIVATE: &str = include_str!("../../../../tests/fixtures/rsa_private.pem");
pub const RSA_PUBLIC: &str = include_str!("../../../../tests/fixtures/rsa_public.pem");
pub const RSA_NEXT_PRIVATE: &str = include_str!("../../../../tests/fixtures/rsa_next_private.pem");
pub const RSA_NEXT_PUBLIC: &str = include_str!("../../../../tests/fixtures/rsa_next_public.pem");
pub const ED25519_PRIVATE: &str = include_str!("../../../../tests/fixtures/ed25519_private.pem");
pub const ED25519_PUBLIC: &str = include_str!("../../../../tests/fixtures/ed25519_public.pem");

pub const ISSUER: &str = "sessionguard";
pub const AUDIENCE: &str = "sessionguard-api";

/// Start of every test clock: 2023-11-14T22:13:20Z
pub const EPOCH: i64 = 1_700_000_000;

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::at_secs(EPOCH))
}

pub fn rsa_key(key_id: &str) -> SigningKey {
    SigningKey::from_pem(key_id, Algorithm::RS256, RSA_PRIVATE, RSA_PUBLIC).unwrap()
}

pub fn next_rsa_key(key_id: &str) -> SigningKey {
    SigningKey::from_pem(key_id, Algorithm::RS256, RSA_NEXT_PRIVATE, RSA_NEXT_PUBLIC).unwrap()
}

pub fn hmac_key(key_id: &str, secret: &str) -> SigningKey {
    SigningKey::from_secret(key_id, Algorithm::HS256, secret.as_bytes()).unwrap()
}

pub fn rsa_signer(clock: Arc<ManualClock>) -> Signer {
    let clock: Arc<dyn Clock> = clock;
    Signer::new(rsa_key("k1"), ISSUER, AUDIENCE, clock).unwrap()
}
