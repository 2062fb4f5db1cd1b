//! Token service module
//!
//! This module handles all token-related operations including:
//! - Key material loading and rollover (`SigningKey`, `KeyRing`)
//! - JWS signing and verification (`Signer`)
//! - Claim construction under per-client policies (`TokenFactory`)
//! - Background purge of expired revocation entries

mod cleanup;
mod factory;
mod key_manager;
mod policy;
mod signer;

#[cfg(test)]
pub(crate) mod tests;

pub use cleanup::{PurgeConfig, PurgeResult, RevocationPurgeService};
pub use factory::{new_family_id, SessionLineage, TokenFactory, FAMILY_ID_BYTES};
pub use key_manager::{parse_algorithm, KeyRing, RetiredKey, SigningKey};
pub use policy::{TokenPolicies, TokenPolicy};
pub use signer::{Signer, TokenSigner};
