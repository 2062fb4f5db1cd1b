//! # SessionGuard Core
//!
//! Token authentication core: short-lived access tokens paired with rotating
//! refresh tokens, server-side revocation with reuse detection, and a session
//! façade tying them together. Storage backends and process wiring live in
//! `sg_infra`; configuration types live in `sg_shared`.

pub mod clock;
pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::entities::{
    AccessClaims, AttributeValue, ClientKind, FamilyRevocation, FamilySession, Principal,
    PrincipalStore, RecordOutcome, RefreshClaims, RevocationEntry, RevocationReason,
    TokenAttributes, TokenPair,
};
pub use domain::events::{AuthEvent, AuthEventType};
pub use errors::{DomainError, DomainResult, StoreError, TokenError};
pub use repositories::{InMemoryRevocationStore, RevocationStore};
pub use services::{
    AuthEventSink, AuthSessionService, ChannelEventSink, NoOpEventSink, PurgeConfig,
    RevocationPurgeService, SessionInfo, Signer, SigningKey, TokenPolicies, TokenPolicy,
    TokenSigner, TracingEventSink,
};
