//! Services: signing, issuance, rotation, the session façade and audit sinks.

pub mod audit;
pub mod rotation;
pub mod session;
pub mod store_guard;
pub mod token;

pub use audit::{AuthEventSink, ChannelEventSink, NoOpEventSink, TracingEventSink};
pub use rotation::RotationEngine;
pub use session::{AuthSessionService, SessionInfo};
pub use store_guard::GuardedStore;
pub use token::{
    PurgeConfig, PurgeResult, RevocationPurgeService, Signer, SigningKey, TokenFactory,
    TokenPolicies, TokenPolicy, TokenSigner,
};
