//! Domain layer containing token entities, revocation records and auth events.

pub mod entities;
pub mod events;

pub use entities::*;
pub use events::{AuthEvent, AuthEventType};
