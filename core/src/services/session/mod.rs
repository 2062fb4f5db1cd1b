//! Session façade: login, authenticate, refresh and logout.

mod service;

pub use service::{AuthSessionService, SessionInfo};
