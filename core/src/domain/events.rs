//! Authentication events emitted by state-changing session operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of state change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventType {
    Login,
    Rotate,
    ReuseDetected,
    Logout,
}

impl AuthEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Rotate => "rotate",
            Self::ReuseDetected => "reuse_detected",
            Self::Logout => "logout",
        }
    }
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event record handed to an `AuthEventSink`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthEvent {
    #[serde(rename = "type")]
    pub event_type: AuthEventType,
    pub subject: String,
    pub family_id: String,
    pub timestamp: DateTime<Utc>,

    /// Refresh generation after the event, when one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generation: Option<u64>,
}

impl AuthEvent {
    pub fn new(
        event_type: AuthEventType,
        subject: impl Into<String>,
        family_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_type,
            subject: subject.into(),
            family_id: family_id.into(),
            timestamp,
            generation: None,
        }
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }
}
