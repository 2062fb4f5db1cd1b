//! Event sinks for login, rotation, reuse and logout events.
//!
//! Emission never blocks and never fails the operation that produced the event.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::events::{AuthEvent, AuthEventType};

/// Tracing target used for audit records
pub const AUDIT_TARGET: &str = "auth_audit";

/// Receiver of auth events
pub trait AuthEventSink: Send + Sync {
    fn emit(&self, event: &AuthEvent);
}

/// Writes events as structured tracing records on the `auth_audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl AuthEventSink for TracingEventSink {
    fn emit(&self, event: &AuthEvent) {
        match event.event_type {
            AuthEventType::ReuseDetected => warn!(
                target: AUDIT_TARGET,
                event_type = %event.event_type,
                subject = %event.subject,
                family_id = %event.family_id,
                generation = ?event.generation,
                timestamp = %event.timestamp,
                "Refresh token reuse detected"
            ),
            _ => info!(
                target: AUDIT_TARGET,
                event_type = %event.event_type,
                subject = %event.subject,
                family_id = %event.family_id,
                generation = ?event.generation,
                timestamp = %event.timestamp,
                "Auth event"
            ),
        }
    }
}

/// Forwards events to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelEventSink {
    sender: mpsc::UnboundedSender<AuthEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<AuthEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl AuthEventSink for ChannelEventSink {
    fn emit(&self, event: &AuthEvent) {
        // A dropped receiver only means nobody is listening any more
        let _ = self.sender.send(event.clone());
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl AuthEventSink for NoOpEventSink {
    fn emit(&self, _event: &AuthEvent) {}
}

// Also implement for () to allow simple type defaults
impl AuthEventSink for () {
    fn emit(&self, _event: &AuthEvent) {}
}

impl<T: AuthEventSink + ?Sized> AuthEventSink for Arc<T> {
    fn emit(&self, event: &AuthEvent) {
        (**self).emit(event)
    }
}
