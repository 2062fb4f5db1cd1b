//! Auth event sinks for recording state-changing session operations.

mod sink;

pub use sink::{AuthEventSink, ChannelEventSink, NoOpEventSink, TracingEventSink, AUDIT_TARGET};
