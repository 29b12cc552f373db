//! Lock event sinks
//!
//! Lock services report outcomes to an injected sink instead of a global
//! logger. The sink only observes; every outcome is still returned to the
//! caller.

use std::sync::Arc;

/// Observable lock outcomes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockEvent {
    /// Lock taken; `stolen_from` names the previous owner of an expired lease
    Acquired {
        name: String,
        identity: String,
        stolen_from: Option<String>,
    },
    /// Acquire refused because the lease is still running
    Contended {
        name: String,
        identity: String,
        owner: Option<String>,
    },
    Released {
        name: String,
        identity: String,
    },
    /// Release refused with an ownership violation
    ReleaseRejected {
        name: String,
        identity: String,
        owner: Option<String>,
    },
}

impl LockEvent {
    pub fn label(&self) -> &'static str {
        match self {
            LockEvent::Acquired {
                stolen_from: Some(_),
                ..
            } => "stolen",
            LockEvent::Acquired { .. } => "acquired",
            LockEvent::Contended { .. } => "contended",
            LockEvent::Released { .. } => "released",
            LockEvent::ReleaseRejected { .. } => "release_rejected",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LockEvent::Acquired { name, .. }
            | LockEvent::Contended { name, .. }
            | LockEvent::Released { name, .. }
            | LockEvent::ReleaseRejected { name, .. } => name,
        }
    }
}

pub trait LockEventSink: Send + Sync {
    fn record(&self, event: &LockEvent);
}

/// Emits structured `tracing` events
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl LockEventSink for TracingEventSink {
    fn record(&self, event: &LockEvent) {
        match event {
            LockEvent::Acquired {
                name,
                identity,
                stolen_from: None,
            } => {
                tracing::debug!(lock = %name, identity = %identity, "Lock acquired");
            }
            LockEvent::Acquired {
                name,
                identity,
                stolen_from: Some(previous),
            } => {
                tracing::info!(
                    lock = %name,
                    identity = %identity,
                    previous_owner = %previous,
                    "Expired lock taken over"
                );
            }
            LockEvent::Contended {
                name,
                identity,
                owner,
            } => {
                tracing::debug!(
                    lock = %name,
                    identity = %identity,
                    owner = ?owner,
                    "Lock held by another owner"
                );
            }
            LockEvent::Released { name, identity } => {
                tracing::debug!(lock = %name, identity = %identity, "Lock released");
            }
            LockEvent::ReleaseRejected {
                name,
                identity,
                owner,
            } => {
                tracing::warn!(
                    lock = %name,
                    identity = %identity,
                    owner = ?owner,
                    "Release rejected: caller is not the lock owner"
                );
            }
        }
    }
}

/// Counts events through the `metrics` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsEventSink;

pub const LOCK_EVENTS_METRIC: &str = "leasehold_lock_events_total";

impl LockEventSink for MetricsEventSink {
    fn record(&self, event: &LockEvent) {
        metrics::counter!(LOCK_EVENTS_METRIC, "event" => event.label()).increment(1);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl LockEventSink for NoopEventSink {
    fn record(&self, _event: &LockEvent) {}
}

/// Forwards every event to each inner sink
#[derive(Default, Clone)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn LockEventSink>>,
}

impl FanoutEventSink {
    pub fn new(sinks: Vec<Arc<dyn LockEventSink>>) -> Self {
        Self { sinks }
    }

    pub fn with(mut self, sink: Arc<dyn LockEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl LockEventSink for FanoutEventSink {
    fn record(&self, event: &LockEvent) {
        for sink in &self.sinks {
            sink.record(event);
        }
    }
}
