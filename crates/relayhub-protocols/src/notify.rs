//! Notification sink protocol.
//!
//! The hub and the client session never talk to a front end directly. They
//! hand every transcript snapshot to a [`NotificationSink`], which must not
//! block. [`RelaySink`] is the standard implementation: a bounded queue that
//! drops on full, drained by one forwarding task into an [`EventEmitter`].

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::SinkError;

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;

/// Event name under which transcript snapshots are published.
pub const DEFAULT_EVENT: &str = "chat:update";

/// Best-effort receiver of serialized transcript snapshots.
pub trait NotificationSink: Send + Sync {
    /// Hand over one snapshot. Must return immediately.
    fn deliver(&self, snapshot: &str);
}

/// External front end that displays named events.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: &str, payload: &str);
}

/// Emitter that only writes snapshots to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEmitter;

impl EventEmitter for TracingEmitter {
    fn emit(&self, event: &str, payload: &str) {
        info!(event = %event, "{}", payload);
    }
}

/// Bounded relay queue in front of an [`EventEmitter`].
///
/// Dropping the last `RelaySink` closes the queue; the forwarding task then
/// drains what is left and exits.
#[derive(Debug, Clone)]
pub struct RelaySink {
    event: Arc<str>,
    tx: mpsc::Sender<String>,
}

impl RelaySink {
    /// Create a sink and the receiving end of its queue.
    ///
    /// A capacity of zero is raised to one.
    pub fn channel(event: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let event: String = event.into();
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let sink = Self {
            event: Arc::from(event),
            tx,
        };
        (sink, rx)
    }

    /// Create a sink and spawn the task forwarding its queue to `emitter`.
    pub fn spawn(
        event: impl Into<String>,
        capacity: usize,
        emitter: Arc<dyn EventEmitter>,
    ) -> (Self, JoinHandle<()>) {
        let (sink, rx) = Self::channel(event, capacity);
        let task = tokio::spawn(forward(sink.event.clone(), rx, emitter));
        (sink, task)
    }

    /// Event name this sink publishes under.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Queue a snapshot without waiting.
    pub fn try_deliver(&self, snapshot: &str) -> Result<(), SinkError> {
        self.tx
            .try_send(snapshot.to_string())
            .map_err(|e| match e {
                TrySendError::Full(_) => SinkError::Full,
                TrySendError::Closed(_) => SinkError::Closed,
            })
    }
}

impl NotificationSink for RelaySink {
    fn deliver(&self, snapshot: &str) {
        if let Err(e) = self.try_deliver(snapshot) {
            warn!("Dropping {} notification: {}", self.event(), e);
        }
    }
}

/// Drain the relay queue into the emitter, in receive order.
async fn forward(
    event: Arc<str>,
    mut rx: mpsc::Receiver<String>,
    emitter: Arc<dyn EventEmitter>,
) {
    debug!("Relay forwarder for {} started", event);
    while let Some(snapshot) = rx.recv().await {
        emitter.emit(&event, &snapshot);
    }
    debug!("Relay forwarder for {} finished", event);
}
