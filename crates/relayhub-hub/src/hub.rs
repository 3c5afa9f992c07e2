//! Broadcast hub.

use std::sync::Arc;

use axum::extract::ws::Utf8Bytes;
use parking_lot::Mutex;
use tracing::{debug, error, warn};

use relayhub_protocols::{ConnectionId, NotificationSink, TranscriptEntry};

use crate::error::HubError;
use crate::registry::ConnectionRegistry;
use crate::transcript::TranscriptStore;

#[cfg(test)]
#[path = "hub_tests.rs"]
mod tests;

/// Outcome of one broadcast cycle.
#[derive(Debug, Clone)]
pub struct BroadcastReport {
    /// The entry appended for this message.
    pub entry: TranscriptEntry,
    /// Number of connections the snapshot was queued for.
    pub delivered: usize,
    /// Connections found dead during fan-out and removed.
    pub dropped: Vec<ConnectionId>,
}

/// Owner of the transcript and the connection set.
///
/// Each inbound message runs one cycle: append, serialize, fan out. Cycles are
/// serialized so every peer sees snapshots in transcript order. Fan-out never
/// waits on a recipient.
pub struct BroadcastHub {
    transcript: TranscriptStore,
    registry: ConnectionRegistry,
    sink: Option<Arc<dyn NotificationSink>>,
    cycle: Mutex<()>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self {
            transcript: TranscriptStore::new(),
            registry: ConnectionRegistry::new(),
            sink: None,
            cycle: Mutex::new(()),
        }
    }

    /// Create a hub that also relays every snapshot to `sink`.
    pub fn with_sink(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new()
        }
    }

    pub fn transcript(&self) -> &TranscriptStore {
        &self.transcript
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Append `payload`, then push the full transcript to every registered
    /// connection and to the notification sink.
    ///
    /// A recipient whose buffer is full or whose writer is gone is
    /// unregistered and closed; the others still receive the update.
    pub fn on_message(
        &self,
        sender: &ConnectionId,
        payload: &str,
    ) -> Result<BroadcastReport, HubError> {
        let _cycle = self.cycle.lock();

        let entry = self.transcript.append(payload);
        debug!("Appended message from {} at {}", sender, entry.timestamp);

        let snapshot = match self.transcript.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!("Failed to serialize transcript, skipping broadcast: {}", e);
                return Err(e.into());
            }
        };
        let frame = Utf8Bytes::from(snapshot);

        let mut delivered = 0;
        let mut dropped = Vec::new();
        for handle in self.registry.snapshot() {
            match handle.try_send(frame.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    warn!("Dropping connection {}: {}", handle.id(), e);
                    self.registry.unregister(&handle.id());
                    handle.close();
                    dropped.push(handle.id());
                }
            }
        }

        if let Some(sink) = &self.sink {
            sink.deliver(frame.as_str());
        }

        Ok(BroadcastReport {
            entry,
            delivered,
            dropped,
        })
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}
