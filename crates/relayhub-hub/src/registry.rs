//! Live connection registry.

use axum::extract::ws::Utf8Bytes;
use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use relayhub_protocols::ConnectionId;

use crate::error::DeliveryError;

/// Handle to one live connection's outbound path.
///
/// Cloning is cheap; every clone refers to the same connection. Closing any
/// clone closes the connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    tx: mpsc::Sender<Utf8Bytes>,
    closed: CancellationToken,
}

impl ConnectionHandle {
    /// Create a handle with a fresh id and a bounded outbound buffer.
    ///
    /// The receiver belongs to the connection's writer task.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Utf8Bytes>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = Self {
            id: ConnectionId::new(),
            tx,
            closed: CancellationToken::new(),
        };
        (handle, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Queue a frame without waiting.
    pub fn try_send(&self, frame: Utf8Bytes) -> Result<(), DeliveryError> {
        if self.closed.is_cancelled() {
            return Err(DeliveryError::Closed);
        }
        self.tx.try_send(frame).map_err(|e| match e {
            TrySendError::Full(_) => DeliveryError::Full,
            TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Signal the connection's tasks to shut down and close the transport.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Token cancelled when the connection closes.
    pub fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }
}

/// Set of live connections keyed by id.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionHandle>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: ConnectionHandle) {
        self.connections.insert(handle.id(), handle);
    }

    /// Remove a connection. Removing an absent id is a no-op.
    pub fn unregister(&self, id: &ConnectionId) -> Option<ConnectionHandle> {
        self.connections.remove(id).map(|(_, handle)| handle)
    }

    /// Copy of the live set taken now; later mutations do not affect it.
    pub fn snapshot(&self) -> Vec<ConnectionHandle> {
        self.connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
