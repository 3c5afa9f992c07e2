//! Per-connection inbound session.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use futures::stream::SplitStream;
use futures::{Sink, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use relayhub_protocols::ConnectionId;

use crate::hub::BroadcastHub;
use crate::registry::ConnectionHandle;

/// How long a dropped connection gets to flush its close frame.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Lifecycle of an inbound session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Handshaking,
    Active,
    Closed,
}

/// Server side of one accepted connection.
///
/// The first text frame names the peer; every later frame is a message for
/// the hub. Any read failure is terminal: the handle is unregistered and the
/// transport closed.
pub struct InboundSession {
    handle: ConnectionHandle,
    hub: Arc<BroadcastHub>,
    identity: Option<String>,
    phase: SessionPhase,
}

impl InboundSession {
    /// Create a session for a freshly upgraded socket.
    pub fn new(
        hub: Arc<BroadcastHub>,
        outbound_buffer: usize,
    ) -> (Self, mpsc::Receiver<Utf8Bytes>) {
        let (handle, outbound_rx) = ConnectionHandle::new(outbound_buffer);
        let session = Self {
            handle,
            hub,
            identity: None,
            phase: SessionPhase::Handshaking,
        };
        (session, outbound_rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Drive the connection until either side fails or closes.
    pub async fn run(mut self, socket: WebSocket, outbound_rx: mpsc::Receiver<Utf8Bytes>) {
        let (ws_tx, ws_rx) = socket.split();

        self.activate();
        let writer = tokio::spawn(write_loop(
            self.handle.clone(),
            self.hub.clone(),
            ws_tx,
            outbound_rx,
        ));

        self.read_loop(ws_rx).await;
        self.close();

        if let Err(e) = writer.await {
            error!("Writer task for {} failed: {}", self.id(), e);
        }
    }

    fn activate(&mut self) {
        self.hub.registry().register(self.handle.clone());
        self.phase = SessionPhase::Active;
        info!("Connection {} active", self.id());
    }

    async fn read_loop(&mut self, mut ws_rx: SplitStream<WebSocket>) {
        let closed = self.handle.close_token();
        loop {
            let next = tokio::select! {
                _ = closed.cancelled() => {
                    debug!("Connection {} closed by hub", self.id());
                    break;
                }
                next = ws_rx.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => self.on_frame(text.as_str()),
                Some(Ok(Message::Binary(_))) => {
                    warn!("Binary frame from {}, closing", self.id());
                    break;
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => {
                    info!("Connection {} closed by peer", self.id());
                    break;
                }
                Some(Err(e)) => {
                    warn!("Read error on {}: {}", self.id(), e);
                    break;
                }
            }
        }
    }

    fn on_frame(&mut self, text: &str) {
        if self.identity.is_none() {
            info!("Connection {} identified as {}", self.id(), text);
            self.identity = Some(text.to_string());
            return;
        }

        debug!("Message from {}: {}", self.id(), text);
        if let Err(e) = self.hub.on_message(&self.handle.id(), text) {
            error!("Broadcast for {} skipped: {}", self.id(), e);
        }
    }

    fn close(&mut self) {
        self.hub.registry().unregister(&self.handle.id());
        self.handle.close();
        self.phase = SessionPhase::Closed;
        info!(
            "Connection {} ({}) closed",
            self.id(),
            self.identity.as_deref().unwrap_or("anonymous")
        );
    }
}

/// Forward queued frames to the socket until the connection closes.
///
/// Every write races the close token, so a peer that stops reading cannot
/// keep the task alive after the hub has dropped it.
async fn write_loop<S>(
    handle: ConnectionHandle,
    hub: Arc<BroadcastHub>,
    mut ws_tx: S,
    mut outbound_rx: mpsc::Receiver<Utf8Bytes>,
) where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    let closed = handle.close_token();
    loop {
        let frame = tokio::select! {
            _ = closed.cancelled() => break,
            frame = outbound_rx.recv() => frame,
        };
        let Some(frame) = frame else { break };

        let sent = tokio::select! {
            _ = closed.cancelled() => {
                debug!("Connection {} closed while writing", handle.id());
                break;
            }
            sent = ws_tx.send(Message::Text(frame)) => sent,
        };
        if let Err(e) = sent {
            warn!("Write error on {}: {}", handle.id(), e);
            break;
        }
    }

    hub.registry().unregister(&handle.id());
    handle.close();
    match tokio::time::timeout(CLOSE_TIMEOUT, ws_tx.close()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!("Close on {} failed: {}", handle.id(), e),
        Err(_) => debug!("Close on {} timed out, dropping transport", handle.id()),
    }
}
