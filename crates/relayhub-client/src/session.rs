//! Client session state machine.

use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use relayhub_config::ClientConfig;
use relayhub_protocols::{DEFAULT_EVENT, EventEmitter, NotificationSink, RelaySink};

use crate::error::ClientError;

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Connection state of a [`ClientSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientSessionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

/// The one live transport of a session.
struct ActiveConnection {
    writer: Arc<Mutex<WsSink>>,
    closed: CancellationToken,
    reader: JoinHandle<()>,
}

impl ActiveConnection {
    /// Stop the read loop and wait until it has closed the transport.
    async fn shutdown(self) {
        self.closed.cancel();
        if let Err(e) = self.reader.await {
            error!("Read loop failed: {}", e);
        }
    }
}

/// Build the URL dialed for `host`.
///
/// A bare host gets the configured port and path; `host:port` gets the path;
/// a full `ws://` or `wss://` URL is used as given.
pub fn endpoint_url(host: &str, config: &ClientConfig) -> String {
    if host.starts_with("ws://") || host.starts_with("wss://") {
        return host.to_string();
    }
    if host.parse::<Ipv6Addr>().is_ok() {
        return format!("ws://[{}]:{}{}", host, config.port, config.path);
    }

    let has_port = host
        .rsplit_once(':')
        .is_some_and(|(_, port)| !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()));
    if has_port {
        format!("ws://{}{}", host, config.path)
    } else {
        format!("ws://{}:{}{}", host, config.port, config.path)
    }
}

/// Client side of the relay.
///
/// Holds at most one transport at a time. Snapshots received from the hub go
/// through a bounded relay queue to the emitter; when the queue is full the
/// snapshot is dropped.
pub struct ClientSession {
    config: ClientConfig,
    event: String,
    emitter: Arc<dyn EventEmitter>,
    state: Arc<watch::Sender<ClientSessionState>>,
    active: Mutex<Option<ActiveConnection>>,
    connecting: Mutex<()>,
}

impl ClientSession {
    pub fn new(config: ClientConfig, emitter: Arc<dyn EventEmitter>) -> Self {
        let (state, _) = watch::channel(ClientSessionState::Disconnected);
        Self {
            config,
            event: DEFAULT_EVENT.to_string(),
            emitter,
            state: Arc::new(state),
            active: Mutex::new(None),
            connecting: Mutex::new(()),
        }
    }

    /// Publish snapshots under `event` instead of the default name.
    pub fn with_event(mut self, event: impl Into<String>) -> Self {
        self.event = event.into();
        self
    }

    pub fn state(&self) -> ClientSessionState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ClientSessionState> {
        self.state.subscribe()
    }

    /// Connect to the hub at `host` and announce `identity`.
    ///
    /// Any previous connection is closed first. Attempts repeat every retry
    /// interval until one succeeds or the connect timeout passes, in which
    /// case the session ends up `Failed`.
    pub async fn connect(&self, identity: &str, host: &str) -> Result<(), ClientError> {
        let _connecting = self.connecting.lock().await;

        let prior = self.active.lock().await.take();
        if let Some(prior) = prior {
            info!("Closing previous connection before reconnecting");
            prior.shutdown().await;
        }

        self.state.send_replace(ClientSessionState::Connecting);
        let url = endpoint_url(host, &self.config);

        let stream = match self.dial_with_retry(&url, identity).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to connect to {}: {}", url, e);
                self.state.send_replace(ClientSessionState::Failed);
                return Err(e);
            }
        };

        let (sink, source) = stream.split();
        let writer = Arc::new(Mutex::new(sink));
        let closed = CancellationToken::new();
        let (relay, _forwarder) =
            RelaySink::spawn(self.event.clone(), self.config.relay_capacity, self.emitter.clone());

        self.state.send_replace(ClientSessionState::Connected);
        let reader = tokio::spawn(read_loop(
            source,
            writer.clone(),
            relay,
            closed.clone(),
            self.state.clone(),
        ));

        *self.active.lock().await = Some(ActiveConnection {
            writer,
            closed,
            reader,
        });
        info!("Connected to {} as {}", url, identity);
        Ok(())
    }

    /// Send one text frame. Fails with [`ClientError::NotConnected`] unless
    /// the session is connected.
    pub async fn send(&self, text: &str) -> Result<(), ClientError> {
        if self.state() != ClientSessionState::Connected {
            return Err(ClientError::NotConnected);
        }

        let writer = self
            .active
            .lock()
            .await
            .as_ref()
            .map(|active| active.writer.clone())
            .ok_or(ClientError::NotConnected)?;

        writer
            .lock()
            .await
            .send(Message::Text(text.to_string().into()))
            .await?;
        Ok(())
    }

    /// Close the current connection, if any.
    pub async fn disconnect(&self) {
        let prior = self.active.lock().await.take();
        if let Some(prior) = prior {
            prior.shutdown().await;
        }
        self.state.send_replace(ClientSessionState::Disconnected);
    }

    async fn dial_with_retry(&self, url: &str, identity: &str) -> Result<WsStream, ClientError> {
        retry_until(
            url,
            self.config.retry_interval(),
            self.config.connect_timeout(),
            || handshake(url, identity),
        )
        .await
    }
}

/// Run `attempt` at once and then on every `interval` tick until it succeeds
/// or `timeout` has passed. A failed identity send counts as a failed attempt
/// like any other handshake error.
async fn retry_until<T, F, Fut>(
    target: &str,
    interval: Duration,
    timeout: Duration,
    mut attempt: F,
) -> Result<T, ClientError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let interval = interval.max(Duration::from_millis(1));
    let deadline = Instant::now() + timeout;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut attempts: u32 = 0;
    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {
                return Err(ClientError::ConnectTimeout(timeout));
            }
            _ = ticker.tick() => {}
        }

        attempts += 1;
        match tokio::time::timeout_at(deadline, attempt()).await {
            Ok(Ok(value)) => {
                debug!("Attempt {} to {} succeeded", attempts, target);
                return Ok(value);
            }
            Ok(Err(e)) => {
                warn!(
                    "Attempt {} to {} failed: {}, retrying in {:?}",
                    attempts, target, e, interval
                );
            }
            Err(_) => return Err(ClientError::ConnectTimeout(timeout)),
        }
    }
}

/// Open the transport and send the identity frame.
async fn handshake(url: &str, identity: &str) -> Result<WsStream, ClientError> {
    let (mut stream, _) = tokio_tungstenite::connect_async(url)
        .await
        .map_err(|e| ClientError::Handshake(e.to_string()))?;

    if let Err(e) = stream.send(Message::Text(identity.to_string().into())).await {
        if let Err(close_err) = stream.close(None).await {
            debug!("Close after failed identity send: {}", close_err);
        }
        return Err(e.into());
    }
    Ok(stream)
}

/// Relay incoming snapshots until the connection fails or is closed.
///
/// On exit the relay queue is dropped, which ends the forwarding task once it
/// has drained.
async fn read_loop(
    mut source: WsSource,
    writer: Arc<Mutex<WsSink>>,
    relay: RelaySink,
    closed: CancellationToken,
    state: Arc<watch::Sender<ClientSessionState>>,
) {
    loop {
        let next = tokio::select! {
            _ = closed.cancelled() => break,
            next = source.next() => next,
        };

        match next {
            Some(Ok(Message::Text(text))) => relay.deliver(text.as_str()),
            Some(Ok(Message::Close(_))) | None => {
                info!("Hub closed the connection");
                break;
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => {
                warn!("Failed to receive message: {}", e);
                break;
            }
        }
    }

    drop(relay);
    closed.cancel();
    if let Err(e) = writer.lock().await.close().await {
        debug!("Closing transport: {}", e);
    }

    state.send_if_modified(|current| {
        if *current == ClientSessionState::Connected {
            *current = ClientSessionState::Disconnected;
            true
        } else {
            false
        }
    });
}
