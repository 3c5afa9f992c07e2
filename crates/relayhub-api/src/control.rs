//! Hub and client controls.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};

use relayhub_client::{ClientError, ClientSession};
use relayhub_config::Config;
use relayhub_hub::{BroadcastHub, HubServer};
use relayhub_protocols::{EventEmitter, RelaySink};

/// Success, or already in the requested state.
pub const STATUS_OK: u8 = 0;
/// The operation failed; see the log.
pub const STATUS_FAILED: u8 = 1;

/// Start/stop control for the hub.
pub struct HubControl {
    server: HubServer,
}

impl HubControl {
    /// Build the hub and its notification relay.
    ///
    /// Must be called inside a Tokio runtime: the relay's forwarding task is
    /// spawned here.
    pub fn new(config: &Config, emitter: Arc<dyn EventEmitter>) -> Self {
        let (sink, _forwarder) =
            RelaySink::spawn(config.notify.event.clone(), config.notify.capacity, emitter);
        let hub = Arc::new(BroadcastHub::with_sink(Arc::new(sink)));
        Self {
            server: HubServer::new(config.server.clone(), hub),
        }
    }

    pub fn hub(&self) -> Arc<BroadcastHub> {
        self.server.hub()
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.server.local_addr().await
    }

    /// Start listening. Starting a running hub is a no-op.
    pub async fn start(&self) -> u8 {
        match self.server.start().await {
            Ok(addr) => {
                info!("Hub started on {}", addr);
                STATUS_OK
            }
            Err(e) => {
                error!("Failed to start hub: {}", e);
                STATUS_FAILED
            }
        }
    }

    /// Stop listening. Stopping a stopped hub is a no-op.
    pub async fn stop(&self) -> u8 {
        match self.server.stop().await {
            Ok(true) => STATUS_OK,
            Ok(false) => {
                warn!("Hub was not running");
                STATUS_OK
            }
            Err(e) => {
                error!("Failed to stop hub: {}", e);
                STATUS_FAILED
            }
        }
    }
}

/// Connect/send control for one client session.
pub struct ClientControl {
    session: ClientSession,
}

impl ClientControl {
    pub fn new(config: &Config, emitter: Arc<dyn EventEmitter>) -> Self {
        let session = ClientSession::new(config.client.clone(), emitter)
            .with_event(config.notify.event.clone());
        Self { session }
    }

    pub fn session(&self) -> &ClientSession {
        &self.session
    }

    /// Connect to the hub at `host` as `identity`, replacing any current
    /// connection.
    pub async fn connect(&self, identity: &str, host: &str) -> u8 {
        match self.session.connect(identity, host).await {
            Ok(()) => STATUS_OK,
            Err(e) => {
                error!("Failed to connect to {}: {}", host, e);
                STATUS_FAILED
            }
        }
    }

    /// Send `text` as `identity:text`. Failures are logged and dropped.
    pub async fn send(&self, identity: &str, text: &str) {
        match self.session.send(&format!("{}:{}", identity, text)).await {
            Ok(()) => {}
            Err(ClientError::NotConnected) => {
                warn!("Not connected, message from {} dropped", identity);
            }
            Err(e) => {
                warn!("Failed to send message from {}: {}", identity, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use relayhub_client::ClientSessionState;
    use relayhub_protocols::TracingEmitter;

    fn local_config() -> Config {
        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.client.retry_interval_ms = 50;
        config.client.connect_timeout_ms = 300;
        config
    }

    #[tokio::test]
    async fn test_start_stop_status_codes() {
        let control = HubControl::new(&local_config(), Arc::new(TracingEmitter));

        assert_eq!(control.stop().await, STATUS_OK);
        assert_eq!(control.start().await, STATUS_OK);
        assert_eq!(control.start().await, STATUS_OK);
        assert!(control.local_addr().await.is_some());
        assert_eq!(control.stop().await, STATUS_OK);
        assert_eq!(control.stop().await, STATUS_OK);
        assert!(control.local_addr().await.is_none());
    }

    #[tokio::test]
    async fn test_start_failure_status() {
        let mut config = local_config();
        config.server.path = "no-slash".to_string();
        let control = HubControl::new(&config, Arc::new(TracingEmitter));
        assert_eq!(control.start().await, STATUS_FAILED);
    }

    #[tokio::test]
    async fn test_stop_timeout_reports_failure() {
        use tokio::io::AsyncWriteExt;

        let mut config = local_config();
        config.server.shutdown_grace_ms = 200;
        let control = HubControl::new(&config, Arc::new(TracingEmitter));
        assert_eq!(control.start().await, STATUS_OK);
        let addr = control.local_addr().await.unwrap();

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET /ws HTTP/1.1\r\n").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;

        assert_eq!(control.stop().await, STATUS_FAILED);
        assert_eq!(control.stop().await, STATUS_OK);
        drop(stream);
    }

    #[tokio::test]
    async fn test_connect_failure_status() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let host = listener.local_addr().unwrap().to_string();
        drop(listener);

        let control = ClientControl::new(&local_config(), Arc::new(TracingEmitter));
        assert_eq!(control.connect("alice", &host).await, STATUS_FAILED);
        assert_eq!(control.session().state(), ClientSessionState::Failed);
    }

    #[tokio::test]
    async fn test_send_when_disconnected_does_not_panic() {
        let control = ClientControl::new(&local_config(), Arc::new(TracingEmitter));
        control.send("alice", "hello").await;
        assert_eq!(control.session().state(), ClientSessionState::Disconnected);
    }
}
