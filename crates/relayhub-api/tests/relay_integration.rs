//! End-to-end tests: real hub on an ephemeral port, real client sessions.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio_tungstenite::tungstenite::Message;

use relayhub_api::{ClientControl, HubControl, STATUS_OK};
use relayhub_client::ClientSessionState;
use relayhub_config::Config;
use relayhub_hub::ConnectionHandle;
use relayhub_protocols::{EventEmitter, TranscriptEntry};

#[derive(Default)]
struct RecordingEmitter {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingEmitter {
    fn payloads(&self) -> Vec<String> {
        self.events.lock().iter().map(|(_, p)| p.clone()).collect()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, event: &str, payload: &str) {
        self.events.lock().push((event.to_string(), payload.to_string()));
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.server.host = "127.0.0.1".to_string();
    config.server.port = 0;
    config.client.retry_interval_ms = 50;
    config.client.connect_timeout_ms = 2_000;
    config
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..250 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached within 5s");
}

async fn start_hub(config: &Config) -> (HubControl, Arc<RecordingEmitter>, String) {
    let emitter = Arc::new(RecordingEmitter::default());
    let hub = HubControl::new(config, emitter.clone());
    assert_eq!(hub.start().await, STATUS_OK);
    let addr = hub.local_addr().await.unwrap().to_string();
    (hub, emitter, addr)
}

#[tokio::test]
async fn test_single_client_round_trip() {
    let config = test_config();
    let (hub, hub_emitter, addr) = start_hub(&config).await;

    let alice_emitter = Arc::new(RecordingEmitter::default());
    let alice = ClientControl::new(&config, alice_emitter.clone());
    assert_eq!(alice.connect("alice", &addr).await, STATUS_OK);
    wait_until(|| hub.hub().registry().len() == 1).await;

    alice.send("alice", "hello").await;
    wait_until(|| !alice_emitter.events.lock().is_empty()).await;

    let entries = hub.hub().transcript().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].payload, "alice:hello");

    let expected = hub.hub().transcript().snapshot().unwrap();
    let received = alice_emitter.events.lock()[0].clone();
    assert_eq!(received, ("chat:update".to_string(), expected.clone()));

    wait_until(|| !hub_emitter.events.lock().is_empty()).await;
    assert_eq!(hub_emitter.payloads(), vec![expected]);

    assert_eq!(hub.stop().await, STATUS_OK);
}

#[tokio::test]
async fn test_two_clients_receive_identical_snapshot() {
    let config = test_config();
    let (hub, _hub_emitter, addr) = start_hub(&config).await;
    hub.hub()
        .on_message(&relayhub_protocols::ConnectionId::new(), "earlier")
        .unwrap();

    let a_emitter = Arc::new(RecordingEmitter::default());
    let b_emitter = Arc::new(RecordingEmitter::default());
    let a = ClientControl::new(&config, a_emitter.clone());
    let b = ClientControl::new(&config, b_emitter.clone());
    assert_eq!(a.connect("a", &addr).await, STATUS_OK);
    assert_eq!(b.connect("b", &addr).await, STATUS_OK);
    wait_until(|| hub.hub().registry().len() == 2).await;

    a.send("a", "ping").await;
    wait_until(|| !a_emitter.events.lock().is_empty() && !b_emitter.events.lock().is_empty()).await;

    let a_seen = a_emitter.payloads();
    let b_seen = b_emitter.payloads();
    assert_eq!(a_seen, b_seen);

    let transcript: Vec<TranscriptEntry> = serde_json::from_str(&a_seen[0]).unwrap();
    let payloads: Vec<_> = transcript.iter().map(|e| e.payload.as_str()).collect();
    assert_eq!(payloads, vec!["earlier", "a:ping"]);

    hub.stop().await;
}

#[tokio::test]
async fn test_reconnect_leaves_one_transport() {
    let config = test_config();
    let (hub, _hub_emitter, addr) = start_hub(&config).await;

    let client = ClientControl::new(&config, Arc::new(RecordingEmitter::default()));
    assert_eq!(client.connect("carol", &addr).await, STATUS_OK);
    wait_until(|| hub.hub().registry().len() == 1).await;
    let first: Vec<_> = hub.hub().registry().snapshot().iter().map(|h| h.id()).collect();

    assert_eq!(client.connect("carol", &addr).await, STATUS_OK);
    assert_eq!(client.session().state(), ClientSessionState::Connected);

    wait_until(|| {
        let live = hub.hub().registry().snapshot();
        live.len() == 1 && live[0].id() != first[0]
    })
    .await;

    hub.stop().await;
}

#[tokio::test]
async fn test_dead_peer_does_not_block_live_peers() {
    let config = test_config();
    let (hub, _hub_emitter, addr) = start_hub(&config).await;

    let live_emitter = Arc::new(RecordingEmitter::default());
    let live = ClientControl::new(&config, live_emitter.clone());
    assert_eq!(live.connect("live", &addr).await, STATUS_OK);
    wait_until(|| hub.hub().registry().len() == 1).await;

    // A peer whose writer is already gone
    let (dead, dead_rx) = ConnectionHandle::new(1);
    drop(dead_rx);
    hub.hub().registry().register(dead.clone());

    live.send("live", "hello").await;
    wait_until(|| !live_emitter.events.lock().is_empty()).await;

    assert!(dead.is_closed());
    assert!(!hub.hub().registry().contains(&dead.id()));
    assert_eq!(hub.hub().registry().len(), 1);
    assert!(live_emitter.payloads()[0].contains("live:hello"));
    assert_eq!(live.session().state(), ClientSessionState::Connected);

    hub.stop().await;
}

#[tokio::test]
async fn test_raw_peer_receives_broadcast() {
    let config = test_config();
    let (hub, _hub_emitter, addr) = start_hub(&config).await;

    let (mut raw, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
        .await
        .unwrap();
    raw.send(Message::Text("raw".to_string().into())).await.unwrap();
    wait_until(|| hub.hub().registry().len() == 1).await;

    let client = ClientControl::new(&config, Arc::new(RecordingEmitter::default()));
    assert_eq!(client.connect("eve", &addr).await, STATUS_OK);
    wait_until(|| hub.hub().registry().len() == 2).await;
    client.send("eve", "hi").await;

    let frame = tokio::time::timeout(Duration::from_secs(5), raw.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    let transcript: Vec<TranscriptEntry> =
        serde_json::from_str(frame.into_text().unwrap().as_str()).unwrap();
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].payload, "eve:hi");

    hub.stop().await;
}

#[tokio::test]
async fn test_hub_closing_connection_disconnects_client() {
    let config = test_config();
    let (hub, _hub_emitter, addr) = start_hub(&config).await;

    let client = ClientControl::new(&config, Arc::new(RecordingEmitter::default()));
    assert_eq!(client.connect("dave", &addr).await, STATUS_OK);
    wait_until(|| hub.hub().registry().len() == 1).await;

    for handle in hub.hub().registry().snapshot() {
        hub.hub().registry().unregister(&handle.id());
        handle.close();
    }

    let mut state = client.session().subscribe();
    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| *s == ClientSessionState::Disconnected),
    )
    .await
    .unwrap()
    .unwrap();

    hub.stop().await;
}
