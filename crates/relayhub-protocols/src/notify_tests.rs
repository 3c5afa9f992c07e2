use super::*;

use parking_lot::Mutex;

#[derive(Default)]
struct RecordingEmitter {
    events: Mutex<Vec<(String, String)>>,
}

impl EventEmitter for RecordingEmitter {
    fn emit(&self, event: &str, payload: &str) {
        self.events.lock().push((event.to_string(), payload.to_string()));
    }
}

#[test]
fn test_relay_sink_event_name() {
    let (sink, _rx) = RelaySink::channel(DEFAULT_EVENT, 4);
    assert_eq!(sink.event(), "chat:update");
}

#[tokio::test]
async fn test_relay_sink_queues_in_order() {
    let (sink, mut rx) = RelaySink::channel("e", 4);
    sink.try_deliver("one").unwrap();
    sink.try_deliver("two").unwrap();

    assert_eq!(rx.recv().await.unwrap(), "one");
    assert_eq!(rx.recv().await.unwrap(), "two");
}

#[test]
fn test_relay_sink_drops_when_full() {
    let (sink, _rx) = RelaySink::channel("e", 2);
    sink.try_deliver("a").unwrap();
    sink.try_deliver("b").unwrap();

    assert_eq!(sink.try_deliver("c"), Err(SinkError::Full));
    // The trait entry point swallows the drop
    sink.deliver("d");
}

#[test]
fn test_relay_sink_reports_closed() {
    let (sink, rx) = RelaySink::channel("e", 2);
    drop(rx);
    assert_eq!(sink.try_deliver("a"), Err(SinkError::Closed));
}

#[test]
fn test_zero_capacity_is_raised() {
    let (sink, _rx) = RelaySink::channel("e", 0);
    assert!(sink.try_deliver("a").is_ok());
    assert_eq!(sink.try_deliver("b"), Err(SinkError::Full));
}

#[tokio::test]
async fn test_forwarder_emits_and_exits_on_close() {
    let emitter = Arc::new(RecordingEmitter::default());
    let (sink, task) = RelaySink::spawn("chat:update", 10, emitter.clone());

    sink.deliver("[1]");
    sink.deliver("[1,2]");
    drop(sink);

    task.await.unwrap();
    let events = emitter.events.lock().clone();
    assert_eq!(
        events,
        vec![
            ("chat:update".to_string(), "[1]".to_string()),
            ("chat:update".to_string(), "[1,2]".to_string()),
        ]
    );
}
