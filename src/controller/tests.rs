use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_test::{assert_pending, task};
use url::Url;

use super::*;
#[allow(clippy::single_component_path_imports)]
use ::core;
use crate::error::{Error, Result};
use crate::identifiers::SessionId;
use crate::transport::{EventSink, Transport};

const WAIT: Duration = Duration::from_secs(2);

// ============================================================================
// Mock Transport
// ============================================================================

#[derive(Default)]
struct Counters {
    closes: usize,
    releases: usize,
}

/// Transport that records frames and lets the test play the server.
struct MockTransport {
    sink: Option<EventSink>,
    opens_tx: mpsc::UnboundedSender<(Url, EventSink)>,
    frames_tx: mpsc::UnboundedSender<String>,
    counters: Arc<Mutex<Counters>>,
}

/// Server side of a [`MockTransport`].
struct Remote {
    opens_rx: mpsc::UnboundedReceiver<(Url, EventSink)>,
    frames_rx: mpsc::UnboundedReceiver<String>,
    counters: Arc<Mutex<Counters>>,
}

impl Transport for MockTransport {
    fn open(&mut self, address: &Url, events: EventSink) -> Result<()> {
        self.sink = Some(events.clone());
        let _ = self.opens_tx.send((address.clone(), events));
        Ok(())
    }

    fn write_text(&mut self, text: String) -> Result<()> {
        if self.sink.is_none() {
            return Err(Error::ConnectionClosed);
        }
        let _ = self.frames_tx.send(text);
        Ok(())
    }

    fn close(&mut self) {
        self.counters.lock().closes += 1;
        if let Some(sink) = self.sink.take() {
            sink.disconnected(None);
        }
    }

    fn release(&mut self) {
        self.counters.lock().releases += 1;
        self.sink = None;
    }
}

impl Remote {
    async fn next_open(&mut self) -> (Url, EventSink) {
        timeout(WAIT, self.opens_rx.recv())
            .await
            .expect("open in time")
            .expect("transport alive")
    }

    async fn next_frame(&mut self) -> Value {
        let text = timeout(WAIT, self.frames_rx.recv())
            .await
            .expect("frame in time")
            .expect("transport alive");
        serde_json::from_str(&text).expect("frame is JSON")
    }

    fn no_frame(&mut self) -> bool {
        self.frames_rx.try_recv().is_err()
    }

    fn closes(&self) -> usize {
        self.counters.lock().closes
    }

    fn releases(&self) -> usize {
        self.counters.lock().releases
    }
}

fn mock() -> (MockTransport, Remote) {
    let (opens_tx, opens_rx) = mpsc::unbounded_channel();
    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let counters = Arc::new(Mutex::new(Counters::default()));

    let transport = MockTransport {
        sink: None,
        opens_tx,
        frames_tx,
        counters: Arc::clone(&counters),
    };
    let remote = Remote {
        opens_rx,
        frames_rx,
        counters,
    };
    (transport, remote)
}

fn controller() -> (Controller, Remote) {
    controller_with(Controller::builder())
}

fn controller_with(builder: ControllerBuilder) -> (Controller, Remote) {
    let (transport, remote) = mock();
    let controller = builder.transport(transport).build().expect("build");
    (controller, remote)
}

/// Connects and completes the handshake, returning the session sink.
async fn ready(controller: &Controller, remote: &mut Remote) -> EventSink {
    let handle = controller.connect("ws://chat.test/websocket").expect("connect");
    let (_, sink) = remote.next_open().await;

    sink.connected();
    let handshake = remote.next_frame().await;
    assert_eq!(handshake["msg"], "connect");

    sink.text(r#"{"msg":"connected","session":"s1"}"#);
    let outcome = timeout(WAIT, handle).await.expect("in time").expect("outcome");
    assert!(outcome.connected);
    sink
}

/// Sends a ping and waits for the pong, proving earlier events were processed.
async fn barrier(sink: &EventSink, remote: &mut Remote) {
    sink.text(r#"{"msg":"ping","id":"barrier"}"#);
    let pong = remote.next_frame().await;
    assert_eq!(pong, json!({"msg": "pong", "id": "barrier"}));
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_handshake_on_connected() {
    let (controller, mut remote) = controller();
    let handle = controller.connect("ws://chat.test/websocket").expect("connect");

    let (address, sink) = remote.next_open().await;
    assert_eq!(address.as_str(), "ws://chat.test/websocket");
    assert_eq!(controller.state(), ConnectionState::Connecting);
    assert_eq!(controller.address(), Some(address));

    sink.connected();
    let handshake = remote.next_frame().await;
    assert_eq!(handshake["msg"], "connect");
    assert_eq!(handshake["version"], "1");
    assert_eq!(handshake["support"], json!(["1", "pre2", "pre1"]));
    assert!(handshake["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(controller.state(), ConnectionState::Connecting);

    sink.text(r#"{"msg":"connected","session":"abc"}"#);
    let outcome = timeout(WAIT, handle).await.expect("in time").expect("outcome");

    assert!(outcome.connected);
    assert!(outcome.error.is_none());
    assert_eq!(outcome.session, sink.session());
    assert_eq!(controller.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn test_handshake_rejected() {
    let (controller, mut remote) = controller();
    let handle = controller.connect("ws://chat.test/websocket").expect("connect");
    let (_, sink) = remote.next_open().await;

    sink.connected();
    remote.next_frame().await;
    sink.text(r#"{"msg":"failed","version":"pre1"}"#);

    let outcome = timeout(WAIT, handle).await.expect("in time").expect("outcome");
    assert!(!outcome.connected);
    assert!(outcome.error.expect("reason").contains("pre1"));

    timeout(WAIT, controller.wait_for_state(ConnectionState::Closed))
        .await
        .expect("in time")
        .expect("closed");
    assert_eq!(remote.closes(), 1);
}

#[tokio::test]
async fn test_ping_answered_during_handshake() {
    let (controller, mut remote) = controller();
    let handle = controller.connect("ws://chat.test/websocket").expect("connect");
    let (_, sink) = remote.next_open().await;

    sink.connected();
    assert_eq!(remote.next_frame().await["msg"], "connect");

    sink.text(r#"{"msg":"ping","id":"early"}"#);
    assert_eq!(remote.next_frame().await, json!({"msg": "pong", "id": "early"}));
    assert_eq!(controller.state(), ConnectionState::Connecting);

    sink.text(r#"{"msg":"connected","session":"s1"}"#);
    let outcome = timeout(WAIT, handle).await.expect("in time").expect("outcome");
    assert!(outcome.connected);
    assert_eq!(controller.pending_count(), 0);
}

#[tokio::test]
async fn test_custom_handshake_versions() {
    let builder = Controller::builder()
        .protocol_version("pre2")
        .supported_versions(["pre2", "pre1"]);
    let (controller, mut remote) = controller_with(builder);

    let _handle = controller.connect("ws://chat.test/websocket").expect("connect");
    let (_, sink) = remote.next_open().await;
    sink.connected();

    let handshake = remote.next_frame().await;
    assert_eq!(handshake["version"], "pre2");
    assert_eq!(handshake["support"], json!(["pre2", "pre1"]));
}

// ============================================================================
// Requests
// ============================================================================

#[tokio::test]
async fn test_response_routed_exactly_once() {
    let (controller, mut remote) = controller();
    let sink = ready(&controller, &mut remote).await;

    let handle = controller
        .send(&json!({"msg": "method", "method": "login", "params": []}))
        .expect("send");
    let frame = remote.next_frame().await;
    let id = frame["id"].as_str().expect("id").to_owned();

    assert_eq!(id, handle.id().as_str());
    assert_eq!(frame["method"], "login");
    assert_eq!(controller.pending_count(), 1);

    let reply = json!({"msg": "result", "id": id, "result": {"token": "t"}}).to_string();
    sink.text(reply.clone());

    let response = timeout(WAIT, handle).await.expect("in time").expect("response");
    assert!(!response.is_error());
    assert_eq!(response.envelope().get("result"), Some(&json!({"token": "t"})));
    assert_eq!(response.session(), sink.session());
    assert_eq!(controller.pending_count(), 0);

    // Duplicate answer is discarded
    sink.text(reply);
    barrier(&sink, &mut remote).await;
    assert_eq!(controller.pending_count(), 0);
    assert_eq!(controller.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn test_error_response_delivered_to_caller() {
    let (controller, mut remote) = controller();
    let sink = ready(&controller, &mut remote).await;

    let handle = controller.send(&json!({"msg": "method", "method": "x"})).expect("send");
    let id = remote.next_frame().await["id"].clone();

    sink.text(json!({"msg": "result", "id": id, "error": {"reason": "denied"}}).to_string());

    let response = timeout(WAIT, handle).await.expect("in time").expect("delivered");
    assert!(response.is_error());
    let err = response.into_result().unwrap_err();
    assert!(matches!(err, Error::Application { .. }));
}

#[tokio::test]
async fn test_unknown_id_discarded() {
    let (controller, mut remote) = controller();
    let sink = ready(&controller, &mut remote).await;

    let handle = controller.send(&json!({"msg": "sub"})).expect("send");
    remote.next_frame().await;

    sink.text(r#"{"msg":"result","id":"never-sent"}"#);
    sink.text(r#"{"msg":"added","collection":"rooms"}"#);
    barrier(&sink, &mut remote).await;

    assert_eq!(controller.pending_count(), 1);
    let mut handle = task::spawn(handle);
    assert_pending!(handle.poll());
}

#[tokio::test]
async fn test_send_detached_registers_nothing() {
    let (controller, mut remote) = controller();
    let sink = ready(&controller, &mut remote).await;

    let id = controller
        .send_detached(&json!({"msg": "unsub", "name": "rooms"}))
        .expect("send");
    let frame = remote.next_frame().await;

    assert_eq!(frame["id"], id.as_str());
    assert_eq!(controller.pending_count(), 0);

    sink.text(json!({"msg": "nosub", "id": id.as_str()}).to_string());
    barrier(&sink, &mut remote).await;
}

#[tokio::test]
async fn test_send_requires_ready() {
    let (controller, mut remote) = controller();

    let err = controller.send(&json!({"msg": "sub"})).unwrap_err();
    assert!(matches!(
        err,
        Error::NotReady {
            state: ConnectionState::Idle
        }
    ));

    let _handle = controller.connect("ws://chat.test/websocket").expect("connect");
    remote.next_open().await;
    let err = controller.send_detached(&json!({"msg": "sub"})).unwrap_err();
    assert!(matches!(
        err,
        Error::NotReady {
            state: ConnectionState::Connecting
        }
    ));
}

#[tokio::test]
async fn test_send_queued_behind_disconnect_fails_not_ready() {
    let (controller, mut remote) = controller();
    ready(&controller, &mut remote).await;

    // Both commands are queued before the loop sees the disconnect
    let closing = controller.disconnect().expect("disconnect");
    let handle = controller.send(&json!({"msg": "sub"})).expect("send");

    let err = timeout(WAIT, handle).await.expect("in time").unwrap_err();
    let Error::NotReady { state } = err else {
        panic!("expected NotReady, got {err:?}");
    };
    assert_ne!(state, ConnectionState::Ready);
    assert_eq!(controller.pending_count(), 0);

    let outcome = timeout(WAIT, closing).await.expect("in time").expect("outcome");
    assert!(!outcome.connected);
    assert!(remote.no_frame());
}

#[tokio::test]
async fn test_encoding_error_returned() {
    let (controller, mut remote) = controller();
    let sink = ready(&controller, &mut remote).await;

    let err = controller.send(&json!(["not", "an", "object"])).unwrap_err();
    assert!(err.is_encoding_error());
    assert_eq!(controller.pending_count(), 0);

    barrier(&sink, &mut remote).await;
    assert!(remote.no_frame());
}

#[tokio::test]
async fn test_pending_limit() {
    let (controller, mut remote) = controller_with(Controller::builder().max_pending_requests(1));
    ready(&controller, &mut remote).await;

    let _first = controller.send(&json!({"msg": "sub"})).expect("send");
    remote.next_frame().await;

    let err = controller.send(&json!({"msg": "sub"})).unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }));
}

#[tokio::test]
async fn test_concurrent_sends_unique_ids() {
    let (controller, mut remote) = controller();
    ready(&controller, &mut remote).await;

    let mut tasks = Vec::new();
    for n in 0..50 {
        let controller = controller.clone();
        tasks.push(tokio::spawn(async move {
            controller
                .send(&json!({"msg": "method", "method": "n", "params": [n]}))
                .expect("send")
        }));
    }

    let mut handles = Vec::new();
    for task in tasks {
        handles.push(task.await.expect("join"));
    }

    let mut ids = std::collections::HashSet::new();
    for _ in 0..50 {
        let frame = remote.next_frame().await;
        assert!(ids.insert(frame["id"].as_str().expect("id").to_owned()));
    }

    assert_eq!(ids.len(), 50);
    assert_eq!(controller.pending_count(), 50);
    for handle in &handles {
        assert!(ids.contains(handle.id().as_str()));
    }
}

// ============================================================================
// Keepalive
// ============================================================================

#[tokio::test]
async fn test_ping_answered_with_pong() {
    let (controller, mut remote) = controller();
    let sink = ready(&controller, &mut remote).await;

    let _handle = controller.send(&json!({"msg": "sub"})).expect("send");
    remote.next_frame().await;

    sink.text(r#"{"msg":"ping"}"#);
    assert_eq!(remote.next_frame().await, json!({"msg": "pong"}));
    assert!(remote.no_frame());
    assert_eq!(controller.pending_count(), 1);
}

#[tokio::test]
async fn test_undecodable_frame_discarded() {
    let (controller, mut remote) = controller();
    let sink = ready(&controller, &mut remote).await;

    sink.text("{definitely not json");
    sink.text("[1, 2, 3]");
    sink.pong();
    barrier(&sink, &mut remote).await;

    assert_eq!(controller.state(), ConnectionState::Ready);
}

// ============================================================================
// Disconnect
// ============================================================================

#[tokio::test]
async fn test_transport_failure_while_connecting() {
    let (controller, mut remote) = controller();
    let handle = controller.connect("ws://chat.test/websocket").expect("connect");
    let (_, sink) = remote.next_open().await;

    sink.disconnected(Some("connection refused".into()));
    // Second disconnect does not refire anything
    sink.disconnected(None);

    let outcome = timeout(WAIT, handle).await.expect("in time").expect("outcome");
    assert!(!outcome.connected);
    assert_eq!(outcome.error.as_deref(), Some("connection refused"));

    timeout(WAIT, controller.wait_for_state(ConnectionState::Closed))
        .await
        .expect("in time")
        .expect("closed");
}

#[tokio::test]
async fn test_disconnect_abandons_pending_request() {
    let (controller, mut remote) = controller();
    let sink = ready(&controller, &mut remote).await;

    let mut handle = controller.send(&json!({"kind": "foo"})).expect("send");
    remote.next_frame().await;

    assert!(timeout(Duration::from_millis(50), &mut handle).await.is_err());

    sink.disconnected(Some("reset".into()));

    let result = timeout(WAIT, handle).await.expect("in time");
    assert!(result.unwrap_err().is_abandoned());
    assert_eq!(controller.pending_count(), 0);
    assert_eq!(controller.state(), ConnectionState::Closed);
}

#[tokio::test]
async fn test_disconnect_request() {
    let (controller, mut remote) = controller();
    ready(&controller, &mut remote).await;

    let outcome = timeout(WAIT, controller.disconnect().expect("disconnect"))
        .await
        .expect("in time")
        .expect("outcome");

    assert!(!outcome.connected);
    assert!(outcome.error.is_none());
    assert_eq!(controller.state(), ConnectionState::Closed);
    assert_eq!(remote.closes(), 1);
}

#[tokio::test]
async fn test_disconnect_when_idle_resolves_immediately() {
    let (controller, _remote) = controller();

    let outcome = timeout(WAIT, controller.disconnect().expect("disconnect"))
        .await
        .expect("in time")
        .expect("outcome");

    assert!(!outcome.connected);
    assert_eq!(outcome.session, SessionId::default());
}

// ============================================================================
// Reconnect
// ============================================================================

#[tokio::test]
async fn test_reconnect_replaces_session() {
    let (controller, mut remote) = controller();
    let old_sink = ready(&controller, &mut remote).await;

    let old_request = controller.send(&json!({"msg": "sub"})).expect("send");
    let old_id = remote.next_frame().await["id"].clone();

    let handle = controller.connect("ws://other.test/websocket").expect("connect");
    let (address, new_sink) = remote.next_open().await;
    assert_eq!(address.host_str(), Some("other.test"));
    assert_ne!(old_sink.session(), new_sink.session());
    assert!(remote.releases() >= 2);

    // Old request abandoned, old session silenced
    let result = timeout(WAIT, old_request).await.expect("in time");
    assert!(result.unwrap_err().is_abandoned());

    old_sink.text(json!({"msg": "result", "id": old_id}).to_string());
    old_sink.disconnected(Some("late".into()));

    new_sink.connected();
    assert_eq!(remote.next_frame().await["msg"], "connect");
    new_sink.text(r#"{"msg":"connected","session":"s2"}"#);

    let outcome = timeout(WAIT, handle).await.expect("in time").expect("outcome");
    assert!(outcome.connected);
    assert_eq!(outcome.session, new_sink.session());
    assert_eq!(controller.state(), ConnectionState::Ready);
}

#[tokio::test]
async fn test_connect_supersedes_pending_connect() {
    let (controller, mut remote) = controller();

    let first = controller.connect("ws://chat.test/websocket").expect("connect");
    remote.next_open().await;
    let _second = controller.connect("ws://chat.test/websocket").expect("connect");
    remote.next_open().await;

    let err = timeout(WAIT, first).await.expect("in time").unwrap_err();
    assert!(matches!(err, Error::Superseded));
}

#[tokio::test]
async fn test_secure_address_passed_to_transport() {
    let (controller, mut remote) = controller();

    let _handle = controller.connect("wss://chat.test/websocket").expect("connect");
    let (address, _) = remote.next_open().await;
    assert_eq!(address.scheme(), "wss");
}

#[tokio::test]
async fn test_invalid_address() {
    let (controller, _remote) = controller();

    for address in ["not a url", "http://chat.test", "tcp://chat.test:80"] {
        let err = controller.connect(address).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }), "{address}");
    }
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_shutdown_abandons_everything() {
    let (controller, mut remote) = controller();
    ready(&controller, &mut remote).await;

    let handle = controller.send(&json!({"msg": "sub"})).expect("send");
    remote.next_frame().await;

    controller.shutdown();

    let result = timeout(WAIT, handle).await.expect("in time");
    assert!(result.unwrap_err().is_abandoned());

    timeout(WAIT, controller.wait_for_state(ConnectionState::Closed))
        .await
        .expect("in time")
        .expect("closed");

    // Loop is gone
    tokio::task::yield_now().await;
    let err = timeout(WAIT, async {
        loop {
            match controller.connect("ws://chat.test/websocket") {
                Err(err) => break err,
                Ok(_) => tokio::task::yield_now().await,
            }
        }
    })
    .await
    .expect("in time");
    assert!(matches!(err, Error::ConnectionClosed));
}
