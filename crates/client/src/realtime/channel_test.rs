use super::*;
use crate::storage::{save_auth_token, MemoryStore};
use gather_shared::{Notification, Severity};
use serde_json::json;

fn channel() -> RealtimeChannel {
    RealtimeChannel::new("ws://127.0.0.1:9/ws", Arc::new(MemoryStore::new())).unwrap()
}

fn counting(channel: &RealtimeChannel, kind: &str) -> (Subscriber, Arc<Mutex<Vec<ServerMessage>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback = channel.on(kind, move |msg| sink.lock().unwrap().push(msg.clone()));
    (callback, seen)
}

const HI: &str = r#"{"type":"notification","payload":{"message":"hi","severity":"info"}}"#;

#[test]
fn rejects_non_websocket_endpoints() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    assert!(matches!(
        RealtimeChannel::new("http://localhost/ws", store.clone()),
        Err(ChannelError::UnsupportedScheme(scheme)) if scheme == "http"
    ));
    assert!(matches!(
        RealtimeChannel::new("not a url", store),
        Err(ChannelError::InvalidEndpoint { .. })
    ));
}

#[test]
fn starts_disconnected() {
    assert_eq!(channel().state(), ConnectionState::Disconnected);
}

#[test]
fn connect_url_appends_stored_token() {
    let store = Arc::new(MemoryStore::new());
    let channel = RealtimeChannel::new("wss://push.gather.test/ws", store.clone()).unwrap();
    assert_eq!(channel.shared.connect_url().as_str(), "wss://push.gather.test/ws");

    save_auth_token(&*store, "abc 123");
    assert_eq!(
        channel.shared.connect_url().as_str(),
        "wss://push.gather.test/ws?token=abc+123"
    );
    // The configured endpoint itself is never modified.
    assert_eq!(channel.endpoint().as_str(), "wss://push.gather.test/ws");
}

#[test]
fn subscriber_receives_typed_payload_once() {
    let channel = channel();
    let (_callback, seen) = counting(&channel, "notification");

    channel.dispatch_text(HI);

    assert_eq!(
        *seen.lock().unwrap(),
        [ServerMessage::Notification(Notification {
            message: "hi".into(),
            severity: Severity::Info,
        })]
    );
}

#[test]
fn double_subscribe_dispatches_once() {
    let channel = channel();
    let (callback, seen) = counting(&channel, "notification");
    assert!(!channel.subscribe("notification", &callback));

    channel.dispatch_text(HI);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn unsubscribed_callback_is_not_invoked() {
    let channel = channel();
    let (callback, seen) = counting(&channel, "notification");

    assert!(channel.unsubscribe("notification", &callback));
    channel.dispatch_text(HI);
    assert!(seen.lock().unwrap().is_empty());

    assert!(!channel.unsubscribe("notification", &callback));
}

#[test]
fn frames_only_reach_matching_kind() {
    let channel = channel();
    let (_n, notifications) = counting(&channel, "notification");
    let (_e, deletions) = counting(&channel, "event.deleted");

    channel.dispatch_text(r#"{"type":"event.deleted","payload":{"id":"aB3dE9"}}"#);

    assert!(notifications.lock().unwrap().is_empty());
    assert_eq!(deletions.lock().unwrap().len(), 1);
}

#[test]
fn unknown_kinds_reach_their_subscribers() {
    let channel = channel();
    let (_cb, seen) = counting(&channel, "rsvp.opened");

    channel.dispatch_text(r#"{"type":"rsvp.opened","payload":{"seats":3}}"#);

    assert_eq!(
        *seen.lock().unwrap(),
        [ServerMessage::Unknown {
            kind: "rsvp.opened".into(),
            payload: json!({ "seats": 3 }),
        }]
    );
}

#[test]
fn malformed_frames_are_dropped() {
    let channel = channel();
    let (_cb, seen) = counting(&channel, "notification");

    channel.dispatch_text("not json");
    channel.dispatch_text(r#"{"payload":{"message":"no type"}}"#);
    channel.dispatch_text(r#"{"type":"notification","payload":{"severity":"info"}}"#);
    channel.dispatch_text(HI);

    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn callbacks_may_unsubscribe_during_dispatch() {
    let channel = channel();
    let hits = Arc::new(Mutex::new(0));
    let slot: Arc<Mutex<Option<Subscriber>>> = Arc::new(Mutex::new(None));

    let callback = {
        let inner = channel.clone();
        let hits = hits.clone();
        let slot = slot.clone();
        channel.on("notification", move |_| {
            *hits.lock().unwrap() += 1;
            if let Some(me) = slot.lock().unwrap().take() {
                inner.unsubscribe("notification", &me);
            }
        })
    };
    *slot.lock().unwrap() = Some(callback);

    channel.dispatch_text(HI);
    channel.dispatch_text(HI);
    assert_eq!(*hits.lock().unwrap(), 1);
}

#[test]
fn send_while_disconnected_is_silently_dropped() {
    let channel = channel();
    assert!(!channel.send("rsvp", &json!({ "eventId": "aB3dE9" })));
    assert_eq!(channel.state(), ConnectionState::Disconnected);
}

#[test]
fn panicking_subscriber_does_not_stop_dispatch() {
    let channel = channel();
    channel.on("notification", |_| panic!("subscriber failed"));
    let (_cb, seen) = counting(&channel, "notification");

    channel.dispatch_text(HI);
    channel.dispatch_text(HI);

    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn unrecognised_severity_still_reaches_subscribers() {
    let channel = channel();
    let (_cb, seen) = counting(&channel, "notification");

    channel.dispatch_text(
        r#"{"type":"notification","payload":{"message":"disk full","severity":"critical"}}"#,
    );

    assert_eq!(
        *seen.lock().unwrap(),
        [ServerMessage::Notification(Notification {
            message: "disk full".into(),
            severity: Severity::Other("critical".into()),
        })]
    );
}

#[tokio::test]
async fn connect_while_disconnecting_keeps_the_new_session() {
    // Accepts TCP but never answers the handshake, so a dial stays pending.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("ws://{}/ws", listener.local_addr().unwrap());
    let channel = RealtimeChannel::new(&endpoint, Arc::new(MemoryStore::new())).unwrap();

    channel.connect();
    let disconnecting = channel.disconnect();
    tokio::pin!(disconnecting);
    assert!(futures_util::poll!(disconnecting.as_mut()).is_pending());

    channel.connect();
    disconnecting.await;

    assert_eq!(channel.state(), ConnectionState::Connecting);
    assert!(lock(&channel.shared.driver)
        .as_ref()
        .is_some_and(|d| !d.handle.is_finished()));

    channel.disconnect().await;
    assert_eq!(channel.state(), ConnectionState::Disconnected);
    assert!(lock(&channel.shared.driver).is_none());
}
