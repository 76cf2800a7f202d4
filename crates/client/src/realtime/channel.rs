//! Push-socket connection with subscriber dispatch and auto-reconnect.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures_util::{SinkExt, StreamExt};
use gather_shared::{Frame, FrameError, ServerMessage};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::lifecycle::{Action, ConnectionState, Lifecycle, LifecycleEvent, ReconnectConfig};
use super::registry::{subscriber, Subscriber, SubscriptionRegistry};
use crate::storage::{load_auth_token, KeyValueStore};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("invalid push endpoint `{endpoint}`: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("push endpoint must use ws:// or wss://, got `{0}`")]
    UnsupportedScheme(String),
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

struct Driver {
    generation: u64,
    handle: JoinHandle<()>,
    stop: oneshot::Sender<()>,
}

struct Shared {
    endpoint: Url,
    reconnect: ReconnectConfig,
    store: Arc<dyn KeyValueStore>,
    registry: Mutex<SubscriptionRegistry>,
    /// Present only while a socket is open.
    outbound: Mutex<Option<UnboundedSender<Message>>>,
    driver: Mutex<Option<Driver>>,
    generations: AtomicU64,
    state: watch::Sender<ConnectionState>,
}

impl Shared {
    fn publish(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = ?previous, to = ?state, "realtime state changed");
        }
    }

    /// Endpoint plus the stored auth token, read fresh for every attempt.
    fn connect_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        if let Some(token) = load_auth_token(self.store.as_ref()) {
            url.query_pairs_mut().append_pair("token", &token);
        }
        url
    }

    fn set_outbound(&self, sender: Option<UnboundedSender<Message>>) {
        *lock(&self.outbound) = sender;
    }

    /// Runs `f` only while the driver of `generation` is still installed.
    /// A driver that was replaced or taken by `disconnect` must not touch
    /// the shared state any more.
    fn if_current(&self, generation: u64, f: impl FnOnce(&Self)) {
        let driver = lock(&self.driver);
        if driver.as_ref().is_some_and(|d| d.generation == generation) {
            f(self);
        }
    }

    fn dispatch(&self, text: &str) {
        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::warn!(%error, "dropping malformed realtime frame");
                return;
            }
        };

        let subscribers = lock(&self.registry).snapshot(&frame.kind);
        if subscribers.is_empty() {
            tracing::debug!(kind = %frame.kind, "no subscribers for realtime frame");
            return;
        }

        let message = match ServerMessage::from_frame(frame) {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%error, "dropping realtime frame with invalid payload");
                return;
            }
        };

        for callback in subscribers {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| callback(&message))) {
                tracing::error!(
                    kind = message.kind(),
                    panic = panic_message(payload.as_ref()),
                    "realtime subscriber panicked"
                );
            }
        }
    }
}

/// A single connection to the push endpoint.
///
/// Construct one per session and hand clones to whoever needs to subscribe;
/// all clones share the socket and the subscriber registry.
#[derive(Clone)]
pub struct RealtimeChannel {
    shared: Arc<Shared>,
}

impl RealtimeChannel {
    pub fn new(endpoint: &str, store: Arc<dyn KeyValueStore>) -> Result<Self, ChannelError> {
        Self::with_reconnect(endpoint, store, ReconnectConfig::default())
    }

    pub fn with_reconnect(
        endpoint: &str,
        store: Arc<dyn KeyValueStore>,
        reconnect: ReconnectConfig,
    ) -> Result<Self, ChannelError> {
        let url = Url::parse(endpoint).map_err(|source| ChannelError::InvalidEndpoint {
            endpoint: endpoint.to_string(),
            source,
        })?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(ChannelError::UnsupportedScheme(url.scheme().to_string()));
        }

        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Ok(Self {
            shared: Arc::new(Shared {
                endpoint: url,
                reconnect,
                store,
                registry: Mutex::new(SubscriptionRegistry::new()),
                outbound: Mutex::new(None),
                driver: Mutex::new(None),
                generations: AtomicU64::new(0),
                state,
            }),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.shared.endpoint
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Start connecting. A no-op while a connection (or a pending reconnect)
    /// is already being managed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self) {
        let mut driver = lock(&self.shared.driver);
        if driver.as_ref().is_some_and(|d| !d.handle.is_finished()) {
            tracing::debug!("realtime channel already running");
            return;
        }

        let mut lifecycle = Lifecycle::new(self.shared.reconnect);
        let action = lifecycle.handle(LifecycleEvent::Connect);
        self.shared.publish(lifecycle.state());

        let generation = self.shared.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let (stop, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(drive(
            self.shared.clone(),
            generation,
            lifecycle,
            action,
            stop_rx,
        ));
        *driver = Some(Driver {
            generation,
            handle,
            stop,
        });
    }

    /// Close the socket and cancel any pending reconnect.
    pub async fn disconnect(&self) {
        let driver = lock(&self.shared.driver).take();
        if let Some(Driver { handle, stop, .. }) = driver {
            let _ = stop.send(());
            if let Err(error) = handle.await {
                tracing::warn!(%error, "realtime driver ended abnormally");
            }
        }

        // A `connect()` issued while we waited owns the shared state now.
        let driver = lock(&self.shared.driver);
        if driver.is_none() {
            self.shared.set_outbound(None);
            self.shared.publish(ConnectionState::Disconnected);
        }
    }

    /// Register `callback` for frames of `kind`. Returns `false` if it was
    /// already registered.
    pub fn subscribe(&self, kind: &str, callback: &Subscriber) -> bool {
        lock(&self.shared.registry).subscribe(kind, callback)
    }

    /// Returns `false` if the pair was not registered.
    pub fn unsubscribe(&self, kind: &str, callback: &Subscriber) -> bool {
        lock(&self.shared.registry).unsubscribe(kind, callback)
    }

    /// Subscribe a closure and return its handle for a later `unsubscribe`.
    pub fn on<F>(&self, kind: &str, f: F) -> Subscriber
    where
        F: Fn(&ServerMessage) + Send + Sync + 'static,
    {
        let callback = subscriber(f);
        self.subscribe(kind, &callback);
        callback
    }

    /// Send `{type, payload}` if connected; otherwise drop it.
    ///
    /// Returns whether the frame was handed to the socket writer.
    pub fn send<P: Serialize + ?Sized>(&self, kind: &str, payload: &P) -> bool {
        if !self.state().is_connected() {
            tracing::debug!(kind, "realtime channel not connected, dropping frame");
            return false;
        }

        let text = match serde_json::to_value(payload)
            .map_err(FrameError::Malformed)
            .and_then(|payload| Frame::new(kind, payload).encode())
        {
            Ok(text) => text,
            Err(error) => {
                tracing::warn!(kind, %error, "failed to encode realtime frame");
                return false;
            }
        };

        match lock(&self.shared.outbound).as_ref() {
            Some(sender) => sender.unbounded_send(Message::text(text)).is_ok(),
            None => false,
        }
    }

    #[cfg(test)]
    pub(crate) fn dispatch_text(&self, text: &str) {
        self.shared.dispatch(text);
    }
}

enum SessionEnd {
    Closed,
    Stopped,
}

async fn drive(
    shared: Arc<Shared>,
    generation: u64,
    mut lifecycle: Lifecycle,
    mut action: Action,
    mut stop: oneshot::Receiver<()>,
) {
    loop {
        action = match action {
            Action::Dial => {
                tracing::info!(endpoint = %shared.endpoint, "connecting to push endpoint");
                let url = shared.connect_url();
                let dialed = tokio::select! {
                    _ = &mut stop => break,
                    result = connect_async(url.as_str()) => result,
                };

                match dialed {
                    Ok((stream, _response)) => {
                        let (sender, receiver) = unbounded();
                        lifecycle.handle(LifecycleEvent::Opened);
                        let state = lifecycle.state();
                        shared.if_current(generation, |shared| {
                            shared.set_outbound(Some(sender));
                            shared.publish(state);
                        });
                        tracing::info!(endpoint = %shared.endpoint, "push endpoint connected");

                        let end = run_session(&shared, stream, receiver, &mut stop).await;
                        shared.if_current(generation, |shared| shared.set_outbound(None));
                        if matches!(end, SessionEnd::Stopped) {
                            break;
                        }
                        lifecycle.handle(LifecycleEvent::Closed)
                    }
                    Err(error) => {
                        tracing::warn!(endpoint = %shared.endpoint, %error, "push endpoint connect failed");
                        lifecycle.handle(LifecycleEvent::Closed)
                    }
                }
            }
            Action::ScheduleReconnect(delay) => {
                tracing::info!(delay_ms = delay.as_millis() as u64, "reconnecting to push endpoint");
                tokio::select! {
                    _ = &mut stop => break,
                    () = tokio::time::sleep(delay) => {}
                }
                lifecycle.handle(LifecycleEvent::ReconnectDue)
            }
            Action::Idle => break,
        };
        let state = lifecycle.state();
        shared.if_current(generation, |shared| shared.publish(state));
    }

    lifecycle.handle(LifecycleEvent::Shutdown);
    let state = lifecycle.state();
    shared.if_current(generation, |shared| {
        shared.set_outbound(None);
        shared.publish(state);
    });
    tracing::info!(endpoint = %shared.endpoint, "realtime channel stopped");
}

async fn run_session(
    shared: &Shared,
    stream: WsStream,
    mut outbound: UnboundedReceiver<Message>,
    stop: &mut oneshot::Receiver<()>,
) -> SessionEnd {
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            _ = &mut *stop => {
                if let Err(error) = write.send(Message::Close(None)).await {
                    tracing::debug!(%error, "close frame not delivered");
                }
                return SessionEnd::Stopped;
            }
            Some(message) = outbound.next() => {
                if let Err(error) = write.send(message).await {
                    tracing::warn!(%error, "realtime send failed");
                    return SessionEnd::Closed;
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    tracing::debug!(len = text.len(), "realtime frame received");
                    shared.dispatch(text.as_str());
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "push endpoint closed the connection");
                    return SessionEnd::Closed;
                }
                // Pong is handled automatically by tungstenite; binary frames are not part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(error)) => {
                    tracing::warn!(%error, "realtime read error");
                    return SessionEnd::Closed;
                }
                None => return SessionEnd::Closed,
            },
        }
    }
}

#[cfg(test)]
#[path = "channel_test.rs"]
mod tests;
