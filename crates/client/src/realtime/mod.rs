//! Realtime push channel.
//!
//! This module provides:
//! - A single managed WebSocket connection with auto-reconnect
//! - A registry routing inbound frames to subscribers by frame type
//! - Fire-and-forget outbound frames while connected
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               RealtimeChannel                │
//! │   (cloneable handle, owned by the caller)    │
//! └──────────────────────────────────────────────┘
//!        │ subscribe/unsubscribe        │ connect/send
//!        ▼                              ▼
//! ┌──────────────────────┐   ┌──────────────────────┐
//! │ SubscriptionRegistry │   │     driver task      │
//! │  type → [Subscriber] │◀──│  Lifecycle + socket  │
//! └──────────────────────┘   └──────────────────────┘
//!                                       │
//!                                       ▼
//!                          <endpoint>?token=<stored token>
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let channel = RealtimeChannel::new("wss://gather.example/ws", store)?;
//! let on_notice = channel.on("notification", |msg| {
//!     if let ServerMessage::Notification(n) = msg {
//!         println!("{}", n.message);
//!     }
//! });
//! channel.connect();
//! // ...
//! channel.unsubscribe("notification", &on_notice);
//! ```

mod channel;
mod lifecycle;
mod registry;

pub use channel::{ChannelError, RealtimeChannel};
pub use lifecycle::{
    Action, ConnectionState, Lifecycle, LifecycleEvent, ReconnectConfig, DEFAULT_RECONNECT_DELAY,
};
pub use registry::{subscriber, Subscriber, SubscriptionRegistry};
