//! Gather Client - networking layer for the Gather event app
//!
//! Two independent pieces:
//! - [`ApiClient`]: REST calls with bearer-token injection and a single
//!   error observer for every transport failure.
//! - [`RealtimeChannel`]: push socket with typed frame dispatch to
//!   subscribers and fixed-delay auto-reconnect.

pub mod api_client;
pub mod auth;
pub mod config;
pub mod realtime;
pub mod storage;

pub use api_client::{ApiClient, ApiResponse, ErrorObserver, LogErrors, RequestConfig};
pub use auth::{StaticToken, StoredToken, TokenProvider};
pub use config::ClientConfig;
pub use realtime::{ConnectionState, RealtimeChannel, ReconnectConfig, Subscriber};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
