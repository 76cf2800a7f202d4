//! Gather Client - command-line entry point
//!
//! Lists upcoming events, then stays connected to the push endpoint and logs
//! notifications and event changes until interrupted.

use std::sync::Arc;

use anyhow::{Context, Result};
use gather_client::realtime::RealtimeChannel;
use gather_client::{ApiClient, ClientConfig, FileStore, KeyValueStore, LogErrors, RequestConfig, StoredToken};
use gather_shared::{kinds, ServerMessage, Severity};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("gather_client=debug")),
        )
        .init();

    let config = ClientConfig::from_env();
    let store = match &config.storage_dir {
        Some(dir) => FileStore::new(dir),
        None => FileStore::default_location().context("no config directory for token storage")?,
    };
    tracing::info!(dir = %store.dir().display(), "using token storage");
    let store: Arc<dyn KeyValueStore> = Arc::new(store);

    let api = ApiClient::new(RequestConfig::new(
        config.api_url.clone(),
        StoredToken::new(store.clone()),
        LogErrors,
    ));

    tracing::debug!(base_url = api.base_url(), "api client ready");
    match api.list_events().await {
        Ok(events) => {
            tracing::info!(count = events.len(), "loaded events");
            for event in &events {
                tracing::info!(id = %event.id, title = %event.title, starts_at = %event.starts_at, "event");
            }
        }
        // Already logged by the error observer.
        Err(error) => tracing::debug!(%error, "event listing unavailable"),
    }

    let channel = RealtimeChannel::with_reconnect(&config.ws_url, store, config.reconnect)
        .with_context(|| format!("invalid GATHER_WS_URL `{}`", config.ws_url))?;

    let notifications = channel.on(kinds::NOTIFICATION, |msg| {
        if let ServerMessage::Notification(n) = msg {
            match &n.severity {
                Severity::Error => tracing::error!(message = %n.message, "notification"),
                Severity::Warning => tracing::warn!(message = %n.message, "notification"),
                Severity::Info | Severity::Success => tracing::info!(message = %n.message, "notification"),
                Severity::Other(level) => tracing::info!(message = %n.message, %level, "notification"),
            }
        }
    });
    let changes = channel.on(kinds::EVENT_CREATED, log_event_change);
    channel.subscribe(kinds::EVENT_UPDATED, &changes);
    channel.subscribe(kinds::EVENT_DELETED, &changes);

    channel.connect();
    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    channel.unsubscribe(kinds::NOTIFICATION, &notifications);
    channel.disconnect().await;
    Ok(())
}

fn log_event_change(msg: &ServerMessage) {
    match msg {
        ServerMessage::EventCreated(event) => tracing::info!(id = %event.id, title = %event.title, "event created"),
        ServerMessage::EventUpdated(event) => tracing::info!(id = %event.id, title = %event.title, "event updated"),
        ServerMessage::EventDeleted { id } => tracing::info!(%id, "event deleted"),
        other => tracing::debug!(kind = other.kind(), "ignored realtime message"),
    }
}
