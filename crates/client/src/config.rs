//! Client configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::realtime::{ReconnectConfig, DEFAULT_RECONNECT_DELAY};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_WS_URL: &str = "ws://localhost:5000/ws";

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base address every API path is resolved against.
    pub api_url: String,
    /// Push endpoint, without the token query parameter.
    pub ws_url: String,
    pub reconnect: ReconnectConfig,
    /// Storage directory override; `None` means the platform config dir.
    pub storage_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            reconnect: ReconnectConfig::default(),
            storage_dir: None,
        }
    }
}

impl ClientConfig {
    /// Parse configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GATHER_API_URL`: API base address (default: "http://localhost:5000/api")
    /// - `GATHER_WS_URL`: push endpoint (default: "ws://localhost:5000/ws")
    /// - `GATHER_RECONNECT_DELAY_MS`: reconnect delay (default: 5000)
    /// - `GATHER_STORAGE_DIR`: token storage directory (default: platform config dir)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let reconnect = match lookup("GATHER_RECONNECT_DELAY_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => ReconnectConfig {
                    delay: Duration::from_millis(ms),
                },
                Err(_) => {
                    tracing::warn!(value = %raw, "ignoring invalid GATHER_RECONNECT_DELAY_MS");
                    ReconnectConfig {
                        delay: DEFAULT_RECONNECT_DELAY,
                    }
                }
            },
            None => defaults.reconnect,
        };

        Self {
            api_url: lookup("GATHER_API_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.api_url),
            ws_url: lookup("GATHER_WS_URL")
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.ws_url),
            reconnect,
            storage_dir: lookup("GATHER_STORAGE_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
