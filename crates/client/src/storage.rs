//! Persistent key-value storage.
//!
//! Values are stored as JSON:
//! - [`FileStore`]: one JSON file per key in a directory. The default location
//!   is the platform-appropriate config directory:
//!   - Linux: `~/.config/gather/`
//!   - macOS: `~/Library/Application Support/gather/`
//!   - Windows: `%APPDATA%\gather\`
//! - [`MemoryStore`]: process-local map, used by tests and embedders.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{de::DeserializeOwned, Serialize};

/// Key under which the login flow stores the bearer token.
pub const AUTH_TOKEN_KEY: &str = "token";

/// Raw string storage keyed by name.
pub trait KeyValueStore: Send + Sync {
    fn load_raw(&self, key: &str) -> Option<String>;

    /// Returns `true` if the write succeeded.
    fn save_raw(&self, key: &str, value: &str) -> bool;

    fn remove(&self, key: &str);

    fn exists(&self, key: &str) -> bool {
        self.load_raw(key).is_some()
    }
}

/// Save a value to storage.
///
/// Returns `true` if the operation succeeded.
pub fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> bool {
    match serde_json::to_string(value) {
        Ok(json) => store.save_raw(key, &json),
        Err(_) => false,
    }
}

/// Load a value from storage.
///
/// Returns `None` if the key doesn't exist or deserialization fails.
pub fn load<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    let json = store.load_raw(key)?;
    serde_json::from_str(&json).ok()
}

/// Stored auth token, if one is present and non-empty.
pub fn load_auth_token(store: &dyn KeyValueStore) -> Option<String> {
    load::<String>(store, AUTH_TOKEN_KEY).filter(|token| !token.is_empty())
}

pub fn save_auth_token(store: &dyn KeyValueStore, token: &str) -> bool {
    save(store, AUTH_TOKEN_KEY, &token)
}

pub fn clear_auth_token(store: &dyn KeyValueStore) {
    store.remove(AUTH_TOKEN_KEY);
}

// =========================================
// File-backed implementation
// =========================================

#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted in the platform config directory, if one exists.
    pub fn default_location() -> Option<Self> {
        let config_dir = dirs::config_dir()?;
        Some(Self::new(config_dir.join("gather")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, key: &str) -> PathBuf {
        // Sanitize key to be a valid filename
        let safe_key = key.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_");
        self.dir.join(format!("{safe_key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn load_raw(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.file_path(key)).ok()
    }

    fn save_raw(&self, key: &str, value: &str) -> bool {
        if !self.dir.exists() && std::fs::create_dir_all(&self.dir).is_err() {
            tracing::warn!(dir = %self.dir.display(), "failed to create storage directory");
            return false;
        }
        std::fs::write(self.file_path(key), value).is_ok()
    }

    fn remove(&self, key: &str) {
        let _ = std::fs::remove_file(self.file_path(key));
    }
}

// =========================================
// In-memory implementation
// =========================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn load_raw(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn save_raw(&self, key: &str, value: &str) -> bool {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        true
    }

    fn remove(&self, key: &str) {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
