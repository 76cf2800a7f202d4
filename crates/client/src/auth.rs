//! Bearer-token sources for outbound requests.

use std::sync::Arc;

use crate::storage::{load_auth_token, KeyValueStore};

/// Anything that can report the current bearer token.
///
/// Called once per outbound request; it must answer immediately.
pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

impl<F> TokenProvider for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn token(&self) -> Option<String> {
        self()
    }
}

/// A fixed token, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads the token the login flow persisted, on every call.
#[derive(Clone)]
pub struct StoredToken {
    store: Arc<dyn KeyValueStore>,
}

impl StoredToken {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

impl TokenProvider for StoredToken {
    fn token(&self) -> Option<String> {
        load_auth_token(self.store.as_ref())
    }
}

/// Header value for `token`, or `None` when it is absent or empty.
pub(crate) fn bearer_value(provider: &dyn TokenProvider) -> Option<String> {
    provider
        .token()
        .filter(|token| !token.is_empty())
        .map(|token| format!("Bearer {token}"))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
