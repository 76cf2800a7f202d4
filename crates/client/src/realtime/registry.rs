//! Subscriber registry: frame type → ordered set of callbacks.

use std::collections::HashMap;
use std::sync::Arc;

use gather_shared::ServerMessage;

/// A subscriber callback.
///
/// Identity is the `Arc` allocation: registering a clone of the same `Arc`
/// twice is a no-op, while two separately created closures are distinct.
pub type Subscriber = Arc<dyn Fn(&ServerMessage) + Send + Sync>;

/// Wrap a closure as a [`Subscriber`].
pub fn subscriber<F>(f: F) -> Subscriber
where
    F: Fn(&ServerMessage) + Send + Sync + 'static,
{
    Arc::new(f)
}

fn same_subscriber(a: &Subscriber, b: &Subscriber) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

#[derive(Default)]
pub struct SubscriptionRegistry {
    by_kind: HashMap<String, Vec<Subscriber>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the pair was already registered.
    pub fn subscribe(&mut self, kind: &str, callback: &Subscriber) -> bool {
        let subscribers = self.by_kind.entry(kind.to_string()).or_default();
        if subscribers.iter().any(|s| same_subscriber(s, callback)) {
            return false;
        }
        subscribers.push(Arc::clone(callback));
        true
    }

    /// Returns `false` if the pair was not registered.
    pub fn unsubscribe(&mut self, kind: &str, callback: &Subscriber) -> bool {
        let Some(subscribers) = self.by_kind.get_mut(kind) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|s| !same_subscriber(s, callback));
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            self.by_kind.remove(kind);
        }
        removed
    }

    /// Subscribers for `kind`, in registration order.
    pub fn snapshot(&self, kind: &str) -> Vec<Subscriber> {
        self.by_kind.get(kind).cloned().unwrap_or_default()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.by_kind.get(kind).map_or(0, Vec::len)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.by_kind.keys().map(String::as_str)
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
