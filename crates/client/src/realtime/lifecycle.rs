//! Connection state machine for the realtime channel.
//!
//! Pure bookkeeping: it owns no socket and no timer. The driver task feeds it
//! [`LifecycleEvent`]s and performs the [`Action`] it returns.

use std::time::Duration;

/// Default wait between a close and the next connect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(5000);

/// Connection state for the push socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// Reconnect behavior: a fixed delay, retried forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    pub delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Caller asked to connect.
    Connect,
    /// Transport reported open.
    Opened,
    /// Transport closed, errored, or the dial failed.
    Closed,
    /// The scheduled reconnect delay elapsed.
    ReconnectDue,
    /// Caller asked to stop for good.
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Open a new socket.
    Dial,
    /// Wait this long, then deliver `ReconnectDue`.
    ScheduleReconnect(Duration),
    /// Nothing to do.
    Idle,
}

#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ConnectionState,
    reconnect: ReconnectConfig,
    reconnect_pending: bool,
    stopped: bool,
}

impl Lifecycle {
    pub fn new(reconnect: ReconnectConfig) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect,
            reconnect_pending: false,
            stopped: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn handle(&mut self, event: LifecycleEvent) -> Action {
        use ConnectionState::*;

        match (self.state, event) {
            (_, LifecycleEvent::Shutdown) => {
                self.state = Disconnected;
                self.reconnect_pending = false;
                self.stopped = true;
                Action::Idle
            }
            (Disconnected, LifecycleEvent::Connect) => {
                self.stopped = false;
                self.reconnect_pending = false;
                self.state = Connecting;
                Action::Dial
            }
            (Disconnected, LifecycleEvent::ReconnectDue) if self.reconnect_pending && !self.stopped => {
                self.reconnect_pending = false;
                self.state = Connecting;
                Action::Dial
            }
            (Connecting, LifecycleEvent::Opened) => {
                self.state = Connected;
                Action::Idle
            }
            (Connecting | Connected, LifecycleEvent::Closed) => {
                self.state = Disconnected;
                if self.stopped {
                    return Action::Idle;
                }
                self.reconnect_pending = true;
                Action::ScheduleReconnect(self.reconnect.delay)
            }
            // Already connecting/connected, a stale timer, or a duplicate close.
            _ => Action::Idle,
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod tests;
