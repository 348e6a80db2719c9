//! Connection lifecycle state.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::dispatch::{HandlerId, panic_message};

/// Lifecycle state of a [`BridgeClient`](crate::BridgeClient).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected.
    Disconnected,
    /// Transport handshake in progress.
    Connecting,
    /// Connected to the bridge.
    Connected,
    /// Waiting for the next automatic reconnect attempt.
    Reconnecting,
}

impl ConnectionState {
    /// Returns true if the connection is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns true if the client is between states (dialing or waiting
    /// to redial).
    #[must_use]
    pub fn is_transitioning(&self) -> bool {
        matches!(self, Self::Connecting | Self::Reconnecting)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}

pub(crate) type StateCallback = Arc<dyn Fn(ConnectionState) + Send + Sync>;

struct MachineInner {
    state: ConnectionState,
    observers: Vec<(HandlerId, StateCallback)>,
}

/// Owns the current [`ConnectionState`] and its observers.
///
/// The machine is the single writer of the state value. All transitions
/// for one connection epoch are driven from a single task at a time (the
/// caller during connect/disconnect, the supervisor otherwise), which is
/// what keeps observer notifications in transition order.
pub(crate) struct StateMachine {
    inner: Mutex<MachineInner>,
}

impl StateMachine {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(MachineInner {
                state: ConnectionState::Disconnected,
                observers: Vec::new(),
            }),
        }
    }

    /// The current state value.
    pub(crate) fn current(&self) -> ConnectionState {
        self.inner.lock().state
    }

    /// Moves to `next`, notifying observers synchronously in registration
    /// order. A no-op transition (same value) notifies nobody.
    ///
    /// Returns whether the value changed.
    pub(crate) fn transition(&self, next: ConnectionState) -> bool {
        let observers: Vec<StateCallback> = {
            let mut inner = self.inner.lock();
            if inner.state == next {
                return false;
            }
            tracing::debug!(from = %inner.state, to = %next, "connection state change");
            inner.state = next;
            inner.observers.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };

        for callback in &observers {
            notify(callback, next);
        }
        true
    }

    /// Registers an observer. It is first invoked with the current state,
    /// then added to the notification list — a new subscriber never
    /// misses the present state.
    pub(crate) fn subscribe(&self, callback: StateCallback) -> HandlerId {
        let current = self.current();
        notify(&callback, current);

        let id = HandlerId::next();
        self.inner.lock().observers.push((id, callback));
        id
    }

    /// Removes an observer. Returns whether it was registered.
    pub(crate) fn unsubscribe(&self, id: HandlerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.observers.len();
        inner.observers.retain(|(registered, _)| *registered != id);
        inner.observers.len() < before
    }
}

fn notify(callback: &StateCallback, state: ConnectionState) {
    if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(state))) {
        tracing::error!(
            state = %state,
            panic = %panic_message(&panic),
            "connection state observer panicked"
        );
    }
}
