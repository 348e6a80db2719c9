//! Bounded queue-and-poll adapter for the Eventline client.
//!
//! Embedding hosts that cannot take callbacks (scripting runtimes,
//! foreign-function layers, game loops) consume events by polling
//! instead: [`attach`] subscribes a queue to a client's wildcard stream,
//! and the host drains it at its own pace.
//!
//! The queue bounds memory by construction — once `capacity` events are
//! buffered, pushing another one discards the oldest. A host that stops
//! polling loses the oldest events, never the process.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use eventline::{BridgeClient, Event, HandlerId};

/// Capacity used by [`EventQueue::with_default_capacity`].
pub const DEFAULT_CAPACITY: usize = 1_000;

/// A thread-safe, bounded, drop-oldest event buffer.
pub struct EventQueue {
    events: Mutex<VecDeque<Event>>,
    capacity: usize,
}

impl EventQueue {
    /// Creates a queue bounded to `capacity` events. A capacity of zero
    /// is treated as 1.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Creates a queue with [`DEFAULT_CAPACITY`].
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// The configured bound.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an event, discarding the oldest buffered one when the
    /// queue is full.
    pub fn push(&self, event: Event) {
        let mut events = self.events.lock();
        if events.len() >= self.capacity {
            let dropped = events.pop_front();
            if let Some(dropped) = dropped {
                tracing::debug!(
                    event_type = dropped.event_type(),
                    capacity = self.capacity,
                    "queue full, discarding oldest event"
                );
            }
        }
        events.push_back(event);
    }

    /// Removes and returns the oldest buffered event.
    #[must_use]
    pub fn poll(&self) -> Option<Event> {
        self.events.lock().pop_front()
    }

    /// Removes and returns up to `max` events, oldest first.
    #[must_use]
    pub fn drain(&self, max: usize) -> Vec<Event> {
        let mut events = self.events.lock();
        let count = max.min(events.len());
        events.drain(..count).collect()
    }

    /// Number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }

    /// Discards all buffered events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

/// Feeds every event the client dispatches into `queue`.
///
/// Returns the wildcard [`HandlerId`]; pass it to [`detach`] to stop.
pub fn attach(client: &BridgeClient, queue: Arc<EventQueue>) -> HandlerId {
    client.on_any(move |event| queue.push(event.clone()))
}

/// Detaches a queue previously hooked up with [`attach`].
pub fn detach(client: &BridgeClient, id: HandlerId) -> bool {
    client.off_any(id)
}
