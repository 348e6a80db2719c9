//! Event dispatch registry.
//!
//! Handlers are keyed by the wire discriminator (`"message"`, `"gift"`,
//! a custom type, …); wildcard handlers see every dispatched event after
//! the type-scoped ones. Delivery iterates a snapshot of the registered
//! handlers, so subscribing or unsubscribing from any thread — including
//! from inside a handler — never corrupts an in-flight dispatch.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use eventline_protocol::Event;

/// Token returned by a subscription, used to remove that handler again.
///
/// Closures have no usable identity in Rust, so removal works through
/// this token instead of by reference; duplicate registrations of the
/// same closure get distinct tokens and are removable individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

impl HandlerId {
    pub(crate) fn next() -> Self {
        Self(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct RegistryInner {
    typed: HashMap<String, Vec<(HandlerId, EventCallback)>>,
    wildcard: Vec<(HandlerId, EventCallback)>,
}

/// Registry of event handlers, shared between the public client handle
/// and the receive loop.
#[derive(Default)]
pub(crate) struct HandlerRegistry {
    inner: Mutex<RegistryInner>,
}

impl HandlerRegistry {
    /// Registers a handler for one discriminator. Invocation order is
    /// registration order.
    pub(crate) fn on(&self, event_type: &str, callback: EventCallback) -> HandlerId {
        let id = HandlerId::next();
        self.inner
            .lock()
            .typed
            .entry(event_type.to_owned())
            .or_default()
            .push((id, callback));
        id
    }

    /// Removes a type-scoped handler. Returns whether it was registered.
    pub(crate) fn off(&self, event_type: &str, id: HandlerId) -> bool {
        let mut inner = self.inner.lock();
        let Some(handlers) = inner.typed.get_mut(event_type) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(registered, _)| *registered != id);
        let removed = handlers.len() < before;
        if handlers.is_empty() {
            inner.typed.remove(event_type);
        }
        removed
    }

    /// Registers a wildcard handler, invoked for every dispatched event
    /// after the type-scoped handlers.
    pub(crate) fn on_any(&self, callback: EventCallback) -> HandlerId {
        let id = HandlerId::next();
        self.inner.lock().wildcard.push((id, callback));
        id
    }

    /// Removes a wildcard handler. Returns whether it was registered.
    pub(crate) fn off_any(&self, id: HandlerId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.wildcard.len();
        inner.wildcard.retain(|(registered, _)| *registered != id);
        inner.wildcard.len() < before
    }

    /// Delivers an event to every matching handler.
    ///
    /// Handlers run synchronously on the calling task, type-scoped first
    /// then wildcard, each list in registration order. A panicking
    /// handler is caught and logged; delivery continues with the rest.
    pub(crate) fn dispatch(&self, event: &Event) {
        let (typed, wildcard) = {
            let inner = self.inner.lock();
            let typed: Vec<EventCallback> = inner
                .typed
                .get(event.event_type())
                .map(|handlers| handlers.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default();
            let wildcard: Vec<EventCallback> =
                inner.wildcard.iter().map(|(_, cb)| Arc::clone(cb)).collect();
            (typed, wildcard)
        };

        for callback in typed.iter().chain(wildcard.iter()) {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| callback(event))) {
                tracing::error!(
                    event_type = event.event_type(),
                    panic = %panic_message(&panic),
                    "event handler panicked"
                );
            }
        }
    }
}

/// Best-effort extraction of a panic payload's message.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eventline_protocol::Ping;

    fn ping() -> Event {
        Event::Ping(Ping::default())
    }

    fn recording(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> EventCallback {
        let log = Arc::clone(log);
        Arc::new(move |_event| log.lock().push(tag))
    }

    #[test]
    fn test_typed_then_wildcard_in_registration_order() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.on_any(recording(&log, "any-1"));
        registry.on("ping", recording(&log, "typed-1"));
        registry.on("ping", recording(&log, "typed-2"));
        registry.on_any(recording(&log, "any-2"));

        registry.dispatch(&ping());
        assert_eq!(*log.lock(), vec!["typed-1", "typed-2", "any-1", "any-2"]);
    }

    #[test]
    fn test_off_removes_only_the_given_registration() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = registry.on("ping", recording(&log, "first"));
        registry.on("ping", recording(&log, "second"));

        assert!(registry.off("ping", first));
        assert!(!registry.off("ping", first), "second removal is a no-op");

        registry.dispatch(&ping());
        assert_eq!(*log.lock(), vec!["second"]);
    }

    #[test]
    fn test_off_unknown_type_returns_false() {
        let registry = HandlerRegistry::default();
        assert!(!registry.off("nope", HandlerId::next()));
    }

    #[test]
    fn test_duplicate_closures_are_removable_individually() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        let callback = recording(&log, "dup");
        let a = registry.on("ping", Arc::clone(&callback));
        let _b = registry.on("ping", callback);

        registry.off("ping", a);
        registry.dispatch(&ping());
        assert_eq!(*log.lock(), vec!["dup"]);
    }

    #[test]
    fn test_panicking_handler_does_not_stop_delivery() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.on("ping", Arc::new(|_| panic!("boom")));
        registry.on("ping", recording(&log, "survivor"));
        registry.on_any(recording(&log, "any"));

        registry.dispatch(&ping());
        assert_eq!(*log.lock(), vec!["survivor", "any"]);

        // Subsequent events still flow.
        registry.dispatch(&ping());
        assert_eq!(*log.lock(), vec!["survivor", "any", "survivor", "any"]);
    }

    #[test]
    fn test_handler_may_mutate_registry_during_dispatch() {
        let registry = Arc::new(HandlerRegistry::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let registry_clone = Arc::clone(&registry);
        let log_clone = Arc::clone(&log);
        registry.on(
            "ping",
            Arc::new(move |_| {
                // Subscribing mid-dispatch must not deadlock or corrupt
                // the snapshot being iterated.
                let log_inner = Arc::clone(&log_clone);
                registry_clone.on_any(Arc::new(move |_| log_inner.lock().push("late")));
            }),
        );

        registry.dispatch(&ping());
        assert!(log.lock().is_empty(), "late handler missed the in-flight event");

        // One wildcard was registered during the first dispatch; it sees
        // the second event (while the typed handler registers another).
        registry.dispatch(&ping());
        assert_eq!(log.lock().len(), 1);

        registry.dispatch(&ping());
        assert_eq!(log.lock().len(), 3);
    }

    #[test]
    fn test_dispatch_routes_by_generic_discriminator() {
        let registry = HandlerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.on("superchat", recording(&log, "superchat"));
        registry.on("message", recording(&log, "message"));

        let event = Event::Generic(eventline_protocol::Generic {
            event_type: "superchat".into(),
            ..Default::default()
        });
        registry.dispatch(&event);
        assert_eq!(*log.lock(), vec!["superchat"]);
    }
}
