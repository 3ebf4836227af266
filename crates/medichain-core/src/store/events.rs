//! Change-notification fan-out.
//!
//! Every persist broadcasts the full current collection to all registered
//! listeners. Broadcast is advisory only: a panicking listener is isolated
//! and ignored, it never fails the write that triggered it.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::models::{ChangeEvent, MedicineRequest};

/// Observer of request-collection changes.
pub trait ChangeListener: Send + Sync {
    fn on_change(&self, event: &ChangeEvent);
}

/// Registered listeners for one store instance.
#[derive(Default)]
pub(crate) struct ListenerRegistry {
    listeners: Vec<Arc<dyn ChangeListener>>,
}

impl ListenerRegistry {
    pub fn subscribe(&mut self, listener: Arc<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    /// Notify all listeners, swallowing panics.
    pub fn broadcast(&self, requests: &[MedicineRequest]) {
        if self.listeners.is_empty() {
            return;
        }
        let event = ChangeEvent {
            requests: requests.to_vec(),
        };
        for listener in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| listener.on_change(&event))).is_err() {
                warn!("change listener panicked, ignoring");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Recorder {
        tag: &'static str,
        seen: Arc<Mutex<Vec<(&'static str, usize)>>>,
    }

    impl ChangeListener for Recorder {
        fn on_change(&self, event: &ChangeEvent) {
            self.seen.lock().unwrap().push((self.tag, event.requests.len()));
        }
    }

    struct Panicker;

    impl ChangeListener for Panicker {
        fn on_change(&self, _event: &ChangeEvent) {
            panic!("listener bug");
        }
    }

    #[test]
    fn test_broadcast_reaches_all_listeners() {
        let mut registry = ListenerRegistry::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            registry.subscribe(Arc::new(Recorder {
                tag,
                seen: Arc::clone(&seen),
            }));
        }

        registry.broadcast(&[]);
        assert_eq!(*seen.lock().unwrap(), vec![("a", 0), ("b", 0)]);
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let mut registry = ListenerRegistry::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        registry.subscribe(Arc::new(Panicker));
        registry.subscribe(Arc::new(Recorder {
            tag: "after",
            seen: Arc::clone(&seen),
        }));

        registry.broadcast(&[]);
        assert_eq!(*seen.lock().unwrap(), vec![("after", 0)]);
    }
}
