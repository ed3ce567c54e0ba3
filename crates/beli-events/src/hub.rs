//! The observer registry and fan-out.
//!
//! [`NotificationHub`] owns the set of connected observers. Callers can
//! register and unregister observers but never iterate the set; only
//! [`NotificationHub::broadcast`] walks it.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use beli_types::{ChangeEvent, ObserverId};
use tracing::{debug, warn};

use crate::observer::Observer;

/// Registry of connected observers.
#[derive(Default)]
pub struct NotificationHub {
    observers: RwLock<BTreeMap<ObserverId, Arc<dyn Observer>>>,
}

impl NotificationHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer.
    ///
    /// Registering an id that is already present keeps the existing
    /// observer and returns `false`.
    pub fn register(&self, id: ObserverId, observer: Arc<dyn Observer>) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if observers.contains_key(&id) {
            return false;
        }
        observers.insert(id, observer);
        debug!(%id, total = observers.len(), "Observer registered");
        true
    }

    /// Remove an observer. Unknown ids are ignored.
    ///
    /// Returns `true` if the observer was registered.
    pub fn unregister(&self, id: ObserverId) -> bool {
        let mut observers = self
            .observers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let removed = observers.remove(&id).is_some();
        if removed {
            debug!(%id, total = observers.len(), "Observer unregistered");
        }
        removed
    }

    /// True if `id` is currently registered.
    pub fn is_registered(&self, id: ObserverId) -> bool {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&id)
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Send `event` as `"<offset>,<color>"` to every registered observer.
    ///
    /// Each observer is tried independently. Observers that fail are
    /// unregistered after the pass; the others still receive the frame.
    /// Returns the number of successful deliveries.
    pub fn broadcast(&self, event: &ChangeEvent) -> usize {
        let frame: Arc<str> = Arc::from(event.to_frame());

        // Deliver outside the lock so register/unregister never wait on a
        // fan-out pass.
        let targets: Vec<(ObserverId, Arc<dyn Observer>)> = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, observer)| (*id, Arc::clone(observer)))
            .collect();

        let mut delivered: usize = 0;
        let mut failed = Vec::new();
        for (id, observer) in targets {
            match observer.deliver(Arc::clone(&frame)) {
                Ok(()) => delivered = delivered.saturating_add(1),
                Err(e) => {
                    warn!(%id, error = %e, "Dropping observer after failed delivery");
                    failed.push(id);
                }
            }
        }

        for id in failed {
            self.unregister(id);
        }

        delivered
    }
}
