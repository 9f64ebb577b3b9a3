//! Listener registry for live fan-out
//!
//! A `ListenerSet<T>` holds callbacks in registration order. Publishing
//! delivers synchronously to the listeners registered when the publish
//! started; each delivery is isolated, so an error return or a panic in one
//! listener never reaches the publisher or the remaining listeners.
//!
//! Registration hands back a `Subscription`. Dropping it, or calling
//! `unsubscribe`, removes the listener, including from inside the
//! listener's own callback. The registry lock is never held while callbacks
//! run.
//!
//! Capacity: the set is unbounded and has no backpressure. Listener counts
//! are exposed for monitoring instead.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;
use tracing::{debug, error, warn};

/// Why a listener could not take a delivery
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The consumer behind the listener is gone
    #[error("listener disconnected")]
    Disconnected,

    /// Any other delivery failure
    #[error("listener failed: {0}")]
    Failed(String),
}

type Callback<T> = Arc<dyn Fn(&T) -> Result<(), ListenerError> + Send + Sync>;

/// Outcome of one publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

struct Registry<T> {
    entries: Mutex<Vec<(u64, Callback<T>)>>,
    next_id: AtomicU64,
}

impl<T> Registry<T> {
    fn entries(&self) -> MutexGuard<'_, Vec<(u64, Callback<T>)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

trait Deregister: Send + Sync {
    fn remove(&self, id: u64) -> bool;
}

impl<T> Deregister for Registry<T> {
    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }
}

/// Ordered set of listeners for one kind of record
pub struct ListenerSet<T> {
    name: &'static str,
    registry: Arc<Registry<T>>,
}

impl<T: 'static> ListenerSet<T> {
    /// `name` identifies the set in log output
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registry: Arc::new(Registry {
                entries: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener at the end of the delivery order
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let callback: Callback<T> = Arc::new(listener);
        let count = {
            let mut entries = self.registry.entries();
            entries.push((id, callback));
            entries.len()
        };
        debug!("{} listener {} registered ({} live)", self.name, id, count);

        let registry: Weak<Registry<T>> = Arc::downgrade(&self.registry);
        Subscription {
            id,
            name: self.name,
            registry,
        }
    }

    /// Deliver `item` to every listener registered at the start of the call
    pub fn publish(&self, item: &T) -> Delivery {
        let listeners: Vec<(u64, Callback<T>)> = self.registry.entries().clone();
        let mut delivery = Delivery::default();

        for (id, listener) in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| (*listener)(item))) {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(ListenerError::Disconnected)) => {
                    debug!("{} listener {} disconnected; skipping", self.name, id);
                    delivery.failed += 1;
                }
                Ok(Err(e)) => {
                    warn!("{} listener {} failed: {}", self.name, id, e);
                    delivery.failed += 1;
                }
                Err(_) => {
                    error!("{} listener {} panicked during delivery", self.name, id);
                    delivery.failed += 1;
                }
            }
        }

        delivery
    }

    /// Number of live listeners
    pub fn len(&self) -> usize {
        self.registry.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capability to deregister one listener
///
/// Deregisters on drop. Holding it inside a response stream ties the
/// listener's lifetime to the client connection.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    name: &'static str,
    registry: Weak<dyn Deregister>,
}

impl Subscription {
    /// Stop future deliveries; returns false if already unsubscribed
    pub fn unsubscribe(&self) -> bool {
        let removed = self
            .registry
            .upgrade()
            .map(|registry| registry.remove(self.id))
            .unwrap_or(false);
        if removed {
            debug!("{} listener {} unsubscribed", self.name, self.id);
        }
        removed
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
