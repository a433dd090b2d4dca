//! Listener registration with explicit unsubscribe handles.
//!
//! Both the scene's mutation hooks and the store's change notifications are
//! wired through [`ListenerSet`]. Registration returns a [`Subscription`];
//! calling [`Subscription::unsubscribe`] (or dropping it) detaches the
//! listener, so teardown is deterministic.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Handle returned at registration time. Unsubscribes on drop.
#[must_use = "dropping a Subscription detaches the listener immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    /// Detach the listener now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.is_active()).finish()
    }
}

/// Ordered set of listeners for events of type `E`.
pub struct ListenerSet<E> {
    inner: Arc<Mutex<Registry<E>>>,
}

struct Registry<E> {
    next_id: u64,
    listeners: Vec<(u64, Listener<E>)>,
}

impl<E: 'static> ListenerSet<E> {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Registry { next_id: 0, listeners: Vec::new() })) }
    }

    /// Register a listener. It stays attached until the returned handle is
    /// unsubscribed or dropped.
    pub fn register(&self, listener: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = registry.next_id;
            registry.next_id += 1;
            registry.listeners.push((id, Arc::new(listener)));
            id
        };

        let weak = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut registry = inner.lock().unwrap_or_else(PoisonError::into_inner);
                registry.listeners.retain(|(existing, _)| *existing != id);
            }
        })
    }

    /// Deliver `event` to every listener in registration order.
    ///
    /// The registry lock is released before listeners run, so a listener may
    /// register or unsubscribe without deadlocking.
    pub fn emit(&self, event: &E) {
        let listeners: Vec<Listener<E>> = {
            let registry = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            registry.listeners.iter().map(|(_, l)| Arc::clone(l)).collect()
        };
        for listener in listeners {
            listener(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<E: 'static> Default for ListenerSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for ListenerSet<E> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

#[cfg(test)]
#[path = "listener_test.rs"]
mod tests;
