use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Callback registered with a [`Listeners`] registry.
pub type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Fan-out registry of event handlers.
///
/// Handlers are invoked outside the registry lock, so a handler may
/// subscribe, unsubscribe or trigger further notifications.
pub struct Listeners<E> {
    registry: Arc<Mutex<Registry<E>>>,
}

struct Registry<E> {
    next_id: u64,
    handlers: Vec<(u64, Handler<E>)>,
}

impl<E> Default for Listeners<E> {
    fn default() -> Self {
        Self { registry: Arc::new(Mutex::new(Registry { next_id: 0, handlers: Vec::new() })) }
    }
}

impl<E> Clone for Listeners<E> {
    fn clone(&self) -> Self {
        Self { registry: Arc::clone(&self.registry) }
    }
}

impl<E: 'static> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}

impl<E: 'static> Listeners<E> {
    pub fn subscribe(&self, handler: impl Fn(&E) + Send + Sync + 'static) -> Subscription {
        let id = {
            let mut registry = lock(&self.registry);
            let id = registry.next_id;
            registry.next_id += 1;
            let handler: Handler<E> = Arc::new(handler);
            registry.handlers.push((id, handler));
            id
        };

        let registry: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                lock(&registry).handlers.retain(|(existing, _)| *existing != id);
            }
        })
    }

    /// Deliver `event` to every handler registered at the time of the call.
    pub fn notify(&self, event: &E) {
        let handlers: Vec<Handler<E>> =
            lock(&self.registry).handlers.iter().map(|(_, handler)| Arc::clone(handler)).collect();
        for handler in handlers {
            handler(event);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        lock(&self.registry).handlers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock<E>(registry: &Mutex<Registry<E>>) -> MutexGuard<'_, Registry<E>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle returned by subscription methods. Dropping it leaves the handler
/// registered; call [`Subscription::unsubscribe`] to remove it.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub(crate) fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self { cancel: Some(Box::new(cancel)) }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("active", &self.cancel.is_some()).finish()
    }
}
