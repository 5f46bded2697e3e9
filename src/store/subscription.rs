//! Listener registration and disposal.
//!
//! DESIGN
//! ======
//! Every registration facility in the crate (store listeners, host push
//! listeners) hands back a [`Subscription`]. Disposal is idempotent and also
//! runs on drop, so a binding torn down while unwinding still releases its
//! listener. `ListenerSet` keeps entries in registration order and hands out
//! snapshots, so a listener added mid-notification never sees the in-flight
//! notification.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

#[cfg(test)]
#[path = "subscription_test.rs"]
mod tests;

type Disposer = Box<dyn FnOnce() + Send>;

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Disposer returned by a listener registration.
///
/// Dropping the subscription unregisters the listener. Use [`detach`] to keep
/// the listener alive for as long as the registry lives.
///
/// [`detach`]: Subscription::detach
#[must_use = "dropping a Subscription unregisters its listener; call `detach` to keep it"]
pub struct Subscription {
    disposer: Mutex<Option<Disposer>>,
}

impl Subscription {
    pub fn new(disposer: impl FnOnce() + Send + 'static) -> Self {
        Self { disposer: Mutex::new(Some(Box::new(disposer))) }
    }

    /// A subscription with nothing to dispose.
    pub fn empty() -> Self {
        Self { disposer: Mutex::new(None) }
    }

    /// Unregister the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        let disposer = self
            .disposer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(dispose) = disposer {
            dispose();
        }
    }

    /// Whether the listener is still registered through this handle.
    pub fn is_active(&self) -> bool {
        self.disposer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Give up the disposer without running it.
    pub fn detach(self) {
        self.disposer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

// =============================================================================
// LISTENER SET
// =============================================================================

/// Ordered registry of shared listeners.
///
/// `L` is usually a trait object (`dyn Fn(&T) + Send + Sync` or a push-event
/// trait). Cloning the set shares the same registry.
pub struct ListenerSet<L: ?Sized> {
    inner: Arc<Mutex<Entries<L>>>,
}

struct Entries<L: ?Sized> {
    next_id: u64,
    listeners: Vec<(u64, Arc<L>)>,
}

impl<L: ?Sized + Send + Sync + 'static> ListenerSet<L> {
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Entries { next_id: 0, listeners: Vec::new() })) }
    }

    /// Register a listener; the returned subscription removes exactly this entry.
    pub fn add(&self, listener: Arc<L>) -> Subscription {
        let id = {
            let mut entries = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = entries.next_id;
            entries.next_id += 1;
            entries.listeners.push((id, listener));
            id
        };

        let registry: Weak<Mutex<Entries<L>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .listeners
                    .retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }

    /// Listeners registered right now, in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<L>> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .listeners
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<L: ?Sized + Send + Sync + 'static> Default for ListenerSet<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L: ?Sized> Clone for ListenerSet<L> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}
