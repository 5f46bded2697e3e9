//! Generic observable state holder.
//!
//! DESIGN
//! ======
//! A `Store` owns exactly one `Arc<S>`. Every update builds a new value from
//! the prior one and swaps the `Arc`, so snapshots handed to listeners are
//! never mutated afterwards. Updates come in two shapes: a shallow patch
//! (`update`) or a pure function of the prior state that returns a patch
//! (`update_with`).
//!
//! Listeners run outside the state lock, so a listener may call `update`
//! again. Each swap is queued for notification while the state lock is still
//! held, and one caller at a time drains the queue. Listeners therefore see
//! snapshots one by one in swap order, even when several threads update the
//! same store. A nested update from inside a listener is queued and delivered
//! after the current notification finishes. An update that lands while
//! another thread is draining returns at once; that thread delivers it.

pub mod subscription;

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

pub use subscription::{ListenerSet, Subscription};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

// =============================================================================
// STATE CONTRACT
// =============================================================================

/// A state snapshot that can absorb a shallow patch.
pub trait ModelState: Clone + Send + Sync + 'static {
    /// Partial state: every field optional, `None` keeps the prior value.
    type Patch: Default + Send;

    /// Build the next state from `self` and `patch`.
    #[must_use]
    fn merge(&self, patch: Self::Patch) -> Self;
}

/// Declare a state struct together with its patch type and [`ModelState`] impl.
///
/// ```
/// newtab::model_state! {
///     #[derive(Debug, Clone, Default)]
///     pub struct Counter, patch CounterPatch {
///         pub count: u32,
///         pub label: String,
///     }
/// }
/// ```
#[macro_export]
macro_rules! model_state {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident, patch $patch:ident {
            $( $(#[$fmeta:meta])* $fvis:vis $field:ident : $ty:ty ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $( $(#[$fmeta])* $fvis $field : $ty, )*
        }

        #[doc = concat!("Shallow patch for [`", stringify!($name), "`]. `None` keeps the prior value.")]
        #[derive(Debug, Clone, Default)]
        $vis struct $patch {
            $( $fvis $field : ::core::option::Option<$ty>, )*
        }

        impl $crate::store::ModelState for $name {
            type Patch = $patch;

            fn merge(&self, patch: $patch) -> Self {
                Self {
                    $( $field: match patch.$field {
                        ::core::option::Option::Some(value) => value,
                        ::core::option::Option::None => ::core::clone::Clone::clone(&self.$field),
                    }, )*
                }
            }
        }
    };
}

// =============================================================================
// STORE
// =============================================================================

/// Listener signature: called with every new state snapshot.
pub type Listener<S> = dyn Fn(&Arc<S>) + Send + Sync;

/// Shared handle to one state value. Clones refer to the same store.
pub struct Store<S: ModelState> {
    inner: Arc<StoreInner<S>>,
}

struct StoreInner<S: ModelState> {
    state: Mutex<Arc<S>>,
    outbox: Mutex<Outbox<S>>,
    listeners: ListenerSet<Listener<S>>,
}

/// Snapshots swapped in but not yet delivered, oldest first.
struct Outbox<S> {
    pending: VecDeque<Arc<S>>,
    draining: bool,
}

/// Releases the drain when a listener panics, so later updates still notify.
struct DrainGuard<'a, S> {
    outbox: &'a Mutex<Outbox<S>>,
}

impl<S> Drop for DrainGuard<'_, S> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            self.outbox.lock().unwrap_or_else(PoisonError::into_inner).draining = false;
        }
    }
}

impl<S: ModelState> Store<S> {
    #[must_use]
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                state: Mutex::new(Arc::new(initial)),
                outbox: Mutex::new(Outbox { pending: VecDeque::new(), draining: false }),
                listeners: ListenerSet::new(),
            }),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn get_state(&self) -> Arc<S> {
        Arc::clone(&self.inner.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Shallow-merge `patch` into the current state and notify listeners.
    pub fn update(&self, patch: S::Patch) {
        self.update_with(move |_| patch);
    }

    /// Compute a patch from the current state, merge it, and notify listeners.
    ///
    /// `f` runs while the state lock is held; it must not touch this store.
    pub fn update_with(&self, f: impl FnOnce(&S) -> S::Patch) {
        self.update_if(|state| Some(f(state)));
    }

    /// Like [`update_with`](Self::update_with), but `f` may return `None` to
    /// leave the state untouched. Returns whether an update was applied.
    ///
    /// Nothing is swapped or notified on `None`, so a read-check-write that
    /// decides to do nothing stays invisible to listeners.
    pub fn update_if(&self, f: impl FnOnce(&S) -> Option<S::Patch>) -> bool {
        {
            let mut current = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(patch) = f(&current) else {
                return false;
            };
            let next = Arc::new(current.merge(patch));
            *current = Arc::clone(&next);
            // Queued under the state lock so queue order is swap order.
            self.outbox().pending.push_back(next);
        }
        self.drain();
        true
    }

    fn outbox(&self) -> std::sync::MutexGuard<'_, Outbox<S>> {
        self.inner.outbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver queued snapshots unless another frame is already doing so.
    fn drain(&self) {
        {
            let mut outbox = self.outbox();
            if outbox.draining {
                return;
            }
            outbox.draining = true;
        }
        let _guard = DrainGuard { outbox: &self.inner.outbox };

        loop {
            let next = {
                let mut outbox = self.outbox();
                match outbox.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        // Cleared under the same lock that saw the queue empty.
                        outbox.draining = false;
                        return;
                    }
                }
            };
            for listener in self.inner.listeners.snapshot() {
                listener(&next);
            }
        }
    }

    /// Call `f` with every subsequent state value until the subscription is disposed.
    pub fn add_listener(&self, f: impl Fn(&Arc<S>) + Send + Sync + 'static) -> Subscription {
        let listener: Arc<Listener<S>> = Arc::new(f);
        self.inner.listeners.add(listener)
    }

    /// Whether `other` is a handle to this same store.
    #[must_use]
    pub fn same_store(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }
}

impl<S: ModelState> Clone for Store<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S: ModelState + Default> Default for Store<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}

impl<S: ModelState + fmt::Debug> fmt::Debug for Store<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.get_state())
            .field("listeners", &self.listener_count())
            .finish()
    }
}
