//! Reactive projection of a model's state for a view.
//!
//! DESIGN
//! ======
//! A [`ModelBinding`] subscribes to a model once and keeps `map(state)` as
//! its current value. Each store notification stores the projection in a
//! new `Arc`, bumps the revision, and fires the render callback, even when
//! the projected value is equal to the last one. Views compare by pointer,
//! so an update always reads as a change.
//!
//! Switching to a handle of the same store keeps the existing subscription;
//! a different store is subscribed afresh and the old one released.
//! Replacing the projection never resubscribes. The subscription is owned by
//! the binding, so dropping it (including during unwinding) unsubscribes.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::models::Model;
use crate::store::Subscription;

#[cfg(test)]
#[path = "binding_test.rs"]
mod tests;

type MapFn<S, T> = Arc<dyn Fn(&S) -> T + Send + Sync>;
type RenderFn<T> = Arc<dyn Fn(&Arc<T>) + Send + Sync>;

struct Slot<S, T> {
    map: MapFn<S, T>,
    value: Arc<T>,
    revision: u64,
}

struct Shared<S, T> {
    slot: Mutex<Slot<S, T>>,
    on_change: RenderFn<T>,
}

impl<S, T> Shared<S, T> {
    /// Recompute from `state` and publish. Returns the new value.
    fn refresh(&self, state: &S) -> Arc<T> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let value = Arc::new((slot.map)(state));
        slot.value = Arc::clone(&value);
        slot.revision += 1;
        value
    }
}

/// A view's live projection of one model's state.
pub struct ModelBinding<M: Model, T> {
    model: M,
    shared: Arc<Shared<M::State, T>>,
    subscription: Subscription,
}

impl<M, T> ModelBinding<M, T>
where
    M: Model,
    T: Send + Sync + 'static,
{
    /// Bind to `model`, calling `on_change` after every recomputation driven
    /// by a store update.
    pub fn new(
        model: M,
        map: impl Fn(&M::State) -> T + Send + Sync + 'static,
        on_change: impl Fn(&Arc<T>) + Send + Sync + 'static,
    ) -> Self {
        let map: MapFn<M::State, T> = Arc::new(map);
        let initial = Arc::new(map(model.get_state().as_ref()));
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot { map, value: initial, revision: 0 }),
            on_change: Arc::new(on_change),
        });
        let subscription = Self::subscribe(&model, &shared);
        Self { model, shared, subscription }
    }

    /// The projection as of the latest notification.
    #[must_use]
    pub fn value(&self) -> Arc<T> {
        Arc::clone(&self.slot().value)
    }

    /// Number of recomputations since the binding was created.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.slot().revision
    }

    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }

    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }

    /// Point the binding at `model`. Resubscribes only if it wraps a
    /// different store.
    pub fn set_model(&mut self, model: M) {
        let same = model.store().same_store(self.model.store());
        self.model = model;
        if same {
            return;
        }
        self.subscription = Self::subscribe(&self.model, &self.shared);
        self.shared.refresh(&self.model.get_state());
    }

    /// Replace the projection and recompute it against the current state.
    pub fn set_map(&mut self, map: impl Fn(&M::State) -> T + Send + Sync + 'static) {
        let map: MapFn<M::State, T> = Arc::new(map);
        self.slot().map = map;
        self.shared.refresh(&self.model.get_state());
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Slot<M::State, T>> {
        self.shared.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn subscribe(model: &M, shared: &Arc<Shared<M::State, T>>) -> Subscription {
        let shared = Arc::clone(shared);
        model.add_listener(move |state| {
            let value = shared.refresh(state);
            (shared.on_change)(&value);
        })
    }
}

impl<M: Model, T: fmt::Debug> fmt::Debug for ModelBinding<M, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ModelBinding")
            .field("value", &slot.value)
            .field("revision", &slot.revision)
            .field("subscription", &self.subscription)
            .finish()
    }
}

/// Bind to `model` without a render callback; read with [`ModelBinding::value`].
pub fn use_model_state<M, T>(model: M, map: impl Fn(&M::State) -> T + Send + Sync + 'static) -> ModelBinding<M, T>
where
    M: Model,
    T: Send + Sync + 'static,
{
    ModelBinding::new(model, map, |_| {})
}
