//! Timers for push coalescing and auto-dismiss notices.
//!
//! DESIGN
//! ======
//! `Debouncer` is trailing-edge only: every `schedule` call bumps a
//! generation counter and spawns a sleeper; when a sleeper wakes it runs its
//! action only if no newer call arrived meanwhile. A burst of push
//! notifications therefore produces one re-fetch, `window` after the last one.
//!
//! `Timeout` is a one-shot delayed callback whose task is aborted on
//! `cancel` and on drop.
//!
//! Both spawn onto the ambient tokio runtime and must be used from inside it.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

#[cfg(test)]
#[path = "debounce_test.rs"]
mod tests;

// =============================================================================
// DEBOUNCER
// =============================================================================

#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    generation: Arc<AtomicU64>,
}

impl Debouncer {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self { window, generation: Arc::new(AtomicU64::new(0)) }
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Run `action` once the window passes without another `schedule` call.
    pub fn schedule<F, Fut>(&self, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = Arc::clone(&self.generation);
        let window = self.window;

        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if generation.load(Ordering::SeqCst) == ticket {
                action().await;
            }
        });
    }

    /// Drop whatever is pending.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

// =============================================================================
// TIMEOUT
// =============================================================================

/// One-shot delayed callback. Cancelled explicitly or by dropping the handle.
#[derive(Debug)]
pub struct Timeout {
    handle: JoinHandle<()>,
}

impl Timeout {
    pub fn start(delay: Duration, callback: impl FnOnce() + Send + 'static) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Timeout {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
