//! Domain models for the new tab page.
//!
//! DESIGN
//! ======
//! A model is one [`Store`] plus an injected host handler. Actions apply an
//! optimistic local update, then forward the intent to the host. Commands
//! the UI does not wait on are spawned and their failures logged; commands
//! whose result matters are awaited and return `Result`. Host push events
//! are registered once at construction and trigger debounced re-fetches.
//!
//! Each model hydrates itself with a spawned `load_data` right after
//! construction; [`hydrated`](NewTabModel::hydrated)-style waiters let
//! callers block until that first attempt finished.

pub mod background;
pub mod new_tab;
pub mod search;
pub mod top_sites;

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::host::HostError;
use crate::store::{ModelState, Store, Subscription};

pub use new_tab::{NewTabModel, NewTabState};
pub use search::{SearchModel, SearchState};
pub use top_sites::{TopSitesModel, TopSitesState};

/// Uniform surface every model exposes to bindings and consumers.
pub trait Model: Clone + Send + Sync + 'static {
    type State: ModelState;

    fn store(&self) -> &Store<Self::State>;

    fn get_state(&self) -> Arc<Self::State> {
        self.store().get_state()
    }

    fn add_listener(&self, f: impl Fn(&Arc<Self::State>) + Send + Sync + 'static) -> Subscription {
        self.store().add_listener(f)
    }
}

/// Spawn a remote call nobody awaits. Failures are logged, not returned.
pub(crate) fn forward<F>(method: &'static str, call: F)
where
    F: Future<Output = Result<(), HostError>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(error) = call.await {
            warn!(method, %error, "remote call failed");
        }
    });
}

/// Spawn the initial `load_data`; `done` flips to `true` once it ends.
pub(crate) fn spawn_hydration<F>(model: &'static str, done: watch::Sender<bool>, load: F)
where
    F: Future<Output = Result<(), HostError>> + Send + 'static,
{
    tokio::spawn(async move {
        match load.await {
            Ok(()) => debug!(model, "hydrated"),
            Err(error) => warn!(model, %error, "hydration failed; keeping defaults"),
        }
        let _ = done.send(true);
    });
}

/// Wait until the hydration feeding `done` has finished.
pub(crate) async fn wait_hydrated(done: &watch::Receiver<bool>) {
    let mut done = done.clone();
    let _ = done.wait_for(|finished| *finished).await;
}
