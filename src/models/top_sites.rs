//! Top site tiles: visibility, list kind, ordering, and removal with undo.
//!
//! DESIGN
//! ======
//! Reordering is computed on a fresh `Vec`; the list inside a published
//! snapshot is never spliced. Removal is optimistic: the tile disappears at
//! once and `removed_url` holds the undo notice open until the user undoes,
//! dismisses, or the undo timeout elapses.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{Model, forward, spawn_hydration, wait_hydrated};
use crate::config::ModelConfig;
use crate::debounce::{Debouncer, Timeout};
use crate::host::{HostError, TopSite, TopSitesEvents, TopSitesHandler, TopSitesListKind};
use crate::store::{Store, Subscription};

#[cfg(test)]
#[path = "top_sites_test.rs"]
mod tests;

// =============================================================================
// STATE
// =============================================================================

crate::model_state! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct TopSitesState, patch TopSitesPatch {
        pub show_top_sites: bool,
        pub list_kind: TopSitesListKind,
        pub top_sites: Vec<TopSite>,
        /// Tile awaiting undo while the undo notice is shown.
        pub removed_url: Option<String>,
    }
}

impl Default for TopSitesState {
    fn default() -> Self {
        Self {
            show_top_sites: true,
            list_kind: TopSitesListKind::MostVisited,
            top_sites: Vec::new(),
            removed_url: None,
        }
    }
}

// =============================================================================
// REORDERING
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextDirection {
    #[default]
    Ltr,
    Rtl,
}

/// Which side of the target tile a dragged tile was dropped on, as seen on
/// screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropLocation {
    Before,
    After,
}

impl DropLocation {
    /// The side in list order. Right-to-left layouts mirror the screen.
    #[must_use]
    pub fn in_list_order(self, direction: TextDirection) -> Self {
        match (self, direction) {
            (location, TextDirection::Ltr) => location,
            (Self::Before, TextDirection::Rtl) => Self::After,
            (Self::After, TextDirection::Rtl) => Self::Before,
        }
    }
}

/// Index the tile at `current` should move to when dropped next to the tile
/// at `target`.
///
/// Only an "after" drop onto an earlier tile shifts by one. A "before" drop
/// onto a later tile is not shifted back, so it lands just past the target.
#[must_use]
pub fn drop_position(current: usize, target: usize, location: DropLocation, direction: TextDirection) -> usize {
    match location.in_list_order(direction) {
        DropLocation::After if target < current => target + 1,
        _ => target,
    }
}

/// A new list with the tile at `from` moved to `to` (clamped to the end).
#[must_use]
pub fn reposition(sites: &[TopSite], from: usize, to: usize) -> Vec<TopSite> {
    let Some(moved) = sites.get(from) else {
        return sites.to_vec();
    };
    let mut rest: Vec<TopSite> = sites
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != from)
        .map(|(_, site)| site.clone())
        .collect();
    let to = to.min(rest.len());
    rest.insert(to, moved.clone());
    rest
}

// =============================================================================
// MODEL
// =============================================================================

#[derive(Clone)]
pub struct TopSitesModel {
    inner: Arc<Inner>,
}

struct Inner {
    store: Store<TopSitesState>,
    handler: Arc<dyn TopSitesHandler>,
    refresh: Debouncer,
    undo_timeout: Duration,
    undo_notice: Mutex<Option<Timeout>>,
    hydrated: watch::Receiver<bool>,
    _events: Subscription,
}

impl Model for TopSitesModel {
    type State = TopSitesState;

    fn store(&self) -> &Store<TopSitesState> {
        &self.inner.store
    }
}

impl TopSitesModel {
    /// Create the model, register for host pushes, and start hydrating.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(handler: Arc<dyn TopSitesHandler>, config: &ModelConfig) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| Inner {
            store: Store::new(TopSitesState::default()),
            handler: Arc::clone(&handler),
            refresh: Debouncer::new(config.push_debounce),
            undo_timeout: config.undo_timeout,
            undo_notice: Mutex::new(None),
            hydrated: done_rx,
            _events: handler.add_listener(Arc::new(Events { model: weak.clone() })),
        });

        let model = Self { inner };
        let loader = model.clone();
        spawn_hydration("top_sites", done_tx, async move { loader.load_data().await });
        model
    }

    pub async fn hydrated(&self) {
        wait_hydrated(&self.inner.hydrated).await;
    }

    pub async fn load_data(&self) -> Result<(), HostError> {
        let h = &self.inner.handler;
        let (show_top_sites, list_kind, top_sites) =
            tokio::try_join!(h.get_show_top_sites(), h.get_top_sites_list_kind(), h.get_top_sites())?;
        self.inner.store.update(TopSitesPatch {
            show_top_sites: Some(show_top_sites),
            list_kind: Some(list_kind),
            top_sites: Some(top_sites),
            ..Default::default()
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Preferences
    // -------------------------------------------------------------------------

    pub fn set_show_top_sites(&self, show: bool) {
        self.inner.store.update(TopSitesPatch { show_top_sites: Some(show), ..Default::default() });
        let handler = self.handler();
        forward("set_show_top_sites", async move { handler.set_show_top_sites(show).await });
    }

    /// Switch lists. The tiles for the new list arrive with the host's push.
    pub fn set_list_kind(&self, kind: TopSitesListKind) {
        self.inner.store.update(TopSitesPatch { list_kind: Some(kind), ..Default::default() });
        let handler = self.handler();
        forward("set_top_sites_list_kind", async move { handler.set_top_sites_list_kind(kind).await });
    }

    // -------------------------------------------------------------------------
    // Editing
    // -------------------------------------------------------------------------

    pub async fn add_top_site(&self, url: &str, title: &str) -> Result<(), HostError> {
        self.inner.handler.add_top_site(url, title).await?;
        self.reload_sites().await
    }

    pub async fn update_top_site(&self, current_url: &str, url: &str, title: &str) -> Result<(), HostError> {
        self.inner.handler.update_top_site(current_url, url, title).await?;
        self.reload_sites().await
    }

    /// Hide the tile at once and show the undo notice.
    pub fn remove_top_site(&self, url: &str) {
        let removed = url.to_string();
        self.inner.store.update_with(|state| TopSitesPatch {
            top_sites: Some(state.top_sites.iter().filter(|site| site.url != removed).cloned().collect()),
            removed_url: Some(Some(removed.clone())),
            ..Default::default()
        });

        let store = self.inner.store.clone();
        let expired = removed.clone();
        let timeout = Timeout::start(self.inner.undo_timeout, move || {
            store.update_if(|state| {
                (state.removed_url.as_deref() == Some(expired.as_str())).then(|| {
                    debug!(url = %expired, "undo notice expired");
                    TopSitesPatch { removed_url: Some(None), ..Default::default() }
                })
            });
        });
        self.replace_undo_timer(Some(timeout));

        let handler = self.handler();
        forward("remove_top_site", async move { handler.remove_top_site(&removed).await });
    }

    /// Restore the most recently removed tile.
    pub async fn undo_remove_top_site(&self) -> Result<(), HostError> {
        self.dismiss_undo_notice();
        self.inner.handler.undo_remove_top_site().await?;
        self.reload_sites().await
    }

    /// Close the undo notice without restoring anything.
    pub fn dismiss_undo_notice(&self) {
        self.replace_undo_timer(None);
        self.inner.store.update_if(|state| {
            state
                .removed_url
                .is_some()
                .then(|| TopSitesPatch { removed_url: Some(None), ..Default::default() })
        });
    }

    // -------------------------------------------------------------------------
    // Ordering
    // -------------------------------------------------------------------------

    /// Move the tile for `url` to `position`.
    pub fn set_top_site_position(&self, url: &str, position: usize) {
        self.reorder(url, |_, _| Some(position));
    }

    /// Move the tile for `url` to the `location` side of the tile for `target_url`.
    pub fn move_top_site(&self, url: &str, target_url: &str, location: DropLocation, direction: TextDirection) {
        if url == target_url {
            return;
        }
        self.reorder(url, |sites, current| {
            let target = sites.iter().position(|site| site.url == target_url);
            if target.is_none() {
                debug!(%url, %target_url, "ignoring drop onto unknown tile");
            }
            target.map(|target| drop_position(current, target, location, direction))
        });
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    /// Move the tile for `url` to the index `pick` chooses from the list as
    /// it is at update time, then tell the host.
    fn reorder(&self, url: &str, pick: impl FnOnce(&[TopSite], usize) -> Option<usize>) {
        let mut position = None;
        self.inner.store.update_if(|state| {
            let Some(from) = state.top_sites.iter().position(|site| site.url == url) else {
                debug!(%url, "ignoring move of unknown tile");
                return None;
            };
            let to = pick(&state.top_sites, from)?;
            position = Some(to);
            Some(TopSitesPatch { top_sites: Some(reposition(&state.top_sites, from, to)), ..Default::default() })
        });
        let Some(position) = position else { return };

        let handler = self.handler();
        let url = url.to_string();
        forward("set_top_site_position", async move { handler.set_top_site_position(&url, position).await });
    }

    fn replace_undo_timer(&self, timer: Option<Timeout>) {
        let previous = std::mem::replace(
            &mut *self.inner.undo_notice.lock().unwrap_or_else(PoisonError::into_inner),
            timer,
        );
        drop(previous);
    }

    async fn reload_sites(&self) -> Result<(), HostError> {
        let top_sites = self.inner.handler.get_top_sites().await?;
        self.inner.store.update(TopSitesPatch { top_sites: Some(top_sites), ..Default::default() });
        Ok(())
    }

    fn handler(&self) -> Arc<dyn TopSitesHandler> {
        Arc::clone(&self.inner.handler)
    }
}

// =============================================================================
// PUSH EVENTS
// =============================================================================

struct Events {
    model: Weak<Inner>,
}

impl TopSitesEvents for Events {
    fn on_top_sites_changed(&self) {
        let Some(inner) = self.model.upgrade() else { return };
        let model = TopSitesModel { inner };
        let target = model.clone();
        model.inner.refresh.schedule(move || async move {
            if let Err(error) = target.load_data().await {
                warn!(%error, "top sites reload failed");
            }
        });
    }
}
