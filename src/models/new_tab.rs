//! Backgrounds and widget preferences for the new tab page.
//!
//! DESIGN
//! ======
//! `current_background` is derived from the other background fields but is
//! not kept in sync by the store. Every action here that touches one of
//! those inputs recomputes it in the same update, so listeners never see a
//! stale pairing.

use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::background::compute_current_background;
use super::{Model, forward, spawn_hydration, wait_hydrated};
use crate::config::ModelConfig;
use crate::debounce::Debouncer;
use crate::host::{
    Background, BackgroundType, BraveBackground, ClockFormat, HostError, NewTabPageEvents, NewTabPageHandler,
    SelectedBackground, ShieldsStats, SponsoredImageBackground,
};
use crate::store::{ModelState, Store, Subscription};

#[cfg(test)]
#[path = "new_tab_test.rs"]
mod tests;

// =============================================================================
// STATE
// =============================================================================

crate::model_state! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct NewTabState, patch NewTabPatch {
        pub backgrounds_enabled: bool,
        pub backgrounds_customizable: bool,
        pub sponsored_images_enabled: bool,
        pub selected_background_type: BackgroundType,
        /// Explicit selection; empty means "pick one of the type".
        pub selected_background: String,
        pub brave_backgrounds: Vec<BraveBackground>,
        pub custom_backgrounds: Vec<String>,
        pub sponsored_image_background: Option<SponsoredImageBackground>,
        pub current_background: Option<Background>,
        pub show_clock: bool,
        pub clock_format: ClockFormat,
        pub show_shields_stats: bool,
        pub shields_stats: ShieldsStats,
    }
}

impl Default for NewTabState {
    fn default() -> Self {
        Self {
            backgrounds_enabled: true,
            backgrounds_customizable: true,
            sponsored_images_enabled: true,
            selected_background_type: BackgroundType::Brave,
            selected_background: String::new(),
            brave_backgrounds: Vec::new(),
            custom_backgrounds: Vec::new(),
            sponsored_image_background: None,
            current_background: None,
            show_clock: false,
            clock_format: ClockFormat::Auto,
            show_shields_stats: true,
            shields_stats: ShieldsStats::default(),
        }
    }
}

/// Fill in `current_background` for the state `patch` produces.
fn with_recomputed_background(state: &NewTabState, mut patch: NewTabPatch) -> NewTabPatch {
    let next = state.merge(patch.clone());
    patch.current_background = Some(Some(compute_current_background(&next, &mut rand::rng())));
    patch
}

// =============================================================================
// MODEL
// =============================================================================

#[derive(Clone)]
pub struct NewTabModel {
    inner: Arc<Inner>,
}

struct Inner {
    store: Store<NewTabState>,
    handler: Arc<dyn NewTabPageHandler>,
    prefs_refresh: Debouncer,
    custom_refresh: Debouncer,
    hydrated: watch::Receiver<bool>,
    _events: Subscription,
}

impl Model for NewTabModel {
    type State = NewTabState;

    fn store(&self) -> &Store<NewTabState> {
        &self.inner.store
    }
}

impl NewTabModel {
    /// Create the model, register for host pushes, and start hydrating.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(handler: Arc<dyn NewTabPageHandler>, config: &ModelConfig) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| Inner {
            store: Store::new(NewTabState::default()),
            handler: Arc::clone(&handler),
            prefs_refresh: Debouncer::new(config.push_debounce),
            custom_refresh: Debouncer::new(config.push_debounce),
            hydrated: done_rx,
            _events: handler.add_listener(Arc::new(Events { model: weak.clone() })),
        });

        let model = Self { inner };
        let loader = model.clone();
        spawn_hydration("new_tab", done_tx, async move { loader.load_data().await });
        model
    }

    /// Resolves once the initial hydration attempt has finished.
    pub async fn hydrated(&self) {
        wait_hydrated(&self.inner.hydrated).await;
    }

    /// Fetch everything from the host and replace the local state.
    pub async fn load_data(&self) -> Result<(), HostError> {
        let h = &self.inner.handler;
        let (
            backgrounds_enabled,
            backgrounds_customizable,
            sponsored_images_enabled,
            selected,
            brave_backgrounds,
            custom_backgrounds,
            sponsored_image_background,
            clock,
            shields,
        ) = tokio::try_join!(
            h.get_backgrounds_enabled(),
            h.get_backgrounds_customizable(),
            h.get_sponsored_images_enabled(),
            h.get_selected_background(),
            h.get_brave_backgrounds(),
            h.get_custom_backgrounds(),
            h.get_sponsored_image_background(),
            h.get_clock_state(),
            h.get_shields_stats_state(),
        )?;

        self.update_and_recompute(NewTabPatch {
            backgrounds_enabled: Some(backgrounds_enabled),
            backgrounds_customizable: Some(backgrounds_customizable),
            sponsored_images_enabled: Some(sponsored_images_enabled),
            selected_background_type: Some(selected.kind),
            selected_background: Some(selected.value),
            brave_backgrounds: Some(brave_backgrounds),
            custom_backgrounds: Some(custom_backgrounds),
            sponsored_image_background: Some(sponsored_image_background),
            show_clock: Some(clock.show_clock),
            clock_format: Some(clock.clock_format),
            show_shields_stats: Some(shields.show_shields_stats),
            shields_stats: Some(shields.stats),
            ..Default::default()
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Backgrounds
    // -------------------------------------------------------------------------

    /// Select a background type and optional explicit value (empty = random).
    pub fn select_background(&self, kind: BackgroundType, value: impl Into<String>) {
        let value = value.into();
        self.update_and_recompute(NewTabPatch {
            selected_background_type: Some(kind),
            selected_background: Some(value.clone()),
            ..Default::default()
        });

        let handler = self.handler();
        forward("select_background", async move {
            handler
                .select_background(SelectedBackground { kind, value })
                .await
        });
    }

    pub fn set_backgrounds_enabled(&self, enabled: bool) {
        self.update_and_recompute(NewTabPatch { backgrounds_enabled: Some(enabled), ..Default::default() });
        let handler = self.handler();
        forward("set_backgrounds_enabled", async move { handler.set_backgrounds_enabled(enabled).await });
    }

    pub fn set_sponsored_images_enabled(&self, enabled: bool) {
        let mut patch = NewTabPatch { sponsored_images_enabled: Some(enabled), ..Default::default() };
        if !enabled {
            patch.sponsored_image_background = Some(None);
        }
        self.update_and_recompute(patch);

        let handler = self.handler();
        forward("set_sponsored_images_enabled", async move { handler.set_sponsored_images_enabled(enabled).await });
    }

    /// Remove an uploaded background, then reload the list and selection.
    pub async fn remove_custom_background(&self, image_url: &str) -> Result<(), HostError> {
        let h = &self.inner.handler;
        h.remove_custom_background(image_url).await?;
        let (custom_backgrounds, selected) = tokio::try_join!(h.get_custom_backgrounds(), h.get_selected_background())?;

        self.inner.store.update_with(|state| {
            let mut patch = NewTabPatch {
                custom_backgrounds: Some(custom_backgrounds),
                selected_background_type: Some(selected.kind),
                selected_background: Some(selected.value),
                ..Default::default()
            };
            if matches!(&state.current_background, Some(Background::Custom { image_url: shown }) if shown == image_url) {
                patch.current_background = Some(None);
            }
            with_recomputed_background(state, patch)
        });
        Ok(())
    }

    /// Recompute `current_background` from the current inputs.
    pub fn recompute_background(&self) {
        self.update_and_recompute(NewTabPatch::default());
    }

    /// Forget the shown background and pick again (e.g. on page show).
    pub fn refresh_background(&self) {
        self.update_and_recompute(NewTabPatch { current_background: Some(None), ..Default::default() });
    }

    // -------------------------------------------------------------------------
    // Widgets
    // -------------------------------------------------------------------------

    pub fn set_show_clock(&self, show: bool) {
        self.inner.store.update(NewTabPatch { show_clock: Some(show), ..Default::default() });
        let handler = self.handler();
        forward("set_show_clock", async move { handler.set_show_clock(show).await });
    }

    pub fn set_clock_format(&self, format: ClockFormat) {
        self.inner.store.update(NewTabPatch { clock_format: Some(format), ..Default::default() });
        let handler = self.handler();
        forward("set_clock_format", async move { handler.set_clock_format(format).await });
    }

    pub fn set_show_shields_stats(&self, show: bool) {
        self.inner.store.update(NewTabPatch { show_shields_stats: Some(show), ..Default::default() });
        let handler = self.handler();
        forward("set_show_shields_stats", async move { handler.set_show_shields_stats(show).await });
    }

    // -------------------------------------------------------------------------
    // Push handling
    // -------------------------------------------------------------------------

    async fn reload_background_prefs(&self) -> Result<(), HostError> {
        let h = &self.inner.handler;
        let (backgrounds_enabled, sponsored_images_enabled, selected, brave_backgrounds) = tokio::try_join!(
            h.get_backgrounds_enabled(),
            h.get_sponsored_images_enabled(),
            h.get_selected_background(),
            h.get_brave_backgrounds(),
        )?;
        self.update_and_recompute(NewTabPatch {
            backgrounds_enabled: Some(backgrounds_enabled),
            sponsored_images_enabled: Some(sponsored_images_enabled),
            selected_background_type: Some(selected.kind),
            selected_background: Some(selected.value),
            brave_backgrounds: Some(brave_backgrounds),
            ..Default::default()
        });
        Ok(())
    }

    async fn reload_custom_backgrounds(&self) -> Result<(), HostError> {
        let custom_backgrounds = self.inner.handler.get_custom_backgrounds().await?;
        self.update_and_recompute(NewTabPatch { custom_backgrounds: Some(custom_backgrounds), ..Default::default() });
        Ok(())
    }

    async fn reload_sponsored_image(&self) -> Result<(), HostError> {
        let sponsored = self.inner.handler.get_sponsored_image_background().await?;
        self.update_and_recompute(NewTabPatch { sponsored_image_background: Some(sponsored), ..Default::default() });
        Ok(())
    }

    async fn reload_clock(&self) -> Result<(), HostError> {
        let clock = self.inner.handler.get_clock_state().await?;
        self.inner.store.update(NewTabPatch {
            show_clock: Some(clock.show_clock),
            clock_format: Some(clock.clock_format),
            ..Default::default()
        });
        Ok(())
    }

    async fn reload_shields_stats(&self) -> Result<(), HostError> {
        let shields = self.inner.handler.get_shields_stats_state().await?;
        self.inner.store.update(NewTabPatch {
            show_shields_stats: Some(shields.show_shields_stats),
            shields_stats: Some(shields.stats),
            ..Default::default()
        });
        Ok(())
    }

    fn update_and_recompute(&self, patch: NewTabPatch) {
        self.inner
            .store
            .update_with(move |state| with_recomputed_background(state, patch));
    }

    fn handler(&self) -> Arc<dyn NewTabPageHandler> {
        Arc::clone(&self.inner.handler)
    }
}

// =============================================================================
// PUSH EVENTS
// =============================================================================

struct Events {
    model: Weak<Inner>,
}

impl Events {
    fn model(&self) -> Option<NewTabModel> {
        self.model.upgrade().map(|inner| NewTabModel { inner })
    }
}

impl NewTabPageEvents for Events {
    fn on_background_prefs_changed(&self) {
        let Some(model) = self.model() else { return };
        debug!("background prefs changed");
        let debouncer = &model.inner.prefs_refresh;
        let target = model.clone();
        debouncer.schedule(move || async move {
            if let Err(error) = target.reload_background_prefs().await {
                warn!(%error, "background prefs reload failed");
            }
        });
    }

    fn on_custom_backgrounds_changed(&self) {
        let Some(model) = self.model() else { return };
        let target = model.clone();
        model.inner.custom_refresh.schedule(move || async move {
            if let Err(error) = target.reload_custom_backgrounds().await {
                warn!(%error, "custom backgrounds reload failed");
            }
        });
    }

    fn on_sponsored_image_changed(&self) {
        if let Some(model) = self.model() {
            forward("get_sponsored_image_background", async move { model.reload_sponsored_image().await });
        }
    }

    fn on_clock_prefs_changed(&self) {
        if let Some(model) = self.model() {
            forward("get_clock_state", async move { model.reload_clock().await });
        }
    }

    fn on_shields_stats_changed(&self) {
        if let Some(model) = self.model() {
            forward("get_shields_stats_state", async move { model.reload_shields_stats().await });
        }
    }
}
