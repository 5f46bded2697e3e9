//! Search box state: engines, suggestions prompt, and autocomplete.
//!
//! DESIGN
//! ======
//! The enabled engine set is never emptied by this model: disabling the last
//! enabled engine is ignored. When an engine leaves the set while it is the
//! last used one, the model falls back to the default engine if enabled,
//! else the first enabled engine in list order.
//!
//! Autocomplete replies cannot be cancelled on the host side, so each query
//! takes a sequence number and a reply is applied only while its number is
//! still the latest. `stop_autocomplete` bumps the sequence too.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{Model, forward, spawn_hydration, wait_hydrated};
use crate::config::ModelConfig;
use crate::debounce::Debouncer;
use crate::host::{AutocompleteMatch, HostError, OpenDisposition, SearchEngineInfo, SearchEvents, SearchHandler};
use crate::store::{Store, Subscription};

#[cfg(test)]
#[path = "search_test.rs"]
mod tests;

// =============================================================================
// STATE
// =============================================================================

crate::model_state! {
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct SearchState, patch SearchPatch {
        pub search_engines: Vec<SearchEngineInfo>,
        pub enabled_search_engines: BTreeSet<String>,
        pub last_used_search_engine: String,
        pub show_search_box: bool,
        pub search_suggestions_enabled: bool,
        pub search_suggestions_prompt_dismissed: bool,
        pub autocomplete_matches: Vec<AutocompleteMatch>,
        /// Query the displayed matches belong to.
        pub autocomplete_query: String,
    }
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            search_engines: Vec::new(),
            enabled_search_engines: BTreeSet::new(),
            last_used_search_engine: String::new(),
            show_search_box: true,
            search_suggestions_enabled: false,
            search_suggestions_prompt_dismissed: false,
            autocomplete_matches: Vec::new(),
            autocomplete_query: String::new(),
        }
    }
}

/// Engine to switch to when `current` is no longer enabled, or `None` when
/// `current` may stay.
#[must_use]
pub fn fallback_search_engine(
    current: &str,
    engines: &[SearchEngineInfo],
    enabled: &BTreeSet<String>,
    default_engine: &str,
) -> Option<String> {
    if enabled.contains(current) {
        return None;
    }
    if enabled.contains(default_engine) {
        return Some(default_engine.to_string());
    }
    engines
        .iter()
        .map(|engine| &engine.host)
        .find(|host| enabled.contains(*host))
        .or_else(|| enabled.iter().next())
        .cloned()
}

/// Whether to offer enabling search suggestions while `query` is typed.
#[must_use]
pub fn should_show_suggestions_prompt(state: &SearchState, query: &str) -> bool {
    !state.search_suggestions_enabled && !state.search_suggestions_prompt_dismissed && !query.trim().is_empty()
}

// =============================================================================
// MODEL
// =============================================================================

#[derive(Clone)]
pub struct SearchModel {
    inner: Arc<Inner>,
}

struct Inner {
    store: Store<SearchState>,
    handler: Arc<dyn SearchHandler>,
    default_engine: String,
    prefs_refresh: Debouncer,
    autocomplete_seq: AtomicU64,
    hydrated: watch::Receiver<bool>,
    _events: Subscription,
}

impl Model for SearchModel {
    type State = SearchState;

    fn store(&self) -> &Store<SearchState> {
        &self.inner.store
    }
}

impl SearchModel {
    /// Create the model, register for host pushes, and start hydrating.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(handler: Arc<dyn SearchHandler>, config: &ModelConfig) -> Self {
        let (done_tx, done_rx) = watch::channel(false);
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| Inner {
            store: Store::new(SearchState::default()),
            handler: Arc::clone(&handler),
            default_engine: config.default_search_engine.clone(),
            prefs_refresh: Debouncer::new(config.push_debounce),
            autocomplete_seq: AtomicU64::new(0),
            hydrated: done_rx,
            _events: handler.add_listener(Arc::new(Events { model: weak.clone() })),
        });

        let model = Self { inner };
        let loader = model.clone();
        spawn_hydration("search", done_tx, async move { loader.load_data().await });
        model
    }

    pub async fn hydrated(&self) {
        wait_hydrated(&self.inner.hydrated).await;
    }

    pub async fn load_data(&self) -> Result<(), HostError> {
        let h = &self.inner.handler;
        let (engines, enabled, last_used, show_search_box, suggestions_enabled, prompt_dismissed) = tokio::try_join!(
            h.get_search_engines(),
            h.get_enabled_search_engines(),
            h.get_last_used_search_engine(),
            h.get_show_search_box(),
            h.get_search_suggestions_enabled(),
            h.get_search_suggestions_prompt_dismissed(),
        )?;

        let enabled = self.non_empty(enabled);
        let last_used = fallback_search_engine(&last_used, &engines, &enabled, &self.inner.default_engine)
            .unwrap_or(last_used);

        self.inner.store.update(SearchPatch {
            search_engines: Some(engines),
            enabled_search_engines: Some(enabled),
            last_used_search_engine: Some(last_used),
            show_search_box: Some(show_search_box),
            search_suggestions_enabled: Some(suggestions_enabled),
            search_suggestions_prompt_dismissed: Some(prompt_dismissed),
            ..Default::default()
        });
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Preferences
    // -------------------------------------------------------------------------

    pub fn set_show_search_box(&self, show: bool) {
        self.inner.store.update(SearchPatch { show_search_box: Some(show), ..Default::default() });
        let handler = self.handler();
        forward("set_show_search_box", async move { handler.set_show_search_box(show).await });
    }

    pub fn set_search_suggestions_enabled(&self, enabled: bool) {
        self.inner.store.update(SearchPatch { search_suggestions_enabled: Some(enabled), ..Default::default() });
        let handler = self.handler();
        forward("set_search_suggestions_enabled", async move { handler.set_search_suggestions_enabled(enabled).await });
    }

    pub fn set_search_suggestions_prompt_dismissed(&self, dismissed: bool) {
        self.inner.store.update(SearchPatch {
            search_suggestions_prompt_dismissed: Some(dismissed),
            ..Default::default()
        });
        let handler = self.handler();
        forward("set_search_suggestions_prompt_dismissed", async move {
            handler.set_search_suggestions_prompt_dismissed(dismissed).await
        });
    }

    /// Add or remove `host` from the enabled set.
    ///
    /// Removing the only enabled engine is ignored, as is a change that
    /// leaves the set as it was.
    pub fn set_search_engine_enabled(&self, host: &str, enabled: bool) {
        let default_engine = &self.inner.default_engine;
        let mut fallback = None;
        let applied = self.inner.store.update_if(|state| {
            let mut engines = state.enabled_search_engines.clone();
            if !enabled && engines.len() == 1 && engines.contains(host) {
                debug!(%host, "refusing to disable the last enabled search engine");
                return None;
            }
            let changed = if enabled { engines.insert(host.to_string()) } else { engines.remove(host) };
            if !changed {
                return None;
            }
            fallback =
                fallback_search_engine(&state.last_used_search_engine, &state.search_engines, &engines, default_engine);
            Some(SearchPatch {
                enabled_search_engines: Some(engines),
                last_used_search_engine: fallback.clone(),
                ..Default::default()
            })
        });
        if !applied {
            return;
        }

        let handler = self.handler();
        let host = host.to_string();
        forward("set_search_engine_enabled", async move {
            handler.set_search_engine_enabled(&host, enabled).await?;
            if let Some(fallback) = fallback {
                handler.set_last_used_search_engine(&fallback).await?;
            }
            Ok(())
        });
    }

    pub fn set_last_used_search_engine(&self, host: &str) {
        self.inner.store.update(SearchPatch { last_used_search_engine: Some(host.to_string()), ..Default::default() });
        let handler = self.handler();
        let host = host.to_string();
        forward("set_last_used_search_engine", async move { handler.set_last_used_search_engine(&host).await });
    }

    // -------------------------------------------------------------------------
    // Autocomplete
    // -------------------------------------------------------------------------

    /// Query autocomplete matches for `text` and show them, unless a newer
    /// query or a stop arrived while this one was in flight.
    pub async fn query_autocomplete(&self, text: &str, engine: &str) -> Result<(), HostError> {
        let seq = self.inner.autocomplete_seq.fetch_add(1, Ordering::SeqCst) + 1;
        if text.trim().is_empty() {
            self.clear_autocomplete();
            return Ok(());
        }

        let matches = self.inner.handler.query_autocomplete(text, engine).await?;
        if self.inner.autocomplete_seq.load(Ordering::SeqCst) != seq {
            debug!(seq, query = %text, "discarding stale autocomplete reply");
            return Ok(());
        }
        self.inner.store.update(SearchPatch {
            autocomplete_matches: Some(matches),
            autocomplete_query: Some(text.to_string()),
            ..Default::default()
        });
        Ok(())
    }

    /// Drop displayed matches and ignore replies to queries already sent.
    pub fn stop_autocomplete(&self) {
        self.inner.autocomplete_seq.fetch_add(1, Ordering::SeqCst);
        self.clear_autocomplete();
        let handler = self.handler();
        forward("stop_autocomplete", async move { handler.stop_autocomplete().await });
    }

    pub async fn open_autocomplete_match(&self, index: usize, disposition: OpenDisposition) -> Result<(), HostError> {
        self.inner.handler.open_autocomplete_match(index, disposition).await
    }

    pub async fn open_search(&self, query: &str, engine: &str, disposition: OpenDisposition) -> Result<(), HostError> {
        self.inner.handler.open_search(query, engine, disposition).await
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn clear_autocomplete(&self) {
        self.inner.store.update_if(|state| {
            if state.autocomplete_matches.is_empty() && state.autocomplete_query.is_empty() {
                return None;
            }
            Some(SearchPatch {
                autocomplete_matches: Some(Vec::new()),
                autocomplete_query: Some(String::new()),
                ..Default::default()
            })
        });
    }

    fn non_empty(&self, enabled: BTreeSet<String>) -> BTreeSet<String> {
        if enabled.is_empty() {
            warn!(default = %self.inner.default_engine, "host reported no enabled search engines");
            BTreeSet::from([self.inner.default_engine.clone()])
        } else {
            enabled
        }
    }

    async fn reload_prefs(&self) -> Result<(), HostError> {
        let h = &self.inner.handler;
        let (enabled, last_used, show_search_box, suggestions_enabled, prompt_dismissed) = tokio::try_join!(
            h.get_enabled_search_engines(),
            h.get_last_used_search_engine(),
            h.get_show_search_box(),
            h.get_search_suggestions_enabled(),
            h.get_search_suggestions_prompt_dismissed(),
        )?;
        let enabled = self.non_empty(enabled);
        let default_engine = &self.inner.default_engine;

        self.inner.store.update_with(|state| {
            let last_used = fallback_search_engine(&last_used, &state.search_engines, &enabled, default_engine)
                .unwrap_or(last_used);
            SearchPatch {
                enabled_search_engines: Some(enabled),
                last_used_search_engine: Some(last_used),
                show_search_box: Some(show_search_box),
                search_suggestions_enabled: Some(suggestions_enabled),
                search_suggestions_prompt_dismissed: Some(prompt_dismissed),
                ..Default::default()
            }
        });
        Ok(())
    }

    async fn reload_engines(&self) -> Result<(), HostError> {
        let h = &self.inner.handler;
        let (engines, enabled) = tokio::try_join!(h.get_search_engines(), h.get_enabled_search_engines())?;
        let enabled = self.non_empty(enabled);
        let default_engine = &self.inner.default_engine;

        self.inner.store.update_with(|state| SearchPatch {
            last_used_search_engine: fallback_search_engine(
                &state.last_used_search_engine,
                &engines,
                &enabled,
                default_engine,
            ),
            search_engines: Some(engines),
            enabled_search_engines: Some(enabled),
            ..Default::default()
        });
        Ok(())
    }

    fn handler(&self) -> Arc<dyn SearchHandler> {
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
    fn model(&self) -> Option<SearchModel> {
        self.model.upgrade().map(|inner| SearchModel { inner })
    }
}

impl SearchEvents for Events {
    fn on_search_prefs_changed(&self) {
        let Some(model) = self.model() else { return };
        let target = model.clone();
        model.inner.prefs_refresh.schedule(move || async move {
            if let Err(error) = target.reload_prefs().await {
                warn!(%error, "search prefs reload failed");
            }
        });
    }

    fn on_search_engines_changed(&self) {
        if let Some(model) = self.model() {
            forward("get_search_engines", async move { model.reload_engines().await });
        }
    }
}
