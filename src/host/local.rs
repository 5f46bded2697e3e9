//! In-process host implementation.
//!
//! DESIGN
//! ======
//! `LocalHost` stands in for the browser side when there is none: it keeps
//! every preference in memory, persists the enabled search engine map
//! through a [`PreferenceStorage`], and fires the same push events the real
//! host would after each mutation. The binary runs against it and the model
//! tests use it as their collaborator.
//!
//! Listeners are invoked after the state lock is released, so a listener
//! may call straight back into the host.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, trace};

use super::prefs::{PreferenceStorage, load_enabled_engines, save_enabled_engines};
use super::*;
use crate::store::{ListenerSet, Subscription};

#[cfg(test)]
#[path = "local_test.rs"]
mod tests;

// =============================================================================
// STATE
// =============================================================================

struct LocalState {
    backgrounds_enabled: bool,
    backgrounds_customizable: bool,
    sponsored_images_enabled: bool,
    selected_background: SelectedBackground,
    brave_backgrounds: Vec<BraveBackground>,
    custom_backgrounds: Vec<String>,
    sponsored_image: Option<SponsoredImageBackground>,
    clock: ClockState,
    shields: ShieldsStatsState,

    search_engines: Vec<SearchEngineInfo>,
    last_used_search_engine: String,
    show_search_box: bool,
    search_suggestions_enabled: bool,
    search_suggestions_prompt_dismissed: bool,
    history: Vec<TopSite>,

    show_top_sites: bool,
    list_kind: TopSitesListKind,
    custom_sites: Vec<TopSite>,
    most_visited_sites: Vec<TopSite>,
    excluded_urls: BTreeSet<String>,
    last_removed: Option<RemovedSite>,
}

struct RemovedSite {
    kind: TopSitesListKind,
    index: usize,
    site: TopSite,
}

fn engine(host: &str, name: &str, keyword: &str) -> SearchEngineInfo {
    SearchEngineInfo {
        host: host.to_string(),
        name: name.to_string(),
        keyword: keyword.to_string(),
        favicon_url: format!("https://{host}/favicon.ico"),
    }
}

fn brave_image(file: &str, author: &str) -> BraveBackground {
    BraveBackground {
        image_url: format!("chrome://background-wallpaper/{file}"),
        author: author.to_string(),
        link: "https://brave.com/".to_string(),
    }
}

impl LocalState {
    fn seeded(default_engine: &str) -> Self {
        let mut search_engines = vec![
            engine("search.brave.com", "Brave Search", ":br"),
            engine("duckduckgo.com", "DuckDuckGo", ":d"),
            engine("www.google.com", "Google", ":g"),
            engine("www.bing.com", "Bing", ":b"),
            engine("www.startpage.com", "Startpage", ":sp"),
        ];
        if !search_engines.iter().any(|e| e.host == default_engine) {
            search_engines.insert(0, engine(default_engine, default_engine, ""));
        }

        let most_visited_sites = vec![
            TopSite::new("Brave", "https://brave.com/"),
            TopSite::new("Wikipedia", "https://www.wikipedia.org/"),
            TopSite::new("GitHub", "https://github.com/"),
            TopSite::new("Hacker News", "https://news.ycombinator.com/"),
        ];

        Self {
            backgrounds_enabled: true,
            backgrounds_customizable: true,
            sponsored_images_enabled: true,
            selected_background: SelectedBackground::default(),
            brave_backgrounds: vec![
                brave_image("dylan-malval_sea-min.webp", "Dylan Malval"),
                brave_image("alex-plesovskich.webp", "Alex Plesovskich"),
                brave_image("sora-sagano.webp", "Sora Sagano"),
            ],
            custom_backgrounds: Vec::new(),
            sponsored_image: None,
            clock: ClockState::default(),
            shields: ShieldsStatsState { show_shields_stats: true, stats: ShieldsStats::default() },

            search_engines,
            last_used_search_engine: default_engine.to_string(),
            show_search_box: true,
            search_suggestions_enabled: false,
            search_suggestions_prompt_dismissed: false,
            history: most_visited_sites.clone(),

            show_top_sites: true,
            list_kind: TopSitesListKind::MostVisited,
            custom_sites: Vec::new(),
            most_visited_sites,
            excluded_urls: BTreeSet::new(),
            last_removed: None,
        }
    }

    fn visible_most_visited(&self) -> Vec<TopSite> {
        self.most_visited_sites
            .iter()
            .filter(|site| !self.excluded_urls.contains(&site.url))
            .cloned()
            .collect()
    }
}

// =============================================================================
// LOCAL HOST
// =============================================================================

pub struct LocalHost {
    state: Mutex<LocalState>,
    storage: Arc<dyn PreferenceStorage>,
    default_engine: String,
    connected: AtomicBool,
    calls: Mutex<HashMap<&'static str, usize>>,
    new_tab_listeners: ListenerSet<dyn NewTabPageEvents>,
    search_listeners: ListenerSet<dyn SearchEvents>,
    top_sites_listeners: ListenerSet<dyn TopSitesEvents>,
}

impl LocalHost {
    pub fn new(storage: Arc<dyn PreferenceStorage>, default_engine: impl Into<String>) -> Self {
        let default_engine = default_engine.into();
        Self {
            state: Mutex::new(LocalState::seeded(&default_engine)),
            storage,
            default_engine,
            connected: AtomicBool::new(true),
            calls: Mutex::new(HashMap::new()),
            new_tab_listeners: ListenerSet::new(),
            search_listeners: ListenerSet::new(),
            top_sites_listeners: ListenerSet::new(),
        }
    }

    /// Make every subsequent call fail with [`HostError::Disconnected`].
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    /// How many times `method` has been called on this host.
    #[must_use]
    pub fn calls(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    // -------------------------------------------------------------------------
    // Host-originated changes
    // -------------------------------------------------------------------------

    /// Start or stop showing a sponsored image.
    pub fn set_sponsored_image(&self, image: Option<SponsoredImageBackground>) {
        self.state().sponsored_image = image;
        self.emit_new_tab(|l| l.on_sponsored_image_changed());
    }

    /// Add an uploaded background.
    pub fn add_custom_background(&self, image_url: impl Into<String>) {
        self.state().custom_backgrounds.push(image_url.into());
        self.emit_new_tab(|l| l.on_custom_backgrounds_changed());
    }

    pub fn set_shields_stats(&self, stats: ShieldsStats) {
        self.state().shields.stats = stats;
        self.emit_new_tab(|l| l.on_shields_stats_changed());
    }

    pub fn set_most_visited(&self, sites: Vec<TopSite>) {
        {
            let mut state = self.state();
            state.history.clone_from(&sites);
            state.most_visited_sites = sites;
        }
        self.emit_top_sites(|l| l.on_top_sites_changed());
    }

    #[must_use]
    pub fn selected_background(&self) -> SelectedBackground {
        self.state().selected_background.clone()
    }

    #[must_use]
    pub fn custom_sites(&self) -> Vec<TopSite> {
        self.state().custom_sites.clone()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn state(&self) -> MutexGuard<'_, LocalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enter(&self, method: &'static str) -> Result<(), HostError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(method)
            .or_insert(0) += 1;
        trace!(method, "local host call");
        if self.connected.load(Ordering::SeqCst) { Ok(()) } else { Err(HostError::Disconnected) }
    }

    fn emit_new_tab(&self, event: impl Fn(&dyn NewTabPageEvents)) {
        for listener in self.new_tab_listeners.snapshot() {
            event(listener.as_ref());
        }
    }

    fn emit_search(&self, event: impl Fn(&dyn SearchEvents)) {
        for listener in self.search_listeners.snapshot() {
            event(listener.as_ref());
        }
    }

    fn emit_top_sites(&self, event: impl Fn(&dyn TopSitesEvents)) {
        for listener in self.top_sites_listeners.snapshot() {
            event(listener.as_ref());
        }
    }

    fn current_sites(state: &mut LocalState) -> &mut Vec<TopSite> {
        match state.list_kind {
            TopSitesListKind::Custom => &mut state.custom_sites,
            TopSitesListKind::MostVisited => &mut state.most_visited_sites,
        }
    }
}

// =============================================================================
// NEW TAB PAGE
// =============================================================================

#[async_trait::async_trait]
impl NewTabPageHandler for LocalHost {
    async fn get_backgrounds_enabled(&self) -> Result<bool, HostError> {
        self.enter("get_backgrounds_enabled")?;
        Ok(self.state().backgrounds_enabled)
    }

    async fn get_backgrounds_customizable(&self) -> Result<bool, HostError> {
        self.enter("get_backgrounds_customizable")?;
        Ok(self.state().backgrounds_customizable)
    }

    async fn get_sponsored_images_enabled(&self) -> Result<bool, HostError> {
        self.enter("get_sponsored_images_enabled")?;
        Ok(self.state().sponsored_images_enabled)
    }

    async fn get_selected_background(&self) -> Result<SelectedBackground, HostError> {
        self.enter("get_selected_background")?;
        Ok(self.state().selected_background.clone())
    }

    async fn get_brave_backgrounds(&self) -> Result<Vec<BraveBackground>, HostError> {
        self.enter("get_brave_backgrounds")?;
        Ok(self.state().brave_backgrounds.clone())
    }

    async fn get_custom_backgrounds(&self) -> Result<Vec<String>, HostError> {
        self.enter("get_custom_backgrounds")?;
        Ok(self.state().custom_backgrounds.clone())
    }

    async fn get_sponsored_image_background(&self) -> Result<Option<SponsoredImageBackground>, HostError> {
        self.enter("get_sponsored_image_background")?;
        let state = self.state();
        if state.backgrounds_enabled && state.sponsored_images_enabled {
            Ok(state.sponsored_image.clone())
        } else {
            Ok(None)
        }
    }

    async fn get_clock_state(&self) -> Result<ClockState, HostError> {
        self.enter("get_clock_state")?;
        Ok(self.state().clock)
    }

    async fn get_shields_stats_state(&self) -> Result<ShieldsStatsState, HostError> {
        self.enter("get_shields_stats_state")?;
        Ok(self.state().shields)
    }

    async fn set_backgrounds_enabled(&self, enabled: bool) -> Result<(), HostError> {
        self.enter("set_backgrounds_enabled")?;
        self.state().backgrounds_enabled = enabled;
        self.emit_new_tab(|l| l.on_background_prefs_changed());
        Ok(())
    }

    async fn set_sponsored_images_enabled(&self, enabled: bool) -> Result<(), HostError> {
        self.enter("set_sponsored_images_enabled")?;
        self.state().sponsored_images_enabled = enabled;
        self.emit_new_tab(|l| l.on_background_prefs_changed());
        Ok(())
    }

    async fn select_background(&self, selection: SelectedBackground) -> Result<(), HostError> {
        self.enter("select_background")?;
        debug!(kind = ?selection.kind, value = %selection.value, "background selected");
        self.state().selected_background = selection;
        self.emit_new_tab(|l| l.on_background_prefs_changed());
        Ok(())
    }

    async fn remove_custom_background(&self, image_url: &str) -> Result<(), HostError> {
        self.enter("remove_custom_background")?;
        {
            let mut state = self.state();
            let before = state.custom_backgrounds.len();
            state.custom_backgrounds.retain(|url| url != image_url);
            if state.custom_backgrounds.len() == before {
                return Err(HostError::call_failed("remove_custom_background", format!("no such background: {image_url}")));
            }
            let selected = &state.selected_background;
            if selected.kind == BackgroundType::Custom && (selected.value == image_url || state.custom_backgrounds.is_empty())
            {
                state.selected_background = SelectedBackground::default();
            }
        }
        self.emit_new_tab(|l| l.on_custom_backgrounds_changed());
        Ok(())
    }

    async fn set_show_clock(&self, show: bool) -> Result<(), HostError> {
        self.enter("set_show_clock")?;
        self.state().clock.show_clock = show;
        self.emit_new_tab(|l| l.on_clock_prefs_changed());
        Ok(())
    }

    async fn set_clock_format(&self, format: ClockFormat) -> Result<(), HostError> {
        self.enter("set_clock_format")?;
        self.state().clock.clock_format = format;
        self.emit_new_tab(|l| l.on_clock_prefs_changed());
        Ok(())
    }

    async fn set_show_shields_stats(&self, show: bool) -> Result<(), HostError> {
        self.enter("set_show_shields_stats")?;
        self.state().shields.show_shields_stats = show;
        self.emit_new_tab(|l| l.on_shields_stats_changed());
        Ok(())
    }

    fn add_listener(&self, listener: Arc<dyn NewTabPageEvents>) -> Subscription {
        self.new_tab_listeners.add(listener)
    }
}

// =============================================================================
// SEARCH
// =============================================================================

#[async_trait::async_trait]
impl SearchHandler for LocalHost {
    async fn get_search_engines(&self) -> Result<Vec<SearchEngineInfo>, HostError> {
        self.enter("get_search_engines")?;
        Ok(self.state().search_engines.clone())
    }

    async fn get_enabled_search_engines(&self) -> Result<BTreeSet<String>, HostError> {
        self.enter("get_enabled_search_engines")?;
        Ok(load_enabled_engines(self.storage.as_ref(), &self.default_engine))
    }

    async fn get_last_used_search_engine(&self) -> Result<String, HostError> {
        self.enter("get_last_used_search_engine")?;
        Ok(self.state().last_used_search_engine.clone())
    }

    async fn get_show_search_box(&self) -> Result<bool, HostError> {
        self.enter("get_show_search_box")?;
        Ok(self.state().show_search_box)
    }

    async fn get_search_suggestions_enabled(&self) -> Result<bool, HostError> {
        self.enter("get_search_suggestions_enabled")?;
        Ok(self.state().search_suggestions_enabled)
    }

    async fn get_search_suggestions_prompt_dismissed(&self) -> Result<bool, HostError> {
        self.enter("get_search_suggestions_prompt_dismissed")?;
        Ok(self.state().search_suggestions_prompt_dismissed)
    }

    async fn set_search_engine_enabled(&self, host: &str, enabled: bool) -> Result<(), HostError> {
        self.enter("set_search_engine_enabled")?;
        {
            // Held across load and save.
            let state = self.state();
            let mut engines = load_enabled_engines(self.storage.as_ref(), &self.default_engine);
            if enabled {
                engines.insert(host.to_string());
            } else if engines.len() > 1 {
                engines.remove(host);
            }
            save_enabled_engines(self.storage.as_ref(), &state.search_engines, &engines)
                .map_err(|e| HostError::call_failed("set_search_engine_enabled", e.to_string()))?;
        }
        self.emit_search(|l| l.on_search_prefs_changed());
        Ok(())
    }

    async fn set_last_used_search_engine(&self, host: &str) -> Result<(), HostError> {
        self.enter("set_last_used_search_engine")?;
        self.state().last_used_search_engine = host.to_string();
        self.emit_search(|l| l.on_search_prefs_changed());
        Ok(())
    }

    async fn set_show_search_box(&self, show: bool) -> Result<(), HostError> {
        self.enter("set_show_search_box")?;
        self.state().show_search_box = show;
        self.emit_search(|l| l.on_search_prefs_changed());
        Ok(())
    }

    async fn set_search_suggestions_enabled(&self, enabled: bool) -> Result<(), HostError> {
        self.enter("set_search_suggestions_enabled")?;
        self.state().search_suggestions_enabled = enabled;
        self.emit_search(|l| l.on_search_prefs_changed());
        Ok(())
    }

    async fn set_search_suggestions_prompt_dismissed(&self, dismissed: bool) -> Result<(), HostError> {
        self.enter("set_search_suggestions_prompt_dismissed")?;
        self.state().search_suggestions_prompt_dismissed = dismissed;
        self.emit_search(|l| l.on_search_prefs_changed());
        Ok(())
    }

    async fn query_autocomplete(&self, text: &str, engine: &str) -> Result<Vec<AutocompleteMatch>, HostError> {
        self.enter("query_autocomplete")?;
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let state = self.state();
        let search_url = format!("https://{engine}/search?q={}", text.trim().replace(' ', "+"));
        let mut matches = vec![AutocompleteMatch {
            contents: text.trim().to_string(),
            description: format!("Search {engine}"),
            destination_url: search_url,
            image_url: String::new(),
            allowed_to_be_default_match: true,
        }];
        matches.extend(
            state
                .history
                .iter()
                .filter(|site| site.title.to_lowercase().contains(&needle) || site.url.contains(&needle))
                .map(|site| AutocompleteMatch {
                    contents: site.url.clone(),
                    description: site.title.clone(),
                    destination_url: site.url.clone(),
                    image_url: site.favicon.clone(),
                    allowed_to_be_default_match: false,
                }),
        );
        Ok(matches)
    }

    async fn stop_autocomplete(&self) -> Result<(), HostError> {
        self.enter("stop_autocomplete")
    }

    async fn open_autocomplete_match(&self, index: usize, disposition: OpenDisposition) -> Result<(), HostError> {
        self.enter("open_autocomplete_match")?;
        debug!(index, ?disposition, "open autocomplete match");
        Ok(())
    }

    async fn open_search(&self, query: &str, engine: &str, disposition: OpenDisposition) -> Result<(), HostError> {
        self.enter("open_search")?;
        if query.trim().is_empty() {
            return Err(HostError::call_failed("open_search", "empty query"));
        }
        debug!(%engine, ?disposition, "open search");
        Ok(())
    }

    fn add_listener(&self, listener: Arc<dyn SearchEvents>) -> Subscription {
        self.search_listeners.add(listener)
    }
}

// =============================================================================
// TOP SITES
// =============================================================================

#[async_trait::async_trait]
impl TopSitesHandler for LocalHost {
    async fn get_show_top_sites(&self) -> Result<bool, HostError> {
        self.enter("get_show_top_sites")?;
        Ok(self.state().show_top_sites)
    }

    async fn get_top_sites_list_kind(&self) -> Result<TopSitesListKind, HostError> {
        self.enter("get_top_sites_list_kind")?;
        Ok(self.state().list_kind)
    }

    async fn get_top_sites(&self) -> Result<Vec<TopSite>, HostError> {
        self.enter("get_top_sites")?;
        let state = self.state();
        Ok(match state.list_kind {
            TopSitesListKind::Custom => state.custom_sites.clone(),
            TopSitesListKind::MostVisited => state.visible_most_visited(),
        })
    }

    async fn set_show_top_sites(&self, show: bool) -> Result<(), HostError> {
        self.enter("set_show_top_sites")?;
        self.state().show_top_sites = show;
        self.emit_top_sites(|l| l.on_top_sites_changed());
        Ok(())
    }

    async fn set_top_sites_list_kind(&self, kind: TopSitesListKind) -> Result<(), HostError> {
        self.enter("set_top_sites_list_kind")?;
        self.state().list_kind = kind;
        self.emit_top_sites(|l| l.on_top_sites_changed());
        Ok(())
    }

    async fn add_top_site(&self, url: &str, title: &str) -> Result<(), HostError> {
        self.enter("add_top_site")?;
        {
            let mut state = self.state();
            if state.custom_sites.iter().any(|site| site.url == url) {
                return Err(HostError::call_failed("add_top_site", format!("already present: {url}")));
            }
            let title = if title.is_empty() { url } else { title };
            state.custom_sites.push(TopSite::new(title, url));
        }
        self.emit_top_sites(|l| l.on_top_sites_changed());
        Ok(())
    }

    async fn update_top_site(&self, current_url: &str, url: &str, title: &str) -> Result<(), HostError> {
        self.enter("update_top_site")?;
        {
            let mut state = self.state();
            let Some(site) = state.custom_sites.iter_mut().find(|site| site.url == current_url) else {
                return Err(HostError::call_failed("update_top_site", format!("no such site: {current_url}")));
            };
            *site = TopSite::new(if title.is_empty() { url } else { title }, url);
        }
        self.emit_top_sites(|l| l.on_top_sites_changed());
        Ok(())
    }

    async fn remove_top_site(&self, url: &str) -> Result<(), HostError> {
        self.enter("remove_top_site")?;
        {
            let mut state = self.state();
            let kind = state.list_kind;
            let removed = match kind {
                TopSitesListKind::Custom => state
                    .custom_sites
                    .iter()
                    .position(|site| site.url == url)
                    .map(|index| (index, state.custom_sites.remove(index))),
                TopSitesListKind::MostVisited => {
                    let visible = state.visible_most_visited();
                    let found = visible
                        .iter()
                        .position(|site| site.url == url)
                        .map(|index| (index, visible[index].clone()));
                    if found.is_some() {
                        state.excluded_urls.insert(url.to_string());
                    }
                    found
                }
            };
            let Some((index, site)) = removed else {
                return Err(HostError::call_failed("remove_top_site", format!("no such site: {url}")));
            };
            state.last_removed = Some(RemovedSite { kind, index, site });
        }
        self.emit_top_sites(|l| l.on_top_sites_changed());
        Ok(())
    }

    async fn undo_remove_top_site(&self) -> Result<(), HostError> {
        self.enter("undo_remove_top_site")?;
        {
            let mut state = self.state();
            let Some(removed) = state.last_removed.take() else {
                return Ok(());
            };
            match removed.kind {
                TopSitesListKind::Custom => {
                    let index = removed.index.min(state.custom_sites.len());
                    state.custom_sites.insert(index, removed.site);
                }
                TopSitesListKind::MostVisited => {
                    state.excluded_urls.remove(&removed.site.url);
                }
            }
        }
        self.emit_top_sites(|l| l.on_top_sites_changed());
        Ok(())
    }

    async fn set_top_site_position(&self, url: &str, position: usize) -> Result<(), HostError> {
        self.enter("set_top_site_position")?;
        {
            let mut state = self.state();
            let sites = Self::current_sites(&mut state);
            let Some(from) = sites.iter().position(|site| site.url == url) else {
                return Err(HostError::call_failed("set_top_site_position", format!("no such site: {url}")));
            };
            let site = sites.remove(from);
            let to = position.min(sites.len());
            sites.insert(to, site);
        }
        self.emit_top_sites(|l| l.on_top_sites_changed());
        Ok(())
    }

    fn add_listener(&self, listener: Arc<dyn TopSitesEvents>) -> Subscription {
        self.top_sites_listeners.add(listener)
    }
}
