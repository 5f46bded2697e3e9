//! Boundary with the browser host.
//!
//! DESIGN
//! ======
//! Each model receives its host as an `Arc<dyn …Handler>` at construction
//! instead of reaching for a process-wide proxy. The traits list the queries
//! and commands a model may issue; push notifications flow back through an
//! `…Events` listener registered once per model. Listener registration
//! returns a single [`Subscription`] covering every callback in the bag.
//!
//! ERROR HANDLING
//! ==============
//! Every remote call may fail with [`HostError`]. Models propagate it from
//! awaited actions and only log it on fire-and-forget paths.

pub mod local;
pub mod prefs;
pub mod types;

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::store::Subscription;
pub use types::*;

// =============================================================================
// ERROR TYPE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("remote call {method} failed: {message}")]
    CallFailed { method: &'static str, message: String },
    #[error("host disconnected")]
    Disconnected,
}

impl HostError {
    pub fn call_failed(method: &'static str, message: impl Into<String>) -> Self {
        Self::CallFailed { method, message: message.into() }
    }
}

// =============================================================================
// NEW TAB PAGE
// =============================================================================

#[async_trait::async_trait]
pub trait NewTabPageHandler: Send + Sync {
    async fn get_backgrounds_enabled(&self) -> Result<bool, HostError>;
    async fn get_backgrounds_customizable(&self) -> Result<bool, HostError>;
    async fn get_sponsored_images_enabled(&self) -> Result<bool, HostError>;
    async fn get_selected_background(&self) -> Result<SelectedBackground, HostError>;
    async fn get_brave_backgrounds(&self) -> Result<Vec<BraveBackground>, HostError>;
    async fn get_custom_backgrounds(&self) -> Result<Vec<String>, HostError>;
    async fn get_sponsored_image_background(&self) -> Result<Option<SponsoredImageBackground>, HostError>;
    async fn get_clock_state(&self) -> Result<ClockState, HostError>;
    async fn get_shields_stats_state(&self) -> Result<ShieldsStatsState, HostError>;

    async fn set_backgrounds_enabled(&self, enabled: bool) -> Result<(), HostError>;
    async fn set_sponsored_images_enabled(&self, enabled: bool) -> Result<(), HostError>;
    async fn select_background(&self, selection: SelectedBackground) -> Result<(), HostError>;
    async fn remove_custom_background(&self, image_url: &str) -> Result<(), HostError>;
    async fn set_show_clock(&self, show: bool) -> Result<(), HostError>;
    async fn set_clock_format(&self, format: ClockFormat) -> Result<(), HostError>;
    async fn set_show_shields_stats(&self, show: bool) -> Result<(), HostError>;

    fn add_listener(&self, listener: Arc<dyn NewTabPageEvents>) -> Subscription;
}

/// Push notifications from the new tab page host. Unhandled events are no-ops.
pub trait NewTabPageEvents: Send + Sync {
    fn on_background_prefs_changed(&self) {}
    fn on_custom_backgrounds_changed(&self) {}
    fn on_sponsored_image_changed(&self) {}
    fn on_clock_prefs_changed(&self) {}
    fn on_shields_stats_changed(&self) {}
}

// =============================================================================
// SEARCH
// =============================================================================

#[async_trait::async_trait]
pub trait SearchHandler: Send + Sync {
    async fn get_search_engines(&self) -> Result<Vec<SearchEngineInfo>, HostError>;
    async fn get_enabled_search_engines(&self) -> Result<BTreeSet<String>, HostError>;
    async fn get_last_used_search_engine(&self) -> Result<String, HostError>;
    async fn get_show_search_box(&self) -> Result<bool, HostError>;
    async fn get_search_suggestions_enabled(&self) -> Result<bool, HostError>;
    async fn get_search_suggestions_prompt_dismissed(&self) -> Result<bool, HostError>;

    async fn set_search_engine_enabled(&self, host: &str, enabled: bool) -> Result<(), HostError>;
    async fn set_last_used_search_engine(&self, host: &str) -> Result<(), HostError>;
    async fn set_show_search_box(&self, show: bool) -> Result<(), HostError>;
    async fn set_search_suggestions_enabled(&self, enabled: bool) -> Result<(), HostError>;
    async fn set_search_suggestions_prompt_dismissed(&self, dismissed: bool) -> Result<(), HostError>;

    /// Run an autocomplete query. There is no way to cancel it once sent.
    async fn query_autocomplete(&self, text: &str, engine: &str) -> Result<Vec<AutocompleteMatch>, HostError>;
    /// Advisory: tells the host to stop producing results for the last query.
    async fn stop_autocomplete(&self) -> Result<(), HostError>;
    async fn open_autocomplete_match(&self, index: usize, disposition: OpenDisposition) -> Result<(), HostError>;
    async fn open_search(&self, query: &str, engine: &str, disposition: OpenDisposition) -> Result<(), HostError>;

    fn add_listener(&self, listener: Arc<dyn SearchEvents>) -> Subscription;
}

pub trait SearchEvents: Send + Sync {
    fn on_search_prefs_changed(&self) {}
    fn on_search_engines_changed(&self) {}
}

// =============================================================================
// TOP SITES
// =============================================================================

#[async_trait::async_trait]
pub trait TopSitesHandler: Send + Sync {
    async fn get_show_top_sites(&self) -> Result<bool, HostError>;
    async fn get_top_sites_list_kind(&self) -> Result<TopSitesListKind, HostError>;
    async fn get_top_sites(&self) -> Result<Vec<TopSite>, HostError>;

    async fn set_show_top_sites(&self, show: bool) -> Result<(), HostError>;
    async fn set_top_sites_list_kind(&self, kind: TopSitesListKind) -> Result<(), HostError>;
    async fn add_top_site(&self, url: &str, title: &str) -> Result<(), HostError>;
    async fn update_top_site(&self, current_url: &str, url: &str, title: &str) -> Result<(), HostError>;
    async fn remove_top_site(&self, url: &str) -> Result<(), HostError>;
    async fn undo_remove_top_site(&self) -> Result<(), HostError>;
    async fn set_top_site_position(&self, url: &str, position: usize) -> Result<(), HostError>;

    fn add_listener(&self, listener: Arc<dyn TopSitesEvents>) -> Subscription;
}

pub trait TopSitesEvents: Send + Sync {
    fn on_top_sites_changed(&self) {}
}
