use std::sync::Arc;

use newtab::binding::{ModelBinding, use_model_state};
use newtab::config::ModelConfig;
use newtab::host::local::LocalHost;
use newtab::host::prefs::{FileStorage, MemoryStorage, PreferenceStorage};
use newtab::host::{BackgroundType, OpenDisposition, TopSitesListKind};
use newtab::models::top_sites::DropLocation;
use newtab::models::{Model, NewTabModel, SearchModel, TopSitesModel};
use serde::Serialize;

fn snapshot(value: &impl Serialize) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!("<unserializable: {e}>"))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = ModelConfig::from_env().expect("invalid configuration");
    let storage: Arc<dyn PreferenceStorage> = match &config.prefs_path {
        Some(path) => Arc::new(FileStorage::open(path).expect("failed to open preference file")),
        None => Arc::new(MemoryStorage::new()),
    };
    let host = Arc::new(LocalHost::new(storage, config.default_search_engine.clone()));

    let new_tab = NewTabModel::new(host.clone(), &config);
    let search = SearchModel::new(host.clone(), &config);
    let top_sites = TopSitesModel::new(host.clone(), &config);
    tokio::join!(new_tab.hydrated(), search.hydrated(), top_sites.hydrated());

    let _background_view = ModelBinding::new(
        new_tab.clone(),
        |s| s.current_background.clone(),
        |background| tracing::info!(background = %snapshot(&**background), "background view rendered"),
    );
    let tiles = use_model_state(top_sites.clone(), |s| s.top_sites.iter().map(|t| t.title.clone()).collect::<Vec<_>>());

    tracing::info!(state = %snapshot(new_tab.get_state().as_ref()), "new tab hydrated");
    tracing::info!(state = %snapshot(search.get_state().as_ref()), "search hydrated");
    tracing::info!(tiles = ?tiles.value(), "top sites hydrated");

    new_tab.select_background(BackgroundType::Solid, "#000000");
    new_tab.set_show_clock(true);

    search.set_search_engine_enabled("duckduckgo.com", true);
    search.set_last_used_search_engine("duckduckgo.com");
    if let Err(error) = search.query_autocomplete("github", "duckduckgo.com").await {
        tracing::warn!(%error, "autocomplete failed");
    }
    tracing::info!(matches = search.get_state().autocomplete_matches.len(), "autocomplete answered");
    if let Err(error) = search.open_search("rust async", "duckduckgo.com", OpenDisposition::CurrentTab).await {
        tracing::warn!(%error, "open search failed");
    }

    let state = top_sites.get_state();
    if let (Some(first), Some(last)) = (state.top_sites.first(), state.top_sites.last()) {
        top_sites.move_top_site(&last.url, &first.url, DropLocation::Before, config.text_direction);
    }
    tracing::info!(tiles = ?tiles.value(), "tiles reordered");

    top_sites.set_list_kind(TopSitesListKind::Custom);
    tokio::time::sleep(config.push_debounce * 2).await;
    if let Err(error) = top_sites.add_top_site("https://www.rust-lang.org/", "Rust").await {
        tracing::warn!(%error, "adding a shortcut failed");
    }

    // Let debounced refetches land before the final snapshot.
    tokio::time::sleep(config.push_debounce * 4).await;
    tracing::info!(state = %snapshot(new_tab.get_state().as_ref()), "new tab final");
    tracing::info!(state = %snapshot(search.get_state().as_ref()), "search final");
    tracing::info!(state = %snapshot(top_sites.get_state().as_ref()), "top sites final");
}
