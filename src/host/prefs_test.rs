use super::*;

fn engine(host: &str) -> SearchEngineInfo {
    SearchEngineInfo { host: host.into(), name: host.into(), ..Default::default() }
}

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("newtab-prefs-{}.json", uuid::Uuid::new_v4()))
}

// =============================================================================
// load_enabled_engines
// =============================================================================

#[test]
fn absent_preference_enables_default_only() {
    let storage = MemoryStorage::new();
    let enabled = load_enabled_engines(&storage, "search.brave.com");
    assert_eq!(enabled, BTreeSet::from(["search.brave.com".to_string()]));
}

#[test]
fn malformed_preference_is_treated_as_absent() {
    let storage = MemoryStorage::new();
    storage.set(ENABLED_SEARCH_ENGINES_KEY, "{not json").unwrap();
    let enabled = load_enabled_engines(&storage, "search.brave.com");
    assert_eq!(enabled, BTreeSet::from(["search.brave.com".to_string()]));
}

#[test]
fn wrong_shape_is_treated_as_absent() {
    let storage = MemoryStorage::new();
    storage.set(ENABLED_SEARCH_ENGINES_KEY, r#"["google.com"]"#).unwrap();
    let enabled = load_enabled_engines(&storage, "search.brave.com");
    assert_eq!(enabled.len(), 1);
    assert!(enabled.contains("search.brave.com"));
}

#[test]
fn all_false_map_falls_back_to_default() {
    let storage = MemoryStorage::new();
    storage.set(ENABLED_SEARCH_ENGINES_KEY, r#"{"google.com":false}"#).unwrap();
    let enabled = load_enabled_engines(&storage, "search.brave.com");
    assert_eq!(enabled, BTreeSet::from(["search.brave.com".to_string()]));
}

#[test]
fn stored_map_selects_true_entries() {
    let storage = MemoryStorage::new();
    storage
        .set(ENABLED_SEARCH_ENGINES_KEY, r#"{"google.com":true,"bing.com":false,"duckduckgo.com":true}"#)
        .unwrap();
    let enabled = load_enabled_engines(&storage, "search.brave.com");
    assert_eq!(enabled, BTreeSet::from(["duckduckgo.com".to_string(), "google.com".to_string()]));
}

// =============================================================================
// save_enabled_engines
// =============================================================================

#[test]
fn save_writes_every_known_engine() {
    let storage = MemoryStorage::new();
    let engines = vec![engine("search.brave.com"), engine("google.com")];
    let enabled = BTreeSet::from(["google.com".to_string()]);

    save_enabled_engines(&storage, &engines, &enabled).unwrap();

    let raw = storage.get(ENABLED_SEARCH_ENGINES_KEY).unwrap();
    let map: BTreeMap<String, bool> = serde_json::from_str(&raw).unwrap();
    assert_eq!(map.get("google.com"), Some(&true));
    assert_eq!(map.get("search.brave.com"), Some(&false));
    assert_eq!(load_enabled_engines(&storage, "search.brave.com"), enabled);
}

// =============================================================================
// FileStorage
// =============================================================================

#[test]
fn file_storage_starts_empty_when_missing() {
    let path = temp_path();
    let storage = FileStorage::open(&path).unwrap();
    assert!(storage.get("anything").is_none());
    assert!(!path.exists());
}

#[test]
fn file_storage_persists_across_opens() {
    let path = temp_path();
    {
        let storage = FileStorage::open(&path).unwrap();
        storage.set("theme", "dark").unwrap();
    }
    let reopened = FileStorage::open(&path).unwrap();
    assert_eq!(reopened.get("theme").as_deref(), Some("dark"));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn file_storage_rejects_malformed_file() {
    let path = temp_path();
    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(FileStorage::open(&path), Err(StorageError::Json(_))));
    std::fs::remove_file(&path).unwrap();
}
