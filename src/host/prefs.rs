//! Local preference storage.
//!
//! DESIGN
//! ======
//! A flat string-to-string store, either in memory or backed by one JSON
//! object file. The only structured value kept here is the enabled search
//! engine map: a JSON object of engine host to bool under
//! [`ENABLED_SEARCH_ENGINES_KEY`]. It is the fallback used when the host has
//! no richer preference for the enabled set.
//!
//! ERROR HANDLING
//! ==============
//! Malformed engine-map data is logged and treated as absent, which falls
//! back to "only the default engine enabled". File I/O and encoding errors
//! on write surface as [`StorageError`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use super::types::SearchEngineInfo;

#[cfg(test)]
#[path = "prefs_test.rs"]
mod tests;

pub const ENABLED_SEARCH_ENGINES_KEY: &str = "ntp-enabled-search-engines";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("preference file i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("preference encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait PreferenceStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns a [`StorageError`] if the value cannot be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

// =============================================================================
// MEMORY STORAGE
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// FILE STORAGE
// =============================================================================

/// All preferences in one JSON object file, rewritten whole on every `set`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open `path`, starting empty if the file does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self { path, values: Mutex::new(values) })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, values: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let encoded = serde_json::to_string_pretty(values)?;
        let tmp = self
            .path
            .with_extension(format!("tmp-{}", uuid::Uuid::new_v4()));
        std::fs::write(&tmp, encoded)?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

impl PreferenceStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = values.insert(key.to_string(), value.to_string());
        if let Err(e) = self.write(&values) {
            // Keep memory and disk in agreement.
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }
}

// =============================================================================
// ENABLED SEARCH ENGINES
// =============================================================================

/// Read the enabled engine set, falling back to `{default_host}` when the
/// stored map is missing, malformed, or enables nothing.
pub fn load_enabled_engines(storage: &dyn PreferenceStorage, default_host: &str) -> BTreeSet<String> {
    let fallback = || BTreeSet::from([default_host.to_string()]);

    let Some(raw) = storage.get(ENABLED_SEARCH_ENGINES_KEY) else {
        return fallback();
    };
    let map: BTreeMap<String, bool> = match serde_json::from_str(&raw) {
        Ok(map) => map,
        Err(error) => {
            warn!(%error, key = ENABLED_SEARCH_ENGINES_KEY, "ignoring malformed engine preference");
            return fallback();
        }
    };

    let enabled: BTreeSet<String> = map
        .into_iter()
        .filter_map(|(host, on)| on.then_some(host))
        .collect();
    if enabled.is_empty() { fallback() } else { enabled }
}

/// Persist the enabled set as a host-to-bool map covering every known engine.
///
/// # Errors
///
/// Returns a [`StorageError`] if the map cannot be encoded or written.
pub fn save_enabled_engines(
    storage: &dyn PreferenceStorage,
    engines: &[SearchEngineInfo],
    enabled: &BTreeSet<String>,
) -> Result<(), StorageError> {
    let mut map: BTreeMap<&str, bool> = engines
        .iter()
        .map(|engine| (engine.host.as_str(), enabled.contains(&engine.host)))
        .collect();
    for host in enabled {
        map.insert(host.as_str(), true);
    }
    storage.set(ENABLED_SEARCH_ENGINES_KEY, &serde_json::to_string(&map)?)
}
