//! Model tunables parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::models::top_sites::TextDirection;

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

pub const DEFAULT_PUSH_DEBOUNCE_MS: u64 = 50;
pub const DEFAULT_UNDO_TIMEOUT_MS: u64 = 4000;
pub const DEFAULT_SEARCH_ENGINE: &str = "search.brave.com";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown NTP_TEXT_DIRECTION: {0} (expected 'ltr' or 'rtl')")]
    TextDirection(String),
    #[error("NTP_DEFAULT_SEARCH_ENGINE must not be empty")]
    EmptySearchEngine,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelConfig {
    /// Quiet window before a burst of push notifications triggers one re-fetch.
    pub push_debounce: Duration,
    /// How long the removed-tile undo notice stays up.
    pub undo_timeout: Duration,
    /// Engine host the search model falls back to.
    pub default_search_engine: String,
    /// Backing file for local preferences; in-memory when absent.
    pub prefs_path: Option<PathBuf>,
    pub text_direction: TextDirection,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            push_debounce: Duration::from_millis(DEFAULT_PUSH_DEBOUNCE_MS),
            undo_timeout: Duration::from_millis(DEFAULT_UNDO_TIMEOUT_MS),
            default_search_engine: DEFAULT_SEARCH_ENGINE.to_string(),
            prefs_path: None,
            text_direction: TextDirection::Ltr,
        }
    }
}

impl ModelConfig {
    /// Build config from environment variables.
    ///
    /// Optional:
    /// - `NTP_PUSH_DEBOUNCE_MS`: default 50
    /// - `NTP_UNDO_TIMEOUT_MS`: default 4000
    /// - `NTP_DEFAULT_SEARCH_ENGINE`: default `search.brave.com`
    /// - `NTP_PREFS_PATH`: JSON preference file
    /// - `NTP_TEXT_DIRECTION`: `ltr` (default) or `rtl`
    pub fn from_env() -> Result<Self, ConfigError> {
        let default_search_engine =
            std::env::var("NTP_DEFAULT_SEARCH_ENGINE").unwrap_or_else(|_| DEFAULT_SEARCH_ENGINE.to_string());
        if default_search_engine.trim().is_empty() {
            return Err(ConfigError::EmptySearchEngine);
        }

        Ok(Self {
            push_debounce: Duration::from_millis(env_parse("NTP_PUSH_DEBOUNCE_MS", DEFAULT_PUSH_DEBOUNCE_MS)),
            undo_timeout: Duration::from_millis(env_parse("NTP_UNDO_TIMEOUT_MS", DEFAULT_UNDO_TIMEOUT_MS)),
            default_search_engine,
            prefs_path: std::env::var_os("NTP_PREFS_PATH").map(PathBuf::from),
            text_direction: parse_text_direction(std::env::var("NTP_TEXT_DIRECTION").ok().as_deref())?,
        })
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn parse_text_direction(raw: Option<&str>) -> Result<TextDirection, ConfigError> {
    match raw.unwrap_or("ltr") {
        "ltr" => Ok(TextDirection::Ltr),
        "rtl" => Ok(TextDirection::Rtl),
        other => Err(ConfigError::TextDirection(other.to_string())),
    }
}
