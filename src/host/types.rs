//! Records exchanged with the host.
//!
//! These mirror the shapes the browser side returns from its `get*` queries
//! and accepts in its commands. Everything serializes with serde so the
//! local host can persist it and the binary can log it.

use serde::{Deserialize, Serialize};

// =============================================================================
// BACKGROUNDS
// =============================================================================

/// Gradient shown when backgrounds are off or nothing else applies.
pub const DEFAULT_GRADIENT: &str = "linear-gradient(125.83deg, #392DD1 0%, #A91B78 99.09%)";

pub const SOLID_BACKGROUNDS: &[&str] = &[
    "#5B5C63", "#000000", "#151E9A", "#2197F9", "#1FC3DC", "#086582", "#67D4B4", "#077D5A", "#3C790B",
    "#AFCE57", "#F0CB44", "#F28A29", "#FC798F", "#C1226E", "#FAB5EE", "#C0C4FF", "#9677EE", "#5433B0",
    "#4A000C",
];

pub const GRADIENT_BACKGROUNDS: &[&str] = &[
    "linear-gradient(125.83deg, #392DD1 0%, #A91B78 99.09%)",
    "linear-gradient(125.83deg, #392DD1 0%, #22B8CF 99.09%)",
    "linear-gradient(90deg, #4F30AB 0.64%, #845EF7 99.36%)",
    "linear-gradient(126.47deg, #A43CE4 16.99%, #A72B6D 86.15%)",
    "radial-gradient(137.45% 131.59% at -2.29% 100.55%, #F3A2A2 0%, #A2A0FF 100%)",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundType {
    None,
    #[default]
    Brave,
    Custom,
    Solid,
    Gradient,
}

/// A background image shipped with the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BraveBackground {
    pub image_url: String,
    pub author: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsoredImageBackground {
    pub image_url: String,
    pub creative_instance_id: String,
    pub target_url: String,
    pub logo_image_url: String,
}

/// The user's persisted background choice. An empty `value` means "pick one".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedBackground {
    #[serde(rename = "type")]
    pub kind: BackgroundType,
    pub value: String,
}

/// The background actually displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Background {
    Brave(BraveBackground),
    Custom { image_url: String },
    Solid { css_value: String },
    Gradient { css_value: String },
    Sponsored(SponsoredImageBackground),
}

impl Background {
    /// The selectable type this background belongs to. Sponsored images
    /// belong to none.
    #[must_use]
    pub fn background_type(&self) -> Option<BackgroundType> {
        match self {
            Self::Brave(_) => Some(BackgroundType::Brave),
            Self::Custom { .. } => Some(BackgroundType::Custom),
            Self::Solid { .. } => Some(BackgroundType::Solid),
            Self::Gradient { .. } => Some(BackgroundType::Gradient),
            Self::Sponsored(_) => None,
        }
    }

    #[must_use]
    pub fn css_value(&self) -> Option<&str> {
        match self {
            Self::Solid { css_value } | Self::Gradient { css_value } => Some(css_value),
            _ => None,
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::Gradient { css_value: DEFAULT_GRADIENT.to_string() }
    }
}

// =============================================================================
// WIDGETS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockFormat {
    #[default]
    Auto,
    H12,
    H24,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockState {
    pub show_clock: bool,
    pub clock_format: ClockFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldsStats {
    pub ads_blocked: u64,
    pub bandwidth_saved_bytes: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShieldsStatsState {
    pub show_shields_stats: bool,
    pub stats: ShieldsStats,
}

// =============================================================================
// SEARCH
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchEngineInfo {
    pub host: String,
    pub name: String,
    pub keyword: String,
    pub favicon_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutocompleteMatch {
    pub contents: String,
    pub description: String,
    pub destination_url: String,
    pub image_url: String,
    pub allowed_to_be_default_match: bool,
}

/// Where a navigation triggered from the page should open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenDisposition {
    #[default]
    CurrentTab,
    NewForegroundTab,
    NewBackgroundTab,
}

// =============================================================================
// TOP SITES
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopSitesListKind {
    Custom,
    #[default]
    MostVisited,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSite {
    pub title: String,
    pub url: String,
    pub favicon: String,
}

impl TopSite {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let favicon = format!("chrome://favicon2/?pageUrl={url}");
        Self { title: title.into(), url, favicon }
    }
}
