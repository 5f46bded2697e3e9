//! Choosing which background the page shows.
//!
//! Precedence, first match wins:
//! 1. backgrounds disabled: the default gradient
//! 2. a sponsored image is present: the sponsored image
//! 3. the current background already has the selected type and no explicit
//!    value is selected: keep it
//! 4. otherwise the explicit value, or a uniformly random candidate of the
//!    selected type; `none` (or no candidates) gives the default gradient
//!
//! Only step 4's random pick depends on the RNG.

use rand::Rng;
use rand::seq::IndexedRandom;

use super::new_tab::NewTabState;
use crate::host::{Background, BackgroundType, GRADIENT_BACKGROUNDS, SOLID_BACKGROUNDS};

#[cfg(test)]
#[path = "background_test.rs"]
mod tests;

pub fn compute_current_background<R: Rng + ?Sized>(state: &NewTabState, rng: &mut R) -> Background {
    if !state.backgrounds_enabled {
        return Background::default();
    }
    if let Some(sponsored) = &state.sponsored_image_background {
        return Background::Sponsored(sponsored.clone());
    }

    let selected = state.selected_background.as_str();
    if let Some(current) = &state.current_background {
        if selected.is_empty() && current.background_type() == Some(state.selected_background_type) {
            return current.clone();
        }
    }

    let chosen = match state.selected_background_type {
        BackgroundType::None => None,
        BackgroundType::Brave => state
            .brave_backgrounds
            .iter()
            .find(|b| !selected.is_empty() && b.image_url == selected)
            .or_else(|| state.brave_backgrounds.choose(rng))
            .cloned()
            .map(Background::Brave),
        BackgroundType::Custom => explicit_or_random(selected, &state.custom_backgrounds, rng)
            .map(|image_url| Background::Custom { image_url }),
        BackgroundType::Solid => {
            explicit_or_random(selected, SOLID_BACKGROUNDS, rng).map(|css_value| Background::Solid { css_value })
        }
        BackgroundType::Gradient => {
            explicit_or_random(selected, GRADIENT_BACKGROUNDS, rng).map(|css_value| Background::Gradient { css_value })
        }
    };

    chosen.unwrap_or_default()
}

fn explicit_or_random<R, T>(selected: &str, candidates: &[T], rng: &mut R) -> Option<String>
where
    R: Rng + ?Sized,
    T: AsRef<str>,
{
    if selected.is_empty() {
        candidates.choose(rng).map(|c| c.as_ref().to_string())
    } else {
        Some(selected.to_string())
    }
}
