use std::time::Duration;

use super::*;
use crate::host::test_helpers::{local_host, test_config, wait_for};
use crate::host::{DEFAULT_GRADIENT, SponsoredImageBackground};

async fn hydrated_model() -> (Arc<crate::host::local::LocalHost>, NewTabModel) {
    let host = local_host();
    let model = NewTabModel::new(host.clone(), &test_config());
    model.hydrated().await;
    (host, model)
}

fn sponsored() -> SponsoredImageBackground {
    SponsoredImageBackground {
        image_url: "chrome://branded-wallpaper/sponsor.jpg".into(),
        creative_instance_id: "ci-7".into(),
        target_url: "https://sponsor.example".into(),
        logo_image_url: String::new(),
    }
}

#[test]
fn default_state() {
    let state = NewTabState::default();
    assert!(state.backgrounds_enabled);
    assert!(state.sponsored_images_enabled);
    assert_eq!(state.selected_background_type, BackgroundType::Brave);
    assert!(state.selected_background.is_empty());
    assert!(state.current_background.is_none());
    assert!(!state.show_clock);
    assert!(state.show_shields_stats);
}

#[tokio::test]
async fn hydration_picks_a_brave_background() {
    let (_host, model) = hydrated_model().await;
    let state = model.get_state();

    assert_eq!(state.brave_backgrounds.len(), 3);
    let Some(Background::Brave(shown)) = &state.current_background else {
        panic!("expected a brave background, got {:?}", state.current_background);
    };
    assert!(state.brave_backgrounds.contains(shown));
}

#[tokio::test]
async fn hydration_failure_keeps_defaults() {
    let host = local_host();
    host.disconnect();
    let model = NewTabModel::new(host.clone(), &test_config());
    model.hydrated().await;

    assert_eq!(*model.get_state(), NewTabState::default());
}

#[tokio::test]
async fn select_solid_background_updates_current_and_host() {
    let (host, model) = hydrated_model().await;

    model.select_background(BackgroundType::Solid, "#000000");

    let state = model.get_state();
    assert_eq!(state.selected_background_type, BackgroundType::Solid);
    assert_eq!(state.current_background, Some(Background::Solid { css_value: "#000000".into() }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let selected = host.selected_background();
    assert_eq!(selected.kind, BackgroundType::Solid);
    assert_eq!(selected.value, "#000000");
}

#[tokio::test]
async fn disabling_backgrounds_shows_default_gradient() {
    let (_host, model) = hydrated_model().await;

    model.set_backgrounds_enabled(false);

    let state = model.get_state();
    assert!(!state.backgrounds_enabled);
    assert_eq!(
        state.current_background,
        Some(Background::Gradient { css_value: DEFAULT_GRADIENT.into() })
    );
}

#[tokio::test]
async fn sponsored_image_push_takes_precedence() {
    let (host, model) = hydrated_model().await;

    host.set_sponsored_image(Some(sponsored()));

    wait_for(&model, |s| s.current_background == Some(Background::Sponsored(sponsored()))).await;
    assert_eq!(model.get_state().sponsored_image_background, Some(sponsored()));
}

#[tokio::test]
async fn disabling_sponsored_images_clears_them() {
    let (host, model) = hydrated_model().await;
    host.set_sponsored_image(Some(sponsored()));
    wait_for(&model, |s| s.sponsored_image_background.is_some()).await;

    model.set_sponsored_images_enabled(false);

    let state = model.get_state();
    assert!(state.sponsored_image_background.is_none());
    assert!(matches!(state.current_background, Some(Background::Brave(_))));
}

#[tokio::test]
async fn removing_shown_custom_background_repicks() {
    let (host, model) = hydrated_model().await;
    host.add_custom_background("custom-a.png");
    host.add_custom_background("custom-b.png");
    wait_for(&model, |s| s.custom_backgrounds.len() == 2).await;

    model.select_background(BackgroundType::Custom, "custom-a.png");
    wait_for(&model, |_| host.selected_background().value == "custom-a.png").await;

    model.remove_custom_background("custom-a.png").await.expect("remove succeeds");

    let state = model.get_state();
    assert_eq!(state.custom_backgrounds, vec!["custom-b.png".to_string()]);
    assert_eq!(state.selected_background_type, BackgroundType::Brave);
    assert!(matches!(state.current_background, Some(Background::Brave(_))));
}

#[tokio::test]
async fn remove_custom_background_reports_disconnect() {
    let (host, model) = hydrated_model().await;
    host.disconnect();

    let result = model.remove_custom_background("custom-a.png").await;

    assert_eq!(result, Err(HostError::Disconnected));
}

#[tokio::test]
async fn burst_of_pref_pushes_refetches_once() {
    let (host, model) = hydrated_model().await;
    assert_eq!(host.calls("get_backgrounds_enabled"), 1);

    for enabled in [false, true, false] {
        NewTabPageHandler::set_backgrounds_enabled(host.as_ref(), enabled)
            .await
            .expect("local host accepts");
    }

    wait_for(&model, |s| !s.backgrounds_enabled).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(host.calls("get_backgrounds_enabled"), 2);
}

#[tokio::test]
async fn clock_and_shields_actions_apply_locally() {
    let (host, model) = hydrated_model().await;

    model.set_show_clock(true);
    model.set_clock_format(ClockFormat::H24);
    model.set_show_shields_stats(false);

    let state = model.get_state();
    assert!(state.show_clock);
    assert_eq!(state.clock_format, ClockFormat::H24);
    assert!(!state.show_shields_stats);

    host.set_shields_stats(ShieldsStats { ads_blocked: 12, bandwidth_saved_bytes: 4096 });
    wait_for(&model, |s| s.shields_stats.ads_blocked == 12).await;
}

#[tokio::test]
async fn refresh_background_keeps_selected_type() {
    let (_host, model) = hydrated_model().await;
    model.select_background(BackgroundType::Gradient, "");

    model.refresh_background();

    let state = model.get_state();
    assert_eq!(state.current_background.as_ref().and_then(Background::background_type), Some(BackgroundType::Gradient));
}

#[tokio::test]
async fn recompute_background_keeps_a_still_valid_pick() {
    let (_host, model) = hydrated_model().await;
    let shown = model.get_state().current_background.clone();
    let notified = Arc::new(std::sync::atomic::AtomicU64::new(0));
    let counter = Arc::clone(&notified);
    let _sub = model.add_listener(move |_| {
        counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    });

    model.recompute_background();

    assert_eq!(notified.load(std::sync::atomic::Ordering::SeqCst), 1);
    assert_eq!(model.get_state().current_background, shown);
}

#[tokio::test]
async fn recompute_background_follows_inputs() {
    let (_host, model) = hydrated_model().await;
    model.select_background(BackgroundType::Solid, "#123456");

    model.recompute_background();
    assert_eq!(model.get_state().current_background, Some(Background::Solid { css_value: "#123456".into() }));

    model.set_backgrounds_enabled(false);
    model.recompute_background();
    assert_eq!(
        model.get_state().current_background,
        Some(Background::Gradient { css_value: DEFAULT_GRADIENT.into() })
    );
}

#[tokio::test]
async fn dropping_model_releases_host_listener() {
    let host = local_host();
    let model = NewTabModel::new(host.clone(), &test_config());
    model.hydrated().await;
    drop(model);

    // Pushes to a dropped model are ignored.
    host.set_sponsored_image(Some(sponsored()));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(host.calls("get_sponsored_image_background"), 1);
}
