use super::*;
use crate::host::{BraveBackground, SponsoredImageBackground};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn rng() -> StdRng {
    StdRng::seed_from_u64(7)
}

fn brave(url: &str) -> BraveBackground {
    BraveBackground { image_url: url.into(), author: "author".into(), link: "https://example.com".into() }
}

fn sponsored() -> SponsoredImageBackground {
    SponsoredImageBackground {
        image_url: "chrome://branded-wallpaper/a.jpg".into(),
        creative_instance_id: "ci-1".into(),
        target_url: "https://sponsor.example".into(),
        logo_image_url: "chrome://branded-wallpaper/logo.png".into(),
    }
}

fn state(kind: BackgroundType, value: &str) -> NewTabState {
    NewTabState {
        selected_background_type: kind,
        selected_background: value.into(),
        brave_backgrounds: vec![brave("a.jpg"), brave("b.jpg"), brave("c.jpg")],
        custom_backgrounds: vec!["custom-1.png".into(), "custom-2.png".into()],
        ..NewTabState::default()
    }
}

// =============================================================================
// precedence
// =============================================================================

#[test]
fn disabled_backgrounds_give_default_gradient() {
    let mut s = state(BackgroundType::Solid, "#000000");
    s.backgrounds_enabled = false;
    s.sponsored_image_background = Some(sponsored());
    s.current_background = Some(Background::Solid { css_value: "#000000".into() });

    assert_eq!(compute_current_background(&s, &mut rng()), Background::default());
}

#[test]
fn sponsored_image_wins_when_enabled() {
    for kind in [BackgroundType::None, BackgroundType::Brave, BackgroundType::Solid, BackgroundType::Custom] {
        let mut s = state(kind, "#123456");
        s.sponsored_image_background = Some(sponsored());
        assert_eq!(compute_current_background(&s, &mut rng()), Background::Sponsored(sponsored()));
    }
}

#[test]
fn matching_current_background_is_kept_without_explicit_value() {
    let mut s = state(BackgroundType::Brave, "");
    s.current_background = Some(Background::Brave(brave("b.jpg")));

    for seed in 0..10 {
        let mut rng = StdRng::seed_from_u64(seed);
        assert_eq!(compute_current_background(&s, &mut rng), Background::Brave(brave("b.jpg")));
    }
}

#[test]
fn explicit_value_overrides_matching_current() {
    let mut s = state(BackgroundType::Solid, "#000000");
    s.current_background = Some(Background::Solid { css_value: "#FFFFFF".into() });

    assert_eq!(
        compute_current_background(&s, &mut rng()),
        Background::Solid { css_value: "#000000".into() }
    );
}

#[test]
fn current_of_other_type_is_replaced() {
    let mut s = state(BackgroundType::Custom, "");
    s.current_background = Some(Background::Brave(brave("a.jpg")));

    let picked = compute_current_background(&s, &mut rng());
    let Background::Custom { image_url } = picked else {
        panic!("expected a custom background, got {picked:?}");
    };
    assert!(s.custom_backgrounds.contains(&image_url));
}

#[test]
fn none_type_gives_default() {
    let s = state(BackgroundType::None, "");
    assert_eq!(compute_current_background(&s, &mut rng()), Background::default());
}

// =============================================================================
// per-type selection
// =============================================================================

#[test]
fn solid_without_value_picks_from_solid_list() {
    let s = state(BackgroundType::Solid, "");
    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let picked = compute_current_background(&s, &mut rng);
        let css = picked.css_value().expect("solid background has a css value");
        assert!(SOLID_BACKGROUNDS.contains(&css), "{css} is not a solid background");
    }
}

#[test]
fn gradient_without_value_picks_from_gradient_list() {
    let s = state(BackgroundType::Gradient, "");
    let picked = compute_current_background(&s, &mut rng());
    assert!(matches!(&picked, Background::Gradient { css_value } if GRADIENT_BACKGROUNDS.contains(&css_value.as_str())));
}

#[test]
fn brave_explicit_value_selects_that_image() {
    let s = state(BackgroundType::Brave, "c.jpg");
    assert_eq!(compute_current_background(&s, &mut rng()), Background::Brave(brave("c.jpg")));
}

#[test]
fn brave_unknown_value_falls_back_to_random_member() {
    let s = state(BackgroundType::Brave, "missing.jpg");
    let picked = compute_current_background(&s, &mut rng());
    assert!(matches!(picked, Background::Brave(ref b) if s.brave_backgrounds.contains(b)));
}

#[test]
fn brave_without_candidates_gives_default() {
    let mut s = state(BackgroundType::Brave, "");
    s.brave_backgrounds.clear();
    assert_eq!(compute_current_background(&s, &mut rng()), Background::default());
}

#[test]
fn custom_explicit_value_is_used_verbatim() {
    let s = state(BackgroundType::Custom, "uploaded.png");
    assert_eq!(
        compute_current_background(&s, &mut rng()),
        Background::Custom { image_url: "uploaded.png".into() }
    );
}

#[test]
fn custom_without_uploads_gives_default() {
    let mut s = state(BackgroundType::Custom, "");
    s.custom_backgrounds.clear();
    assert_eq!(compute_current_background(&s, &mut rng()), Background::default());
}

#[test]
fn same_seed_same_pick() {
    let s = state(BackgroundType::Brave, "");
    let a = compute_current_background(&s, &mut StdRng::seed_from_u64(42));
    let b = compute_current_background(&s, &mut StdRng::seed_from_u64(42));
    assert_eq!(a, b);
}

#[test]
fn selecting_solid_from_default_state() {
    let s = NewTabState {
        selected_background_type: BackgroundType::Solid,
        selected_background: "#000000".into(),
        ..NewTabState::default()
    };
    let picked = compute_current_background(&s, &mut rng());
    assert_eq!(picked, Background::Solid { css_value: "#000000".into() });
    assert_eq!(picked.css_value(), Some("#000000"));
}
