use super::*;
use crate::host::local::LocalHost;
use crate::host::test_helpers::{local_host, quiet_config, test_config, wait_for};

fn tiles(names: &[&str]) -> Vec<TopSite> {
    names
        .iter()
        .map(|name| TopSite::new(*name, format!("https://{name}.example/")))
        .collect()
}

fn titles(sites: &[TopSite]) -> Vec<&str> {
    sites.iter().map(|site| site.title.as_str()).collect()
}

fn url(name: &str) -> String {
    format!("https://{name}.example/")
}

async fn hydrated_model(names: &[&str]) -> (Arc<LocalHost>, TopSitesModel) {
    let host = local_host();
    host.set_most_visited(tiles(names));
    let model = TopSitesModel::new(host.clone(), &test_config());
    model.hydrated().await;
    (host, model)
}

// =============================================================================
// drop_position / reposition
// =============================================================================

#[test]
fn drop_before_later_target_is_not_adjusted() {
    // D (3) dropped before B (1).
    let to = drop_position(3, 1, DropLocation::Before, TextDirection::Ltr);
    assert_eq!(to, 1);
    assert_eq!(titles(&reposition(&tiles(&["A", "B", "C", "D"]), 3, to)), ["A", "D", "B", "C"]);
}

#[test]
fn drop_after_later_target_is_not_adjusted() {
    // A (0) dropped after C (2).
    let to = drop_position(0, 2, DropLocation::After, TextDirection::Ltr);
    assert_eq!(to, 2);
    assert_eq!(titles(&reposition(&tiles(&["A", "B", "C", "D"]), 0, to)), ["B", "C", "A", "D"]);
}

#[test]
fn drop_after_earlier_target_shifts_by_one() {
    // D (3) dropped after B (1).
    let to = drop_position(3, 1, DropLocation::After, TextDirection::Ltr);
    assert_eq!(to, 2);
    assert_eq!(titles(&reposition(&tiles(&["A", "B", "C", "D"]), 3, to)), ["A", "B", "D", "C"]);
}

#[test]
fn rtl_swaps_before_and_after() {
    assert_eq!(
        drop_position(3, 1, DropLocation::Before, TextDirection::Rtl),
        drop_position(3, 1, DropLocation::After, TextDirection::Ltr)
    );
    assert_eq!(
        drop_position(3, 1, DropLocation::After, TextDirection::Rtl),
        drop_position(3, 1, DropLocation::Before, TextDirection::Ltr)
    );
    assert_eq!(DropLocation::After.in_list_order(TextDirection::Ltr), DropLocation::After);
}

#[test]
fn reposition_leaves_input_untouched() {
    let original = tiles(&["A", "B", "C"]);
    let moved = reposition(&original, 0, 2);
    assert_eq!(titles(&original), ["A", "B", "C"]);
    assert_eq!(titles(&moved), ["B", "C", "A"]);
}

#[test]
fn reposition_clamps_and_ignores_bad_source() {
    let original = tiles(&["A", "B", "C"]);
    assert_eq!(titles(&reposition(&original, 0, 99)), ["B", "C", "A"]);
    assert_eq!(titles(&reposition(&original, 7, 0)), ["A", "B", "C"]);
}

// =============================================================================
// Model
// =============================================================================

#[tokio::test]
async fn hydration_loads_most_visited() {
    let (_host, model) = hydrated_model(&["A", "B", "C", "D"]).await;
    let state = model.get_state();
    assert!(state.show_top_sites);
    assert_eq!(state.list_kind, TopSitesListKind::MostVisited);
    assert_eq!(titles(&state.top_sites), ["A", "B", "C", "D"]);
}

#[tokio::test]
async fn move_top_site_reorders_locally_and_on_host() {
    let (host, model) = hydrated_model(&["A", "B", "C", "D"]).await;

    model.move_top_site(&url("D"), &url("B"), DropLocation::Before, TextDirection::Ltr);
    assert_eq!(titles(&model.get_state().top_sites), ["A", "D", "B", "C"]);

    model.move_top_site(&url("A"), &url("C"), DropLocation::After, TextDirection::Ltr);
    assert_eq!(titles(&model.get_state().top_sites), ["D", "B", "C", "A"]);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let on_host = TopSitesHandler::get_top_sites(host.as_ref()).await.expect("connected");
    assert_eq!(titles(&on_host), ["D", "B", "C", "A"]);
    assert_eq!(titles(&model.get_state().top_sites), ["D", "B", "C", "A"]);
}

#[tokio::test]
async fn move_in_rtl_layout_mirrors_sides() {
    let (_host, model) = hydrated_model(&["A", "B", "C", "D"]).await;

    // On an RTL screen "before" B is to its right, which is after B in list order.
    model.move_top_site(&url("D"), &url("B"), DropLocation::Before, TextDirection::Rtl);

    assert_eq!(titles(&model.get_state().top_sites), ["A", "B", "D", "C"]);
}

#[tokio::test]
async fn move_with_unknown_tile_is_ignored() {
    let (_host, model) = hydrated_model(&["A", "B"]).await;
    let before = model.get_state();

    model.move_top_site(&url("A"), "https://missing.example/", DropLocation::After, TextDirection::Ltr);
    model.move_top_site(&url("A"), &url("A"), DropLocation::After, TextDirection::Ltr);

    assert!(Arc::ptr_eq(&before, &model.get_state()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_remove_and_move_both_apply() {
    let runtime = tokio::runtime::Handle::current();
    for _ in 0..20 {
        let host = local_host();
        host.set_most_visited(tiles(&["A", "B", "C", "D"]));
        let model = TopSitesModel::new(host.clone(), &quiet_config());
        model.hydrated().await;

        let start = std::sync::Barrier::new(2);
        std::thread::scope(|scope| {
            let (remover, mover) = (model.clone(), model.clone());
            let (start, runtime) = (&start, &runtime);
            scope.spawn(move || {
                let _entered = runtime.enter();
                start.wait();
                remover.remove_top_site(&url("B"));
            });
            scope.spawn(move || {
                let _entered = runtime.enter();
                start.wait();
                mover.set_top_site_position(&url("D"), 0);
            });
        });

        assert_eq!(titles(&model.get_state().top_sites), ["D", "A", "C"]);
    }
}

#[tokio::test]
async fn remove_shows_undo_notice_until_timeout() {
    let (_host, model) = hydrated_model(&["A", "B", "C"]).await;

    model.remove_top_site(&url("B"));
    let state = model.get_state();
    assert_eq!(titles(&state.top_sites), ["A", "C"]);
    assert_eq!(state.removed_url.as_deref(), Some(url("B").as_str()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(model.get_state().removed_url.is_some(), "notice still shown before the timeout");

    wait_for(&model, |s| s.removed_url.is_none()).await;
    assert_eq!(titles(&model.get_state().top_sites), ["A", "C"]);
}

#[tokio::test]
async fn undo_restores_tile_and_closes_notice() {
    let (_host, model) = hydrated_model(&["A", "B", "C"]).await;
    model.remove_top_site(&url("B"));
    tokio::time::sleep(Duration::from_millis(20)).await;

    model.undo_remove_top_site().await.expect("undo succeeds");

    let state = model.get_state();
    assert!(state.removed_url.is_none());
    assert_eq!(titles(&state.top_sites), ["A", "B", "C"]);
}

#[tokio::test]
async fn dismissing_notice_cancels_timer() {
    let (_host, model) = hydrated_model(&["A", "B"]).await;
    model.remove_top_site(&url("A"));

    model.dismiss_undo_notice();
    assert!(model.get_state().removed_url.is_none());

    // A later removal gets its own full timeout.
    model.remove_top_site(&url("B"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(model.get_state().removed_url.as_deref(), Some(url("B").as_str()));
}

#[tokio::test]
async fn custom_list_add_and_update() {
    let (host, model) = hydrated_model(&["A"]).await;
    model.set_list_kind(TopSitesListKind::Custom);
    wait_for(&model, |s| s.list_kind == TopSitesListKind::Custom && s.top_sites.is_empty()).await;

    model.add_top_site("https://rust-lang.org/", "Rust").await.expect("add succeeds");
    assert_eq!(titles(&model.get_state().top_sites), ["Rust"]);

    model
        .update_top_site("https://rust-lang.org/", "https://crates.io/", "Crates")
        .await
        .expect("update succeeds");
    assert_eq!(titles(&model.get_state().top_sites), ["Crates"]);
    assert_eq!(host.custom_sites()[0].url, "https://crates.io/");
}

#[tokio::test]
async fn add_duplicate_custom_site_is_rejected() {
    let (_host, model) = hydrated_model(&["A"]).await;
    model.set_list_kind(TopSitesListKind::Custom);
    wait_for(&model, |s| s.top_sites.is_empty()).await;
    model.add_top_site("https://rust-lang.org/", "Rust").await.expect("first add succeeds");

    let result = model.add_top_site("https://rust-lang.org/", "Rust again").await;

    assert!(matches!(result, Err(HostError::CallFailed { method: "add_top_site", .. })));
    assert_eq!(model.get_state().top_sites.len(), 1);
}

#[tokio::test]
async fn host_push_refreshes_tiles() {
    let (host, model) = hydrated_model(&["A"]).await;

    host.set_most_visited(tiles(&["X", "Y"]));

    wait_for(&model, |s| titles(&s.top_sites) == ["X", "Y"]).await;
}

#[tokio::test]
async fn wait_for_outlasts_a_slow_push() {
    let (host, model) = hydrated_model(&["A"]).await;
    let pusher = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(1500)).await;
        host.set_most_visited(tiles(&["Z"]));
    });

    wait_for(&model, |s| titles(&s.top_sites) == ["Z"]).await;
    pusher.await.expect("pusher finished");
}
