use regex::Regex;

use super::{desktop, setup_logger, window};
use crate::core::directory::{FilterPolicy, WindowInfo};
use crate::core::geometry::{Point, Rect};

fn eligible_ids(snapshot: &crate::core::directory::DirectorySnapshot, policy: &FilterPolicy) -> Vec<u32> {
    snapshot.eligible(policy).map(|w| w.id).collect()
}

#[test]
fn ordinary_windows_are_eligible() {
    setup_logger();
    let snapshot = desktop(vec![window(7, Rect::new(100.0, 100.0, 800.0, 600.0))]);

    assert_eq!(eligible_ids(&snapshot, &FilterPolicy::default()), vec![7]);
}

#[test]
fn own_windows_are_never_eligible() {
    setup_logger();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let policy = FilterPolicy::new(Vec::new(), Vec::new(), Some(info.pid));
    let snapshot = desktop(vec![info]);

    assert!(eligible_ids(&snapshot, &policy).is_empty());
}

#[test]
fn invisible_and_non_normal_layer_windows_are_excluded() {
    setup_logger();
    let mut transparent = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    transparent.alpha = 0.0;
    let mut status_item = window(8, Rect::new(0.0, 0.0, 200.0, 100.0));
    status_item.layer = 25;
    let snapshot = desktop(vec![transparent, status_item]);

    assert!(eligible_ids(&snapshot, &FilterPolicy::default()).is_empty());
}

#[test]
fn tiny_windows_are_excluded() {
    setup_logger();
    let snapshot = desktop(vec![
        window(7, Rect::new(100.0, 100.0, 39.0, 600.0)),
        window(8, Rect::new(100.0, 100.0, 600.0, 39.0)),
        window(9, Rect::new(100.0, 100.0, 40.0, 40.0)),
    ]);

    assert_eq!(eligible_ids(&snapshot, &FilterPolicy::default()), vec![9]);
}

#[test]
fn system_owners_are_excluded() {
    setup_logger();
    let mut dock = window(7, Rect::new(0.0, 800.0, 1440.0, 100.0));
    dock.bundle_id = Some("com.apple.dock".into());
    let snapshot = desktop(vec![dock]);

    assert!(eligible_ids(&snapshot, &FilterPolicy::default()).is_empty());
}

#[test]
fn blocklisted_bundles_are_excluded() {
    setup_logger();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let policy = FilterPolicy::new(vec!["com.example.app7".into()], Vec::new(), None);
    let snapshot = desktop(vec![info, window(8, Rect::new(0.0, 0.0, 400.0, 400.0))]);

    assert_eq!(eligible_ids(&snapshot, &policy), vec![8]);
}

#[test]
fn title_exclude_patterns_apply() {
    setup_logger();
    let mut item = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    item.title = Some("Item-0".into());
    let policy = FilterPolicy::new(
        Vec::new(),
        vec![Regex::new("^Item-0$").unwrap()],
        None,
    );
    let snapshot = desktop(vec![item]);

    assert!(eligible_ids(&snapshot, &policy).is_empty());
}

#[test]
fn untitled_windows_pass_the_title_filter() {
    setup_logger();
    let mut untitled = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    untitled.title = None;
    let policy = FilterPolicy::new(Vec::new(), vec![Regex::new(".*").unwrap()], None);
    let snapshot = desktop(vec![untitled]);

    assert_eq!(eligible_ids(&snapshot, &policy), vec![7]);
}

#[test]
fn window_at_returns_the_topmost_hit() {
    setup_logger();
    // Front to back: 7 on top of 8 on top of 9.
    let snapshot = desktop(vec![
        window(7, Rect::new(0.0, 0.0, 400.0, 400.0)),
        window(8, Rect::new(300.0, 0.0, 400.0, 400.0)),
        window(9, Rect::new(0.0, 0.0, 1440.0, 900.0)),
    ]);
    let policy = FilterPolicy::default();

    assert_eq!(
        snapshot
            .window_at(Point { x: 350.0, y: 100.0 }, &policy)
            .map(|w| w.id),
        Some(7)
    );
    assert_eq!(
        snapshot
            .window_at(Point { x: 500.0, y: 100.0 }, &policy)
            .map(|w| w.id),
        Some(8)
    );
    assert_eq!(
        snapshot
            .window_at(Point { x: 100.0, y: 700.0 }, &policy)
            .map(|w| w.id),
        Some(9)
    );
    assert!(
        snapshot
            .window_at(Point { x: 2000.0, y: 100.0 }, &policy)
            .is_none()
    );
}

#[test]
fn lookup_results_outlive_the_policy_borrow() {
    setup_logger();
    let snapshot = desktop(vec![window(7, Rect::new(0.0, 0.0, 400.0, 400.0))]);
    let policy = FilterPolicy::default();
    let hit = snapshot.window_at(Point { x: 100.0, y: 100.0 }, &policy);
    let named = snapshot.find_by_title("window-7", &policy);
    drop(policy);

    assert_eq!(hit.map(|w| w.id), Some(7));
    assert_eq!(named.map(|w| w.id), Some(7));
}

#[test]
fn is_on_top_ignores_windows_outside_the_region() {
    setup_logger();
    let snapshot = desktop(vec![
        window(7, Rect::new(0.0, 0.0, 400.0, 400.0)),
        window(8, Rect::new(800.0, 0.0, 400.0, 400.0)),
    ]);
    let policy = FilterPolicy::default();

    assert!(snapshot.is_on_top(8, &policy));
    assert!(snapshot.is_on_top(7, &policy));
}

#[test]
fn is_on_top_detects_occlusion() {
    setup_logger();
    let snapshot = desktop(vec![
        window(7, Rect::new(0.0, 0.0, 400.0, 400.0)),
        window(8, Rect::new(200.0, 200.0, 400.0, 400.0)),
    ]);
    let policy = FilterPolicy::default();

    assert!(snapshot.is_on_top(7, &policy));
    assert!(!snapshot.is_on_top(8, &policy));
}

#[test]
fn find_by_title_only_considers_eligible_windows() {
    setup_logger();
    let mut hidden = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    hidden.alpha = 0.0;
    let visible = window(8, Rect::new(100.0, 100.0, 800.0, 600.0));
    let mut shadowed = visible.clone();
    shadowed.title = hidden.title.clone();
    let snapshot = desktop(vec![hidden, shadowed]);

    assert_eq!(
        snapshot
            .find_by_title("window-7", &FilterPolicy::default())
            .map(|w| w.id),
        Some(8)
    );
}

#[test]
fn display_for_picks_the_largest_overlap() {
    setup_logger();
    let snapshot = desktop(vec![]);

    let mostly_primary = Rect::new(1000.0, 100.0, 600.0, 400.0);
    assert_eq!(snapshot.display_for(&mostly_primary).map(|d| d.id), Some(0));

    let mostly_secondary = Rect::new(1200.0, 100.0, 800.0, 400.0);
    assert_eq!(
        snapshot.display_for(&mostly_secondary).map(|d| d.id),
        Some(1)
    );

    let offscreen = Rect::new(-2000.0, -2000.0, 100.0, 100.0);
    assert!(snapshot.display_for(&offscreen).is_none());
}

#[test]
fn frame_of_reports_the_current_frame() {
    setup_logger();
    let frame = Rect::new(100.0, 100.0, 800.0, 600.0);
    let snapshot = desktop(vec![window(7, frame)]);

    assert_eq!(snapshot.frame_of(7), Some(frame));
    assert_eq!(snapshot.frame_of(999), None);
}

#[test]
fn windows_without_bundle_ids_pass_owner_filters() {
    setup_logger();
    let info = WindowInfo {
        bundle_id: None,
        ..window(7, Rect::new(100.0, 100.0, 800.0, 600.0))
    };
    let policy = FilterPolicy::new(vec!["com.example.app7".into()], Vec::new(), None);
    let snapshot = desktop(vec![info]);

    assert_eq!(eligible_ids(&snapshot, &policy), vec![7]);
}
