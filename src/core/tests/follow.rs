use insta::assert_snapshot;

use super::{desktop, effects, pin_live, setup, window};
use crate::core::geometry::Rect;
use crate::core::mirror::{MirrorEvent, MirrorState};

#[test]
fn mirror_follows_a_moved_source_within_one_tick() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    let mirror = pin_live(&mut engine, &info, &snapshot);

    let moved = desktop(vec![window(7, Rect::new(150.0, 120.0, 800.0, 600.0))]);
    let batch = engine.tick(&moved);

    // A pure move keeps the stream size, so no reconfigure.
    assert_snapshot!(effects(&batch), @r"
    m1 SetOpacity 0.00
    m1 MoveSurface (150,120 800x600)
    ");
    assert_eq!(engine.mirror(mirror).unwrap().state(), MirrorState::Resizing);
}

#[test]
fn mirror_settles_back_to_live_once_the_frame_is_steady() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    let mirror = pin_live(&mut engine, &info, &snapshot);

    let moved = desktop(vec![window(7, Rect::new(150.0, 120.0, 800.0, 600.0))]);
    engine.tick(&moved);
    let batch = engine.tick(&moved);

    assert_snapshot!(effects(&batch), @"m1 SetOpacity 0.80");
    assert_eq!(engine.mirror(mirror).unwrap().state(), MirrorState::Live);
}

#[test]
fn resize_reconfigures_the_stream() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    pin_live(&mut engine, &info, &snapshot);

    let resized = desktop(vec![window(7, Rect::new(100.0, 100.0, 900.0, 700.0))]);
    let batch = engine.tick(&resized);

    assert_snapshot!(effects(&batch), @r"
    m1 SetOpacity 0.00
    m1 MoveSurface (100,100 900x700)
    m1 CaptureReconfigure 1800x1400@60
    ");
}

#[test]
fn resize_during_capture_start_reconfigures_once_it_completes() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    engine.toggle_pin(&info, &snapshot);
    let mirror = engine.mirror_for_source(7).unwrap();
    engine.handle(mirror, MirrorEvent::HandleResolved { ok: true });

    // The source resizes while the async start is still in flight; the
    // stream cannot reconfigure yet.
    let resized = desktop(vec![window(7, Rect::new(100.0, 100.0, 900.0, 700.0))]);
    let batch = engine.tick(&resized);
    assert_snapshot!(effects(&batch), @"m1 MoveSurface (100,100 900x700)");

    // Start completion brings the stream up to the current geometry.
    let batch = engine.handle(mirror, MirrorEvent::CaptureStarted);
    assert_snapshot!(effects(&batch), @r"
    m1 SetOpacity 0.80
    m1 OrderAboveAll
    m1 CaptureReconfigure 1800x1400@60
    ");
}

#[test]
fn display_migration_adopts_the_new_displays_scale() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    pin_live(&mut engine, &info, &snapshot);

    // Same size, now fully on the low-dpi secondary display.
    let migrated = desktop(vec![window(7, Rect::new(1500.0, 100.0, 800.0, 600.0))]);
    let batch = engine.tick(&migrated);

    assert_snapshot!(effects(&batch), @r"
    m1 SetOpacity 0.00
    m1 MoveSurface (1500,100 800x600)
    m1 CaptureReconfigure 800x600@60
    ");
}

#[test]
fn quiet_tick_produces_no_effects() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    pin_live(&mut engine, &info, &snapshot);

    let batch = engine.tick(&snapshot);

    assert!(batch.is_empty());
}

#[test]
fn one_window_list_miss_is_tolerated() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    let mirror = pin_live(&mut engine, &info, &snapshot);

    let empty = desktop(vec![]);
    let batch = engine.tick(&empty);

    assert!(batch.is_empty());
    assert_eq!(engine.mirror(mirror).unwrap().state(), MirrorState::Live);
}

#[test]
fn source_gone_for_two_ticks_closes_the_mirror() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    pin_live(&mut engine, &info, &snapshot);

    let empty = desktop(vec![]);
    engine.tick(&empty);
    let batch = engine.tick(&empty);

    assert_snapshot!(effects(&batch), @r"
    m1 CaptureStop
    m1 CloseSurface
    ");
    assert!(engine.is_empty());
}

#[test]
fn source_reappearing_after_a_miss_resets_the_tolerance() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    let mirror = pin_live(&mut engine, &info, &snapshot);

    let empty = desktop(vec![]);
    engine.tick(&empty);
    engine.tick(&snapshot);
    engine.tick(&empty);

    assert_eq!(engine.mirror(mirror).unwrap().state(), MirrorState::Live);
}
