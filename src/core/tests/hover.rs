use insta::assert_snapshot;

use super::{desktop, effects, pin_live, setup, window};
use crate::core::geometry::Rect;
use crate::core::mirror::{MirrorEvent, MirrorState};

#[test]
fn pointer_entry_activates_the_source_and_hides_the_mirror() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    let mirror = pin_live(&mut engine, &info, &snapshot);

    let batch = engine.handle(mirror, MirrorEvent::PointerEntered);

    assert_snapshot!(effects(&batch), @r"
    m1 ActivateSource
    m1 SetOpacity 0.00
    m1 CaptureStop
    ");
    assert!(engine.mirror(mirror).unwrap().is_activated());
    assert_eq!(engine.mirror(mirror).unwrap().state(), MirrorState::Live);
}

#[test]
fn pointer_exit_restores_the_mirror() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    let mirror = pin_live(&mut engine, &info, &snapshot);
    engine.handle(mirror, MirrorEvent::PointerEntered);

    let batch = engine.handle(mirror, MirrorEvent::PointerLeft);

    assert_snapshot!(effects(&batch), @r"
    m1 CaptureStart 1600x1200@60
    m1 SetOpacity 0.80
    ");
    assert!(!engine.mirror(mirror).unwrap().is_activated());
}

#[test]
fn repeated_pointer_entry_is_a_no_op() {
    let mut engine = setup();
    let info = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let snapshot = desktop(vec![info.clone()]);
    let mirror = pin_live(&mut engine, &info, &snapshot);
    engine.handle(mirror, MirrorEvent::PointerEntered);

    let batch = engine.handle(mirror, MirrorEvent::PointerEntered);

    assert!(batch.is_empty());
}

#[test]
fn activation_suppresses_overlapping_mirrors() {
    let mut engine = setup();
    let a = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let b = window(8, Rect::new(400.0, 300.0, 800.0, 600.0));
    let snapshot = desktop(vec![a.clone(), b.clone()]);
    let ma = pin_live(&mut engine, &a, &snapshot);
    let mb = pin_live(&mut engine, &b, &snapshot);

    let batch = engine.handle(ma, MirrorEvent::PointerEntered);

    assert_snapshot!(effects(&batch), @r"
    m1 ActivateSource
    m1 SetOpacity 0.00
    m1 CaptureStop
    m2 SetInteractive false
    m2 OrderAboveSource
    ");
    assert_eq!(engine.mirror(mb).unwrap().state(), MirrorState::Suppressed);
}

#[test]
fn release_restores_suppressed_mirrors() {
    let mut engine = setup();
    let a = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let b = window(8, Rect::new(400.0, 300.0, 800.0, 600.0));
    let snapshot = desktop(vec![a.clone(), b.clone()]);
    let ma = pin_live(&mut engine, &a, &snapshot);
    let mb = pin_live(&mut engine, &b, &snapshot);
    engine.handle(ma, MirrorEvent::PointerEntered);

    let batch = engine.handle(ma, MirrorEvent::PointerLeft);

    assert_snapshot!(effects(&batch), @r"
    m2 SetInteractive true
    m2 OrderAboveAll
    m1 CaptureStart 1600x1200@60
    m1 SetOpacity 0.80
    ");
    assert_eq!(engine.mirror(mb).unwrap().state(), MirrorState::Live);
}

#[test]
fn suppressed_mirrors_cannot_activate() {
    let mut engine = setup();
    let a = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let b = window(8, Rect::new(400.0, 300.0, 800.0, 600.0));
    let snapshot = desktop(vec![a.clone(), b.clone()]);
    let ma = pin_live(&mut engine, &a, &snapshot);
    let mb = pin_live(&mut engine, &b, &snapshot);
    engine.handle(ma, MirrorEvent::PointerEntered);

    let batch = engine.handle(mb, MirrorEvent::PointerEntered);

    assert!(batch.is_empty());
    assert!(engine.mirror(ma).unwrap().is_activated());
    assert!(!engine.mirror(mb).unwrap().is_activated());
}

#[test]
fn non_overlapping_mirrors_are_unaffected_by_activation() {
    let mut engine = setup();
    let a = window(7, Rect::new(100.0, 100.0, 400.0, 300.0));
    let b = window(8, Rect::new(900.0, 500.0, 400.0, 300.0));
    let snapshot = desktop(vec![a.clone(), b.clone()]);
    let ma = pin_live(&mut engine, &a, &snapshot);
    let mb = pin_live(&mut engine, &b, &snapshot);

    engine.handle(ma, MirrorEvent::PointerEntered);

    assert_eq!(engine.mirror(mb).unwrap().state(), MirrorState::Live);
}

#[test]
fn activated_mirror_drags_its_claimed_region_along() {
    let mut engine = setup();
    let a = window(7, Rect::new(100.0, 100.0, 400.0, 300.0));
    let b = window(8, Rect::new(900.0, 500.0, 400.0, 300.0));
    let snapshot = desktop(vec![a.clone(), b.clone()]);
    let ma = pin_live(&mut engine, &a, &snapshot);
    let mb = pin_live(&mut engine, &b, &snapshot);
    engine.handle(ma, MirrorEvent::PointerEntered);
    assert_eq!(engine.mirror(mb).unwrap().state(), MirrorState::Live);

    // The activated source moves onto the other mirror's frame.
    let moved = desktop(vec![window(7, Rect::new(800.0, 450.0, 400.0, 300.0)), b.clone()]);
    let batch = engine.tick(&moved);

    assert_snapshot!(effects(&batch), @r"
    m2 SetInteractive false
    m2 OrderAboveSource
    m1 MoveSurface (800,450 400x300)
    ");
    assert_eq!(engine.mirror(mb).unwrap().state(), MirrorState::Suppressed);
}

#[test]
fn closing_an_activated_mirror_releases_the_claim() {
    let mut engine = setup();
    let a = window(7, Rect::new(100.0, 100.0, 800.0, 600.0));
    let b = window(8, Rect::new(400.0, 300.0, 800.0, 600.0));
    let snapshot = desktop(vec![a.clone(), b.clone()]);
    let ma = pin_live(&mut engine, &a, &snapshot);
    let mb = pin_live(&mut engine, &b, &snapshot);
    engine.handle(ma, MirrorEvent::PointerEntered);
    assert_eq!(engine.mirror(mb).unwrap().state(), MirrorState::Suppressed);

    let batch = engine.unpin(ma);

    assert_snapshot!(effects(&batch), @r"
    m1 CaptureStop
    m2 SetInteractive true
    m2 OrderAboveAll
    m1 CloseSurface
    ");
    assert_eq!(engine.mirror(mb).unwrap().state(), MirrorState::Live);
}
