//! Property-based invariant tests for anchor placement.
//!
//! 1. Normalized angles stay within (-π, π].
//! 2. Reversing a zone turns the anchor by exactly π.
//! 3. An average more than 5° off a right angle is never snapped.
//! 4. Level zones always anchor level.
//! 5. Anchors exist for any non-empty zone list and are finite.

use attrhostapp::geometry::{
    anchor_point, normalize_angle, AnchorAlignment, OffsetDirection, Point, RasterZone,
    MAX_LEVEL_DEVIATION,
};
use proptest::prelude::*;
use std::f64::consts::{FRAC_PI_2, PI};

// ── Helpers ─────────────────────────────────────────────────────────────

/// Zone of `length` centred on (`cx`, `cy`) running at `angle`.
fn zone(cx: f64, cy: f64, length: f64, height: f64, angle: f64) -> RasterZone {
    let half = Point::new(length / 2.0, 0.0).rotated(angle);
    RasterZone::new(
        Point::new(cx - half.x, cy - half.y),
        Point::new(cx + half.x, cy + half.y),
        height,
        1,
    )
}

fn reversed(z: RasterZone) -> RasterZone {
    RasterZone::new(z.end, z.start, z.height, z.page)
}

fn zone_strategy() -> impl Strategy<Value = RasterZone> {
    (
        0.0f64..2000.0,
        0.0f64..2000.0,
        10.0f64..500.0,
        5.0f64..50.0,
        -PI..PI,
    )
        .prop_map(|(cx, cy, length, height, angle)| zone(cx, cy, length, height, angle))
}

fn alignment_strategy() -> impl Strategy<Value = AnchorAlignment> {
    prop_oneof![
        Just(AnchorAlignment::LeftTop),
        Just(AnchorAlignment::LeftBottom),
        Just(AnchorAlignment::Right),
        Just(AnchorAlignment::Top),
    ]
}

fn angle_distance(a: f64, b: f64) -> f64 {
    normalize_angle(a - b).abs()
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Normalized angles stay within (-π, π]
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn normalized_angle_in_range(angle in -100.0f64..100.0) {
        let a = normalize_angle(angle);
        prop_assert!(a > -PI - 1e-12 && a <= PI + 1e-12, "{} normalized to {}", angle, a);
        prop_assert!(angle_distance(a, angle) < 1e-9);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Reversing a zone turns the anchor by π
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn reversed_zone_turns_anchor_by_pi(z in zone_strategy(), alignment in alignment_strategy()) {
        let forward = anchor_point(&[z], alignment, OffsetDirection::None).unwrap();
        let backward = anchor_point(&[reversed(z)], alignment, OffsetDirection::None).unwrap();
        let turn = angle_distance(backward.rotation, forward.rotation);
        prop_assert!(
            (turn - PI).abs() < 1e-6,
            "expected a half turn, got {} ({} vs {})",
            turn, forward.rotation, backward.rotation
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Averages far from a right angle are never snapped
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn large_deviation_is_never_snapped(
        quadrant in 0i32..4,
        degrees in 5.5f64..44.0,
        sign in prop_oneof![Just(1.0f64), Just(-1.0f64)],
        length in 10.0f64..500.0,
        height in 5.0f64..50.0,
    ) {
        let angle = quadrant as f64 * FRAC_PI_2 + sign * degrees.to_radians();
        let anchor = anchor_point(
            &[zone(500.0, 500.0, length, height, angle)],
            AnchorAlignment::LeftTop,
            OffsetDirection::None,
        )
        .unwrap();
        prop_assert!(
            angle_distance(anchor.rotation, angle) < 1e-9,
            "{}° off a right angle was snapped to {}",
            degrees, anchor.rotation
        );
    }
}

proptest! {
    #[test]
    fn snapping_never_exceeds_cutoff(z in zone_strategy()) {
        let anchor = anchor_point(&[z], AnchorAlignment::Right, OffsetDirection::Right).unwrap();
        let deviation = angle_distance(anchor.rotation, z.rotation());
        prop_assert!(
            deviation < 1e-9 || deviation <= MAX_LEVEL_DEVIATION + 1e-9,
            "rotation moved by {} rad",
            deviation
        );
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Level zones anchor level
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn level_zones_anchor_level(
        x in 0.0f64..2000.0,
        y in 0.0f64..2000.0,
        widths in prop::collection::vec(10.0f64..300.0, 1..5),
    ) {
        let zones: Vec<RasterZone> = widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let top = y + i as f64 * 30.0;
                RasterZone::new(Point::new(x, top), Point::new(x + w, top), 20.0, 1)
            })
            .collect();
        let anchor = anchor_point(&zones, AnchorAlignment::LeftTop, OffsetDirection::Up).unwrap();
        prop_assert!(anchor.rotation.abs() < 1e-12);
        prop_assert!((anchor.point.x - x).abs() < 1e-6);
        prop_assert!(anchor.point.y < y);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Anchors are finite
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn anchors_are_finite(zones in prop::collection::vec(zone_strategy(), 1..6)) {
        let anchor = anchor_point(&zones, AnchorAlignment::LeftBottom, OffsetDirection::Down).unwrap();
        prop_assert!(anchor.point.x.is_finite() && anchor.point.y.is_finite());
        prop_assert!(anchor.rotation.is_finite());
        prop_assert!(anchor.zone_height > 0.0);
    }
}

#[test]
fn empty_zone_list_has_no_anchor() {
    assert!(anchor_point(&[], AnchorAlignment::Right, OffsetDirection::None).is_none());
}
