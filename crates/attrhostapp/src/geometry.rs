//! # Anchor Geometry
//!
//! Tooltips and error icons are placed next to the text they describe. That text is
//! not necessarily level: scanned pages are skewed, and some values run vertically or
//! upside down. This module computes, for a group of oriented zones on one page,
//! a single representative rotation and an anchor point at a requested corner.
//!
//! ## Algorithm
//!
//! 1. Each zone's rotation comes from its start/end points. Every rotation is
//!    normalized to lie within ±π of the *first* zone's rotation so text running in
//!    the near-180° direction does not average out to a sideways angle.
//! 2. Rotations and heights are averaged.
//! 3. All zone endpoints are rotated into the average frame and an axis-aligned box
//!    is built around them, inflated vertically by half the average height.
//! 4. The average is snapped to the nearest multiple of 90° unless it deviates from
//!    that right angle by more than the cutoff: the smaller of 5° and the angle
//!    subtended by half the zone height over the box width. Snapping further than
//!    that would draw the overlay on top of the text it annotates.
//! 5. The requested corner of the box (rebuilt in the chosen frame) is pushed out by
//!    half the average height and rotated back into page coordinates.
//!
//! Page coordinates have their origin at the top-left and `y` grows downward.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Largest deviation from a right angle that is still drawn as level.
pub const MAX_LEVEL_DEVIATION: f64 = 5.0 * PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rotates the point about the origin.
    pub fn rotated(self, angle: f64) -> Self {
        let (sin, cos) = angle.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Offsets by `(dx, dy)` measured in a frame rotated by `angle`.
    pub fn offset_rotated(self, dx: f64, dy: f64, angle: f64) -> Self {
        let d = Point::new(dx, dy).rotated(angle);
        self.offset(d.x, d.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle, `top <= bottom` in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Rect {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Smallest rectangle containing all `points`. `None` for an empty iterator.
    pub fn bounding(points: impl IntoIterator<Item = Point>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Rect::new(first.x, first.y, first.x, first.y);
        for p in iter {
            rect.left = rect.left.min(p.x);
            rect.top = rect.top.min(p.y);
            rect.right = rect.right.max(p.x);
            rect.bottom = rect.bottom.max(p.y);
        }
        Some(rect)
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left, self.top),
            Point::new(self.right, self.top),
            Point::new(self.right, self.bottom),
            Point::new(self.left, self.bottom),
        ]
    }

    pub fn corner(&self, alignment: AnchorAlignment) -> Point {
        let mid_x = (self.left + self.right) / 2.0;
        let mid_y = (self.top + self.bottom) / 2.0;
        match alignment {
            AnchorAlignment::LeftTop => Point::new(self.left, self.top),
            AnchorAlignment::Top => Point::new(mid_x, self.top),
            AnchorAlignment::RightTop => Point::new(self.right, self.top),
            AnchorAlignment::Left => Point::new(self.left, mid_y),
            AnchorAlignment::Center => Point::new(mid_x, mid_y),
            AnchorAlignment::Right => Point::new(self.right, mid_y),
            AnchorAlignment::LeftBottom => Point::new(self.left, self.bottom),
            AnchorAlignment::Bottom => Point::new(mid_x, self.bottom),
            AnchorAlignment::RightBottom => Point::new(self.right, self.bottom),
        }
    }

    /// Page-space bounds of this rectangle, given in a frame anchored at `origin`
    /// and rotated by `angle`.
    pub fn rotated_about(&self, origin: Point, angle: f64) -> Rect {
        let corners = self
            .corners()
            .map(|c| c.rotated(angle).offset(origin.x, origin.y));
        Rect::bounding(corners).unwrap_or_default()
    }
}

/// An oriented rectangular region of text on one page.
///
/// `start` and `end` are the midpoints of the zone's left and right edges; `height`
/// is measured perpendicular to the start→end line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RasterZone {
    pub start: Point,
    pub end: Point,
    pub height: f64,
    pub page: u32,
    /// OCR confidence of the text in this zone, 0-100.
    #[serde(default = "full_confidence")]
    pub confidence: u8,
}

fn full_confidence() -> u8 {
    100
}

impl RasterZone {
    pub fn new(start: Point, end: Point, height: f64, page: u32) -> Self {
        Self {
            start,
            end,
            height,
            page,
            confidence: 100,
        }
    }

    pub fn with_confidence(mut self, confidence: u8) -> Self {
        self.confidence = confidence.min(100);
        self
    }

    /// Direction of the start→end line, in radians.
    pub fn rotation(&self) -> f64 {
        (self.end.y - self.start.y).atan2(self.end.x - self.start.x)
    }

    /// Page-space bounding box of the zone including its height.
    pub fn bounds(&self) -> Rect {
        let rotation = self.rotation();
        let half = Point::new(0.0, self.height / 2.0).rotated(rotation);
        Rect::bounding([
            self.start.offset(-half.x, -half.y),
            self.start.offset(half.x, half.y),
            self.end.offset(-half.x, -half.y),
            self.end.offset(half.x, half.y),
        ])
        .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorAlignment {
    LeftTop,
    Top,
    RightTop,
    Left,
    Center,
    Right,
    LeftBottom,
    Bottom,
    RightBottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetDirection {
    None,
    Up,
    Down,
    Left,
    Right,
}

/// Result of [`anchor_point`]: where to attach an overlay and how to rotate it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub point: Point,
    /// Rotation in radians, normalized to `(-π, π]`.
    pub rotation: f64,
    /// Average height of the source zones.
    pub zone_height: f64,
}

/// Normalizes an angle to `(-π, π]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % TAU;
    if a <= -PI {
        a += TAU;
    } else if a > PI {
        a -= TAU;
    }
    a
}

/// Average rotation and height of `zones`, with every rotation taken within ±π of
/// the first zone's. `None` when `zones` is empty.
pub fn average_rotation(zones: &[RasterZone]) -> Option<(f64, f64)> {
    let base = zones.first()?.rotation();
    let mut rotation_sum = 0.0;
    let mut height_sum = 0.0;
    for zone in zones {
        let mut rotation = zone.rotation();
        while rotation - base > PI {
            rotation -= TAU;
        }
        while rotation - base < -PI {
            rotation += TAU;
        }
        rotation_sum += rotation;
        height_sum += zone.height;
    }
    let count = zones.len() as f64;
    Some((rotation_sum / count, height_sum / count))
}

/// Bounds of all zone endpoints in the frame rotated by `rotation`, inflated
/// vertically by `half_height`.
fn frame_bounds(zones: &[RasterZone], rotation: f64, half_height: f64) -> Rect {
    let points = zones
        .iter()
        .flat_map(|z| [z.start, z.end])
        .map(|p| p.rotated(-rotation));
    let mut rect = Rect::bounding(points).unwrap_or_default();
    rect.top -= half_height;
    rect.bottom += half_height;
    rect
}

/// The rotation overlays for `zones` should be drawn at, given their average.
fn display_rotation(average: f64, half_height: f64, box_width: f64) -> f64 {
    let cutoff = if box_width > 0.0 {
        MAX_LEVEL_DEVIATION.min((half_height / box_width).atan())
    } else {
        MAX_LEVEL_DEVIATION
    };
    let snapped = (average / FRAC_PI_2).round() * FRAC_PI_2;
    if (average - snapped).abs() > cutoff {
        average
    } else {
        snapped
    }
}

/// Computes the anchor for an overlay attached to `zones` (all on one page).
///
/// Returns `None` when `zones` is empty.
pub fn anchor_point(
    zones: &[RasterZone],
    alignment: AnchorAlignment,
    offset: OffsetDirection,
) -> Option<Anchor> {
    let (average, zone_height) = average_rotation(zones)?;
    let half_height = zone_height / 2.0;

    let average_bounds = frame_bounds(zones, average, half_height);
    let rotation = display_rotation(average, half_height, average_bounds.width());
    let bounds = if rotation == average {
        average_bounds
    } else {
        frame_bounds(zones, rotation, half_height)
    };

    let corner = bounds.corner(alignment);
    let shifted = match offset {
        OffsetDirection::None => corner,
        OffsetDirection::Up => corner.offset(0.0, -half_height),
        OffsetDirection::Down => corner.offset(0.0, half_height),
        OffsetDirection::Left => corner.offset(-half_height, 0.0),
        OffsetDirection::Right => corner.offset(half_height, 0.0),
    };

    Some(Anchor {
        point: shifted.rotated(rotation),
        rotation: normalize_angle(rotation),
        zone_height,
    })
}
