//! Page geometry and watermark placement
//!
//! Everything here is pure math over page boxes. Coordinates are in points, in the
//! page's *visual* space: origin at the lower-left corner of the MediaBox as the
//! page is displayed (after `/Rotate`), x to the right, y up.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Where the watermark goes on each page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum PositionType {
    TopLeft,
    TopCenter,
    TopRight,
    CenterLeft,
    #[default]
    Center,
    CenterRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
    /// Every combination of the caller-supplied X and Y coordinates
    Custom,
}

impl PositionType {
    pub const ALL: [PositionType; 10] = [
        PositionType::TopLeft,
        PositionType::TopCenter,
        PositionType::TopRight,
        PositionType::CenterLeft,
        PositionType::Center,
        PositionType::CenterRight,
        PositionType::BottomLeft,
        PositionType::BottomCenter,
        PositionType::BottomRight,
        PositionType::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PositionType::TopLeft => "TopLeft",
            PositionType::TopCenter => "TopCenter",
            PositionType::TopRight => "TopRight",
            PositionType::CenterLeft => "CenterLeft",
            PositionType::Center => "Center",
            PositionType::CenterRight => "CenterRight",
            PositionType::BottomLeft => "BottomLeft",
            PositionType::BottomCenter => "BottomCenter",
            PositionType::BottomRight => "BottomRight",
            PositionType::Custom => "Custom",
        }
    }
}

impl fmt::Display for PositionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a position name is not one of the known variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPosition(pub String);

impl fmt::Display for UnknownPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown position type: {}", self.0)
    }
}

impl std::error::Error for UnknownPosition {}

impl FromStr for PositionType {
    type Err = UnknownPosition;

    /// Case-insensitive; `-` and `_` separators are ignored (`top-left`, `TOP_LEFT`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect();

        PositionType::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| UnknownPosition(s.to_string()))
    }
}

/// Request decoding is permissive: unknown names land on Center
impl From<String> for PositionType {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_else(|e: UnknownPosition| {
            tracing::warn!(position = %e.0, "unknown position type, using Center");
            PositionType::Center
        })
    }
}

/// Page size in the visual orientation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// A page box `[llx lly urx ury]` in default user space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl PageBox {
    /// US Letter (8.5" × 11"), used when a page declares no MediaBox
    pub fn letter() -> Self {
        Self { llx: 0.0, lly: 0.0, urx: 612.0, ury: 792.0 }
    }

    /// Build from two arbitrary corners, normalizing the order
    pub fn from_corners(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            llx: x0.min(x1),
            lly: y0.min(y1),
            urx: x0.max(x1),
            ury: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }
}

/// Normalize a `/Rotate` value to one of 0, 90, 180, 270
///
/// Values that are not multiples of 90 are invalid in PDF and treated as 0.
pub fn normalize_rotation(rotate: i64) -> u16 {
    if rotate % 90 != 0 {
        return 0;
    }
    rotate.rem_euclid(360) as u16
}

/// Page size as displayed: width and height swap for quarter-turn rotations
pub fn effective_size(page_box: &PageBox, rotation: u16) -> PageSize {
    match rotation {
        90 | 270 => PageSize { width: page_box.height(), height: page_box.width() },
        _ => PageSize { width: page_box.width(), height: page_box.height() },
    }
}

/// The point a watermark instance is laid out around
///
/// Alignment is fixed: the text is centered horizontally on `x` and its top
/// edge sits on `y`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f32,
    pub y: f32,
}

impl Anchor {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The single anchor for a non-custom position
///
/// `Custom` has no anchor of its own and resolves to the center.
pub fn anchor_for(position: PositionType, page: PageSize) -> Anchor {
    let (w, h) = (page.width, page.height);
    match position {
        PositionType::TopLeft => Anchor::new(0.0, h),
        PositionType::TopCenter => Anchor::new(w / 2.0, h),
        PositionType::TopRight => Anchor::new(w, h),
        PositionType::CenterLeft => Anchor::new(0.0, h / 2.0),
        PositionType::Center => Anchor::new(w / 2.0, h / 2.0),
        PositionType::CenterRight => Anchor::new(w, h / 2.0),
        PositionType::BottomLeft => Anchor::new(0.0, 0.0),
        PositionType::BottomCenter => Anchor::new(w / 2.0, 0.0),
        PositionType::BottomRight => Anchor::new(w, 0.0),
        PositionType::Custom => Anchor::new(w / 2.0, h / 2.0),
    }
}

/// All anchors for one page
///
/// For `Custom` this is the cross product of `xs` and `ys`, X-major, in list
/// order (empty when either list is empty). Every other position yields exactly
/// one anchor.
pub fn resolve_anchors(position: PositionType, page: PageSize, xs: &[f32], ys: &[f32]) -> Vec<Anchor> {
    match position {
        PositionType::Custom => xs
            .iter()
            .flat_map(|&x| ys.iter().map(move |&y| Anchor::new(x, y)))
            .collect(),
        other => vec![anchor_for(other, page)],
    }
}

/// Represents a PDF transformation matrix [a b c d e f]
/// where: x' = a*x + c*y + e, y' = b*x + d*y + f
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformMatrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl TransformMatrix {
    /// Identity matrix (no transformation)
    pub fn identity() -> Self {
        Self { a: 1.0, b: 0.0, c: 0.0, d: 1.0, e: 0.0, f: 0.0 }
    }

    pub fn translate(tx: f32, ty: f32) -> Self {
        Self { e: tx, f: ty, ..Self::identity() }
    }

    /// Counter-clockwise rotation about the origin
    ///
    /// Quarter turns produce exact 0/±1 entries so they survive serialization
    /// without float noise.
    pub fn rotate_degrees(degrees: f32) -> Self {
        let wrapped = degrees.rem_euclid(360.0);
        let (sin, cos) = match wrapped {
            w if w == 0.0 => (0.0, 1.0),
            w if w == 90.0 => (1.0, 0.0),
            w if w == 180.0 => (0.0, -1.0),
            w if w == 270.0 => (-1.0, 0.0),
            w => w.to_radians().sin_cos(),
        };
        Self { a: cos, b: sin, c: -sin, d: cos, e: 0.0, f: 0.0 }
    }

    /// `self` applied first, then `next`
    pub fn then(&self, next: &TransformMatrix) -> Self {
        Self {
            a: self.a * next.a + self.b * next.c,
            b: self.a * next.b + self.b * next.d,
            c: self.c * next.a + self.d * next.c,
            d: self.c * next.b + self.d * next.d,
            e: self.e * next.a + self.f * next.c + next.e,
            f: self.e * next.b + self.f * next.d + next.f,
        }
    }

    /// Map a point through this matrix
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    /// Check if this is (approximately) the identity matrix
    pub fn is_identity(&self) -> bool {
        (self.a - 1.0).abs() < 0.001 &&
        self.b.abs() < 0.001 &&
        self.c.abs() < 0.001 &&
        (self.d - 1.0).abs() < 0.001 &&
        self.e.abs() < 0.001 &&
        self.f.abs() < 0.001
    }

    pub fn to_array(&self) -> [f32; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

/// Matrix mapping visual page coordinates onto default user space
///
/// Concatenated before drawing, it makes new content ignore the page rotation:
/// text drawn upright in visual space is displayed upright however the page is
/// rotated.
pub fn visual_to_user_space(page_box: &PageBox, rotation: u16) -> TransformMatrix {
    let PageBox { llx, lly, urx, ury } = *page_box;
    match rotation {
        90 => TransformMatrix { a: 0.0, b: 1.0, c: -1.0, d: 0.0, e: urx, f: lly },
        180 => TransformMatrix { a: -1.0, b: 0.0, c: 0.0, d: -1.0, e: urx, f: ury },
        270 => TransformMatrix { a: 0.0, b: -1.0, c: 1.0, d: 0.0, e: llx, f: ury },
        _ => TransformMatrix::translate(llx, lly),
    }
}

/// Text matrix for one watermark instance
///
/// Lays out a run of `text_width` points so that its horizontal center and its
/// top (baseline + `ascent`) sit on the anchor, then rotates it about the anchor.
pub fn text_matrix(anchor: Anchor, rotation_degrees: f32, text_width: f32, ascent: f32) -> TransformMatrix {
    TransformMatrix::translate(-text_width / 2.0, -ascent)
        .then(&TransformMatrix::rotate_degrees(rotation_degrees))
        .then(&TransformMatrix::translate(anchor.x, anchor.y))
}
