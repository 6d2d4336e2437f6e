//! Card geometry: canonical corner ordering and rectified output size.

use serde::{Deserialize, Serialize};

/// Physical card width over height (2.5in x 3.5in).
pub const CARD_ASPECT: f64 = 2.5 / 3.5;

/// Fraction of the requested output height the rectified card occupies.
pub const CARD_HEIGHT_FRACTION: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    fn sum(&self) -> f32 {
        self.x + self.y
    }
}

impl From<(f32, f32)> for Point2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// Quadrilateral with corners in top-left, top-right, bottom-right,
/// bottom-left order. Built only by [`order_corners`], which deserialization
/// also goes through; the serialized form is the bare corner array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "[Point2; 4]", from = "[Point2; 4]")]
pub struct Quad {
    corners: [Point2; 4],
}

impl From<[Point2; 4]> for Quad {
    fn from(corners: [Point2; 4]) -> Self {
        order_corners(corners)
    }
}

impl From<Quad> for [Point2; 4] {
    fn from(quad: Quad) -> Self {
        quad.corners
    }
}

impl Quad {
    pub fn corners(&self) -> &[Point2; 4] {
        &self.corners
    }

    pub fn top_left(&self) -> Point2 {
        self.corners[0]
    }

    pub fn top_right(&self) -> Point2 {
        self.corners[1]
    }

    pub fn bottom_right(&self) -> Point2 {
        self.corners[2]
    }

    pub fn bottom_left(&self) -> Point2 {
        self.corners[3]
    }

    /// Shoelace area; positive for the clockwise (image coordinates) order
    /// this type is meant to hold.
    pub fn signed_area(&self) -> f64 {
        let c = &self.corners;
        (0..4)
            .map(|i| {
                let (a, b) = (c[i], c[(i + 1) % 4]);
                a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64
            })
            .sum::<f64>()
            / 2.0
    }
}

/// Order four corners produced by polygon approximation.
///
/// Corners are sorted by `x + y`: the smallest sum is top-left and the largest
/// bottom-right. Of the two middle corners, the one with the smaller `y` is
/// top-right. When the second-smallest sum sits strictly lower than the third,
/// the card is tilted right and the middle pair is swapped.
///
/// Holds for portrait cards rotated by less than 45 degrees. Landscape quads
/// rotated past `atan(height / width)` come out mirrored.
pub fn order_corners(corners: [Point2; 4]) -> Quad {
    let mut sorted = corners;
    sorted.sort_by(|a, b| a.sum().total_cmp(&b.sum()));
    let [s0, s1, s2, s3] = sorted;

    let corners = if s1.y > s2.y {
        // tilted right
        [s0, s2, s3, s1]
    } else {
        // tilted left
        [s0, s1, s3, s2]
    };
    Quad { corners }
}

/// Rectified card size `(width, height)` for a requested output height.
pub fn card_dimensions(target_height: u32) -> (u32, u32) {
    let height = target_height as f64 * CARD_HEIGHT_FRACTION;
    let width = height * CARD_ASPECT;
    (width.round() as u32, height.round() as u32)
}

/// Width over height folded into `(0, 1]`, or `None` for a degenerate box.
pub fn normalized_aspect(width: f64, height: f64) -> Option<f64> {
    if !(width > 0.0 && height > 0.0) {
        return None;
    }
    Some(width.min(height) / width.max(height))
}
