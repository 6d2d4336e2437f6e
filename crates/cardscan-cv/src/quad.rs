//! Quadrilateral candidates found in the edge map
//!
//! Every 4-vertex contour approximation becomes a `QuadCandidate` or a
//! `Rejection` explaining which acceptance rule it failed.

use crate::Result;
use anyhow::bail;
use cardscan_core::geometry::{Point2, Quad, order_corners};
use opencv::core::{Point, Point2f, Scalar, Vector};
use std::fmt;

/// A contour that passed every shape rule
#[derive(Debug, Clone)]
pub struct QuadCandidate {
    /// Index of the source contour
    pub contour_index: usize,
    /// Approximated polygon, in contour order
    pub points: Vector<Point>,
    pub perimeter: f64,
    pub area: f64,
    /// Area over frame area
    pub area_ratio: f64,
    /// Normalized (<= 1) aspect of the minimum-area rectangle
    pub aspect: f64,
}

impl QuadCandidate {
    /// Corners in top-left, top-right, bottom-right, bottom-left order
    pub fn ordered(&self) -> Result<Quad> {
        if self.points.len() != 4 {
            bail!("Quadrilateral has {} vertices", self.points.len());
        }

        let mut corners = [Point2::default(); 4];
        for (slot, p) in corners.iter_mut().zip(self.points.iter()) {
            *slot = Point2::new(p.x as f32, p.y as f32);
        }
        Ok(order_corners(corners))
    }
}

/// Why a contour was not accepted as a card
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    NotQuadrilateral { vertices: usize },
    Perimeter { perimeter: f64, range: (f64, f64) },
    Area { ratio: f64, range: (f64, f64) },
    Degenerate,
    Aspect { aspect: f64, expected: f64, tolerance: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotQuadrilateral { vertices } => {
                write!(f, "{} vertices instead of 4", vertices)
            }
            Rejection::Perimeter { perimeter, range } => write!(
                f,
                "perimeter {:.1} outside {:.1}..{:.1}",
                perimeter, range.0, range.1
            ),
            Rejection::Area { ratio, range } => write!(
                f,
                "area {:.1}% of frame outside {:.1}%..{:.1}%",
                ratio * 100.0,
                range.0 * 100.0,
                range.1 * 100.0
            ),
            Rejection::Degenerate => write!(f, "degenerate bounding rectangle"),
            Rejection::Aspect {
                aspect,
                expected,
                tolerance,
            } => write!(
                f,
                "aspect {:.3} deviates from {:.3} by more than {:.2}",
                aspect, expected, tolerance
            ),
        }
    }
}

/// Largest-area candidate; the first one found wins ties
pub fn select_best(candidates: &[QuadCandidate]) -> Option<&QuadCandidate> {
    candidates.iter().fold(None, |best: Option<&QuadCandidate>, c| match best {
        Some(b) if c.area <= b.area => Some(b),
        _ => Some(c),
    })
}

/// Corner points for OpenCV's perspective functions
pub fn quad_to_point2f(quad: &Quad) -> Vector<Point2f> {
    quad.corners().iter().map(|p| Point2f::new(p.x, p.y)).collect()
}

/// Corner points rounded to pixel coordinates, for drawing
pub fn quad_to_points(quad: &Quad) -> Vector<Point> {
    quad.corners()
        .iter()
        .map(|p| Point::new(p.x.round() as i32, p.y.round() as i32))
        .collect()
}

/// OpenCV color scalar (BGR format) from an (r, g, b) triple
pub fn bgr_scalar((r, g, b): (u8, u8, u8)) -> Scalar {
    Scalar::new(b as f64, g as f64, r as f64, 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(index: usize, area: f64, pts: [(i32, i32); 4]) -> QuadCandidate {
        QuadCandidate {
            contour_index: index,
            points: pts.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            perimeter: 0.0,
            area,
            area_ratio: 0.0,
            aspect: 0.0,
        }
    }

    #[test]
    fn test_largest_area_wins_and_ties_keep_first() {
        let square = [(0, 0), (10, 0), (10, 10), (0, 10)];
        let candidates = vec![
            candidate(0, 50.0, square),
            candidate(1, 80.0, square),
            candidate(2, 80.0, square),
            candidate(3, 20.0, square),
        ];
        assert_eq!(select_best(&candidates).map(|c| c.contour_index), Some(1));
        assert!(select_best(&[]).is_none());
    }

    #[test]
    fn test_ordered_corners_from_contour_order() -> Result<()> {
        // counter-clockwise contour starting at bottom-left
        let c = candidate(0, 1.0, [(10, 150), (110, 150), (110, 10), (10, 10)]);
        let quad = c.ordered()?;
        assert_eq!(quad.top_left(), Point2::new(10.0, 10.0));
        assert_eq!(quad.top_right(), Point2::new(110.0, 10.0));
        assert_eq!(quad.bottom_right(), Point2::new(110.0, 150.0));
        assert_eq!(quad.bottom_left(), Point2::new(10.0, 150.0));
        assert_eq!(quad_to_point2f(&quad).len(), 4);
        Ok(())
    }

    #[test]
    fn test_rejection_messages() {
        let r = Rejection::Area {
            ratio: 0.9,
            range: (0.1, 0.5),
        };
        assert_eq!(r.to_string(), "area 90.0% of frame outside 10.0%..50.0%");
        assert_eq!(
            Rejection::NotQuadrilateral { vertices: 6 }.to_string(),
            "6 vertices instead of 4"
        );
    }
}
