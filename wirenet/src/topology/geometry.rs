//! Geometry and hit-testing primitives
//!
//! Point-to-point and point-to-segment distances on the editor canvas, plus the
//! nearest-within-tolerance selection used by every proximity query in the
//! wire graph.

use serde::{Deserialize, Serialize};

/// Segments shorter than this (squared length) are treated as a single point.
const DEGENERATE_LENGTH_SQ: f64 = 1e-12;

/// Position on the canvas (editor units)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        distance(self, other)
    }

    /// Linear interpolation between `self` (t = 0) and `other` (t = 1)
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point {
            x: self.x + t * (other.x - self.x),
            y: self.y + t * (other.y - self.y),
        }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point { x, y }
    }
}

/// Euclidean distance between two points
pub fn distance(p1: &Point, p2: &Point) -> f64 {
    let dx = p1.x - p2.x;
    let dy = p1.y - p2.y;
    (dx * dx + dy * dy).sqrt()
}

/// Orthogonal projection of a point onto a segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Distance from the query point to the closest point on the segment
    pub distance: f64,
    /// Segment parameter of the closest point, clamped to `[0, 1]`
    pub t: f64,
    /// Closest point on the segment
    pub point: Point,
}

/// Project `point` onto the segment `start`..`end`.
///
/// Degenerate segments collapse to their start point with `t = 0`.
pub fn project_onto_segment(point: &Point, start: &Point, end: &Point) -> Projection {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < DEGENERATE_LENGTH_SQ {
        return Projection {
            distance: distance(point, start),
            t: 0.0,
            point: *start,
        };
    }

    let t = ((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq;
    let t = t.clamp(0.0, 1.0);
    let proj = start.lerp(end, t);
    Projection {
        distance: distance(point, &proj),
        t,
        point: proj,
    }
}

/// Distance from point to line segment
pub fn distance_point_to_segment(point: &Point, start: &Point, end: &Point) -> f64 {
    project_onto_segment(point, start, end).distance
}

/// Pick the nearest candidate within `tolerance`.
///
/// Candidates are `(id, distance)` pairs. Ties on distance go to the lowest id,
/// so the result does not depend on iteration order.
pub fn nearest_within<I, K>(candidates: I, tolerance: f64) -> Option<(K, f64)>
where
    I: IntoIterator<Item = (K, f64)>,
    K: Ord + Copy,
{
    let mut best: Option<(K, f64)> = None;
    for (id, d) in candidates {
        if d > tolerance || d.is_nan() {
            continue;
        }
        best = match best {
            None => Some((id, d)),
            Some((best_id, best_d)) => {
                if d < best_d || (d == best_d && id < best_id) {
                    Some((id, d))
                } else {
                    Some((best_id, best_d))
                }
            }
        };
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);

        assert!((distance(&p1, &p2) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_point_to_segment_interior() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(10.0, 0.0);
        let proj = project_onto_segment(&Point::new(5.0, 2.0), &start, &end);

        assert!((proj.distance - 2.0).abs() < 1e-9);
        assert!((proj.t - 0.5).abs() < 1e-9);
        assert_eq!(proj.point, Point::new(5.0, 0.0));
    }

    #[test]
    fn test_point_to_segment_clamps_past_endpoint() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(10.0, 0.0);
        let d = distance_point_to_segment(&Point::new(13.0, 4.0), &start, &end);

        assert!((d - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_segment() {
        let p = Point::new(1.0, 1.0);
        let proj = project_onto_segment(&Point::new(4.0, 5.0), &p, &p);

        assert!((proj.distance - 5.0).abs() < 1e-9);
        assert_eq!(proj.t, 0.0);
    }

    #[test]
    fn test_nearest_within_tie_breaks_on_lowest_id() {
        let picked = nearest_within(vec![(7u32, 2.0), (3u32, 2.0), (9u32, 4.0)], 5.0);
        assert_eq!(picked, Some((3, 2.0)));
    }

    #[test]
    fn test_nearest_within_respects_tolerance() {
        assert_eq!(nearest_within(vec![(1u32, 6.0)], 5.0), None);
        assert_eq!(nearest_within(vec![(1u32, 5.0)], 5.0), Some((1, 5.0)));
    }
}
