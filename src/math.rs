//! Geometric helpers used by curve flattening and stroke coverage.

use crate::basics::PointD;

/// Distance below which two vertices are treated as coincident.
pub const VERTEX_DIST_EPSILON: f64 = 1e-14;

/// Euclidean distance between two points.
#[inline]
pub fn calc_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    calc_sq_distance(x1, y1, x2, y2).sqrt()
}

/// Squared Euclidean distance between two points.
#[inline]
pub fn calc_sq_distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    dx * dx + dy * dy
}

/// Squared distance from (x, y) to the closed segment (x1,y1)→(x2,y2).
///
/// Degenerate segments collapse to the point-to-point distance.
#[inline]
pub fn calc_segment_point_sq_distance(x1: f64, y1: f64, x2: f64, y2: f64, x: f64, y: f64) -> f64 {
    let dx = x2 - x1;
    let dy = y2 - y1;
    let len_sq = dx * dx + dy * dy;
    if len_sq < VERTEX_DIST_EPSILON {
        return calc_sq_distance(x, y, x1, y1);
    }
    let u = ((x - x1) * dx + (y - y1) * dy) / len_sq;
    if u <= 0.0 {
        calc_sq_distance(x, y, x1, y1)
    } else if u >= 1.0 {
        calc_sq_distance(x, y, x2, y2)
    } else {
        calc_sq_distance(x, y, x1 + u * dx, y1 + u * dy)
    }
}

/// Midpoint of the segment p1→p2.
#[inline]
pub fn mid_point(p1: PointD, p2: PointD) -> PointD {
    PointD::new(p1.x + (p2.x - p1.x) / 2.0, p1.y + (p2.y - p1.y) / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distances() {
        assert!((calc_distance(0.0, 0.0, 3.0, 4.0) - 5.0).abs() < 1e-12);
        assert!((calc_sq_distance(1.0, 1.0, 4.0, 5.0) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_segment_point_distance() {
        // Perpendicular foot inside the segment.
        let d = calc_segment_point_sq_distance(0.0, 0.0, 10.0, 0.0, 5.0, 3.0);
        assert!((d - 9.0).abs() < 1e-12);
        // Beyond the end: distance to the endpoint.
        let d = calc_segment_point_sq_distance(0.0, 0.0, 10.0, 0.0, 13.0, 4.0);
        assert!((d - 25.0).abs() < 1e-12);
        // Degenerate segment.
        let d = calc_segment_point_sq_distance(2.0, 2.0, 2.0, 2.0, 2.0, 5.0);
        assert!((d - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_mid_point() {
        let m = mid_point(PointD::new(0.0, 10.0), PointD::new(4.0, -2.0));
        assert_eq!(m, PointD::new(2.0, 4.0));
    }
}
