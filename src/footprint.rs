//! Pixel footprints traced from stroke geometry without a raster surface.
//!
//! The smoothed centerline is flattened, then walked at a fixed step of
//! [`SAMPLE_STEP`] units. Every sample is snapped to the pixel grid and grown
//! into a square of side `brush_size` around it. Cells repeated within one
//! stroke are emitted once.
//!
//! This is coarser than surface rasterization (square brush, no coverage
//! threshold) and is used where only an approximate area per stroke is
//! needed, such as merging many drawings into a density grid.

use std::collections::HashSet;

use crate::basics::{iceil, round_half_up, PointD};
use crate::math::{calc_distance, VERTEX_DIST_EPSILON};
use crate::model::{Point, Stroke};
use crate::path_storage::PathStorage;
use crate::stroke_path::{smoothed_path, PathClosing};

/// Arc-length distance between two consecutive samples.
pub const SAMPLE_STEP: f64 = 1.0;

/// One integral pixel cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelCell {
    pub ix: i64,
    pub iy: i64,
}

impl PixelCell {
    pub fn new(ix: i64, iy: i64) -> Self {
        Self { ix, iy }
    }
}

/// Walk a polyline at a fixed arc-length step.
///
/// The first vertex is always emitted, then one sample every `step` units,
/// then the last vertex if the walk did not land on it.
pub fn sample_polyline(points: &[PointD], step: f64) -> Vec<PointD> {
    let Some(&first) = points.first() else {
        return Vec::new();
    };
    let mut out = vec![first];
    if step <= 0.0 {
        out.extend_from_slice(&points[1..]);
        return out;
    }

    // Distance walked since the last emitted sample.
    let mut carry = 0.0;
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let len = calc_distance(a.x, a.y, b.x, b.y);
        if len < VERTEX_DIST_EPSILON {
            continue;
        }
        let mut t = step - carry;
        while t <= len {
            let k = t / len;
            out.push(PointD::new(a.x + (b.x - a.x) * k, a.y + (b.y - a.y) * k));
            t += step;
        }
        carry = len - (t - step);
    }

    if let (Some(&last), Some(&emitted)) = (points.last(), out.last()) {
        if calc_distance(last.x, last.y, emitted.x, emitted.y) >= VERTEX_DIST_EPSILON {
            out.push(last);
        }
    }
    out
}

/// Sample every sub-path of `path` at [`SAMPLE_STEP`].
pub fn sample_path(path: &PathStorage, approximation_scale: f64) -> Vec<PointD> {
    path.flatten(approximation_scale)
        .iter()
        .flat_map(|polyline| sample_polyline(polyline, SAMPLE_STEP))
        .collect()
}

/// Grow samples into brush-sized squares clipped to `[0, width] x [0, height]`.
///
/// A sample rounded to `(x, y)` covers `ceil(x - r) .. ceil(x + r)` on each
/// axis, end exclusive, with `r = brush_size / 2`.
pub fn expand_samples(samples: &[PointD], brush_size: f64, width: u32, height: u32) -> Vec<PixelCell> {
    let radius = brush_size / 2.0;
    let (max_x, max_y) = (i64::from(width), i64::from(height));
    let mut seen = HashSet::new();
    let mut cells = Vec::new();

    for s in samples {
        let (x, y) = (round_half_up(s.x) as f64, round_half_up(s.y) as f64);
        let (x0, x1) = (iceil(x - radius).max(0), iceil(x + radius).min(max_x + 1));
        let (y0, y1) = (iceil(y - radius).max(0), iceil(y + radius).min(max_y + 1));
        for ix in x0..x1 {
            for iy in y0..y1 {
                let cell = PixelCell::new(ix, iy);
                if seen.insert(cell) {
                    cells.push(cell);
                }
            }
        }
    }
    cells
}

/// Footprint of the bare smoothed curve. A single point has no curve and
/// therefore no footprint.
pub fn curve_footprint(points: &[Point], brush_size: f64, width: u32, height: u32) -> Vec<PixelCell> {
    match smoothed_path(points, PathClosing::Exact) {
        Some(path) => expand_samples(&sample_path(&path, 1.0), brush_size, width, height),
        None => Vec::new(),
    }
}

/// Footprint of a stroke. A single-point stroke is traced as a minimal nudged
/// segment so it still covers a brush-sized area.
pub fn stroke_footprint(stroke: &Stroke, width: u32, height: u32) -> Vec<PixelCell> {
    let closing = if stroke.points.len() == 1 {
        PathClosing::Nudged
    } else {
        PathClosing::Exact
    };
    match smoothed_path(&stroke.points, closing) {
        Some(path) => expand_samples(&sample_path(&path, 1.0), stroke.brush_size, width, height),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sensation;

    #[test]
    fn test_sample_polyline_step() {
        let line = [PointD::new(0.0, 0.0), PointD::new(3.0, 0.0), PointD::new(3.0, 2.5)];
        let s = sample_polyline(&line, 1.0);
        let expected = [(0.0, 0.0), (1.0, 0.0), (2.0, 0.0), (3.0, 0.0), (3.0, 1.0), (3.0, 2.0), (3.0, 2.5)];
        assert_eq!(s.len(), expected.len());
        for (p, (x, y)) in s.iter().zip(expected) {
            assert!((p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9, "{:?}", p);
        }
    }

    #[test]
    fn test_sample_polyline_carries_across_vertices() {
        let line = [PointD::new(0.0, 0.0), PointD::new(0.5, 0.0), PointD::new(2.0, 0.0)];
        let s = sample_polyline(&line, 1.0);
        assert_eq!(s.len(), 3);
        assert!((s[1].x - 1.0).abs() < 1e-12);
        assert_eq!(s[2], PointD::new(2.0, 0.0));
    }

    #[test]
    fn test_expand_even_brush() {
        let cells = expand_samples(&[PointD::new(10.2, 10.5)], 4.0, 100, 100);
        // Rounded to (10, 11), covering 8..12 by 9..13.
        assert_eq!(cells.len(), 16);
        assert!(cells.contains(&PixelCell::new(8, 9)));
        assert!(cells.contains(&PixelCell::new(11, 12)));
        assert!(!cells.contains(&PixelCell::new(12, 12)));
    }

    #[test]
    fn test_expand_odd_brush() {
        let cells = expand_samples(&[PointD::new(5.0, 5.0)], 3.0, 100, 100);
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&PixelCell::new(4, 4)));
        assert!(cells.contains(&PixelCell::new(6, 6)));
    }

    #[test]
    fn test_expand_is_clipped_inclusively() {
        let cells = expand_samples(&[PointD::new(0.0, 10.0)], 4.0, 10, 10);
        assert!(cells.iter().all(|c| (0..=10).contains(&c.ix) && (0..=10).contains(&c.iy)));
        assert!(cells.contains(&PixelCell::new(0, 10)));
        assert_eq!(cells.len(), 2 * 3);
    }

    #[test]
    fn test_duplicates_within_stroke_suppressed() {
        let samples = [PointD::new(5.0, 5.0), PointD::new(5.3, 5.1), PointD::new(6.0, 5.0)];
        let cells = expand_samples(&samples, 2.0, 100, 100);
        let unique: HashSet<_> = cells.iter().collect();
        assert_eq!(unique.len(), cells.len());
        assert_eq!(cells.len(), 6);
    }

    #[test]
    fn test_single_point_stroke() {
        let stroke = Stroke::new(vec![Point::new(20.0, 20.0)], 4.0, Sensation::new(1, 1));
        assert!(curve_footprint(&stroke.points, 4.0, 50, 50).is_empty());
        let cells = stroke_footprint(&stroke, 50, 50);
        assert_eq!(cells.len(), 16);
    }
}
