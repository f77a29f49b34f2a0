//! Midpoint-smoothed stroke paths.
//!
//! Freehand input is jittery, so raw points are never joined directly. The
//! path starts at the second point; each raw point then becomes the control
//! point of a quadratic curve ending halfway to the next raw point; a final
//! straight segment reaches the last raw point.
//!
//! A stroke made without dragging is a zero-length segment, which a canvas
//! prunes before stroking. [`PathClosing::Nudged`] moves the closing point by
//! [`NUDGE`] on both axes so such strokes stay visible.

use crate::basics::{round_half_up, PointD};
use crate::color::Rgba8;
use crate::math::mid_point;
use crate::model::{Point, Stroke};
use crate::path_storage::PathStorage;
use crate::surface::{RasterSurface, StrokeStyle};

/// Offset applied to the closing point of a nudged path, in pixels.
pub const NUDGE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClosing {
    /// Close on the last raw point. A single point yields no path.
    Exact,
    /// Close on the last raw point shifted by [`NUDGE`]. A single point
    /// yields a minimal visible segment.
    Nudged,
}

/// Build the smoothed centerline of `points`, or `None` when there is nothing
/// to trace.
pub fn smoothed_path(points: &[Point], closing: PathClosing) -> Option<PathStorage> {
    let nudge = match closing {
        PathClosing::Exact => 0.0,
        PathClosing::Nudged => NUDGE,
    };
    let mut path = PathStorage::new();

    match points {
        [] => return None,
        [only] => {
            if closing == PathClosing::Exact {
                return None;
            }
            path.move_to(only.x, only.y);
            path.line_to(only.x + nudge, only.y + nudge);
        }
        [_, second, ..] => {
            path.move_to(second.x, second.y);
            for pair in points.windows(2) {
                let (p1, p2): (PointD, PointD) = (pair[0].into(), pair[1].into());
                let mid = mid_point(p1, p2);
                path.curve3(p1.x, p1.y, mid.x, mid.y);
            }
            let last = points[points.len() - 1];
            path.line_to(last.x + nudge, last.y + nudge);
        }
    }
    Some(path)
}

/// Stroke a point sequence on a surface, the way the drawing canvas renders
/// it. Fewer than two points draw nothing.
pub fn draw_points<S: RasterSurface + ?Sized>(surface: &mut S, points: &[Point], style: &StrokeStyle) {
    if points.len() < 2 {
        return;
    }
    if let Some(path) = smoothed_path(points, PathClosing::Nudged) {
        surface.stroke_path(&path, style);
    }
}

/// Stroke every stroke in order, optionally at display scale.
pub fn draw_strokes<S: RasterSurface + ?Sized>(
    surface: &mut S,
    strokes: &[Stroke],
    scale_factor: Option<f64>,
) {
    for stroke in strokes {
        let (points, brush_size) = match scale_factor {
            Some(scale) => (scale_points(&stroke.points, scale), stroke.brush_size * scale),
            None => (stroke.points.clone(), stroke.brush_size),
        };
        let style = StrokeStyle::new(Rgba8::parse_css(&stroke.brush_color), brush_size);
        draw_points(surface, &points, &style);
    }
}

pub fn scale_points(points: &[Point], scale_factor: f64) -> Vec<Point> {
    points
        .iter()
        .map(|p| Point::new(p.x * scale_factor, p.y * scale_factor))
        .collect()
}

/// Round every coordinate to the nearest pixel (halves round up).
pub fn round_points(points: &[Point]) -> Vec<Point> {
    points
        .iter()
        .map(|p| Point::new(round_half_up(p.x) as f64, round_half_up(p.y) as f64))
        .collect()
}
