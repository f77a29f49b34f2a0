//! Quadratic Bezier flattening.
//!
//! Freehand strokes are smoothed into chains of quadratic curves; before any
//! coverage can be computed those curves are flattened into polylines by
//! adaptive de Casteljau subdivision. A curve stops subdividing once its
//! control point lies within `0.5 / approximation_scale` pixels of the chord,
//! which keeps the flattened centerline within half a pixel of the true curve.

use crate::basics::{PointD, VertexSource, PATH_CMD_LINE_TO, PATH_CMD_MOVE_TO, PATH_CMD_STOP};
use crate::math::calc_sq_distance;

const CURVE_COLLINEARITY_EPSILON: f64 = 1e-30;
const CURVE_RECURSION_LIMIT: u32 = 32;

/// Subdivision-based quadratic Bezier flattener.
pub struct Curve3Div {
    approximation_scale: f64,
    distance_tolerance_square: f64,
    count: usize,
    points: Vec<PointD>,
}

impl Curve3Div {
    pub fn new() -> Self {
        Self {
            approximation_scale: 1.0,
            distance_tolerance_square: 0.25,
            count: 0,
            points: Vec::new(),
        }
    }

    /// Build and flatten the curve start→(ctrl)→end in one step.
    pub fn with_points(start: PointD, ctrl: PointD, end: PointD) -> Self {
        let mut c = Self::new();
        c.init(start, ctrl, end);
        c
    }

    pub fn set_approximation_scale(&mut self, s: f64) {
        self.approximation_scale = s;
    }

    pub fn approximation_scale(&self) -> f64 {
        self.approximation_scale
    }

    /// Flatten a new curve, discarding any previous one.
    pub fn init(&mut self, start: PointD, ctrl: PointD, end: PointD) {
        self.points.clear();
        let tolerance = 0.5 / self.approximation_scale;
        self.distance_tolerance_square = tolerance * tolerance;
        self.points.push(start);
        self.recursive_bezier(start, ctrl, end, 0);
        self.points.push(end);
        self.count = 0;
    }

    /// The flattened polyline, both endpoints included.
    pub fn points(&self) -> &[PointD] {
        &self.points
    }

    fn recursive_bezier(&mut self, p1: PointD, p2: PointD, p3: PointD, level: u32) {
        if level > CURVE_RECURSION_LIMIT {
            return;
        }

        let p12 = PointD::new((p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0);
        let p23 = PointD::new((p2.x + p3.x) / 2.0, (p2.y + p3.y) / 2.0);
        let p123 = PointD::new((p12.x + p23.x) / 2.0, (p12.y + p23.y) / 2.0);

        let dx = p3.x - p1.x;
        let dy = p3.y - p1.y;
        let d = ((p2.x - p3.x) * dy - (p2.y - p3.y) * dx).abs();

        if d > CURVE_COLLINEARITY_EPSILON {
            if d * d <= self.distance_tolerance_square * (dx * dx + dy * dy) {
                self.points.push(p123);
                return;
            }
        } else {
            // Control point on the chord line. When it sits between the ends
            // the curve is the chord itself; otherwise the curve folds back
            // and the turning point must be kept.
            let da = dx * dx + dy * dy;
            let d_val = if da == 0.0 {
                calc_sq_distance(p1.x, p1.y, p2.x, p2.y)
            } else {
                let t = ((p2.x - p1.x) * dx + (p2.y - p1.y) * dy) / da;
                if t > 0.0 && t < 1.0 {
                    return;
                }
                if t <= 0.0 {
                    calc_sq_distance(p2.x, p2.y, p1.x, p1.y)
                } else {
                    calc_sq_distance(p2.x, p2.y, p3.x, p3.y)
                }
            };
            if d_val < self.distance_tolerance_square {
                self.points.push(p2);
                return;
            }
        }

        self.recursive_bezier(p1, p12, p123, level + 1);
        self.recursive_bezier(p123, p23, p3, level + 1);
    }
}

impl Default for Curve3Div {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexSource for Curve3Div {
    fn rewind(&mut self, _path_id: u32) {
        self.count = 0;
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        let Some(p) = self.points.get(self.count) else {
            return PATH_CMD_STOP;
        };
        *x = p.x;
        *y = p.y;
        self.count += 1;
        if self.count == 1 {
            PATH_CMD_MOVE_TO
        } else {
            PATH_CMD_LINE_TO
        }
    }
}
