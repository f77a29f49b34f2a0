//! Path storage: the vertex container handed to raster surfaces.
//!
//! Stores vertices tagged with path commands. A quadratic curve occupies two
//! consecutive `PATH_CMD_CURVE3` vertices (control point, then end point).
//! [`PathStorage::flatten`] turns the stored commands into plain polylines,
//! one per sub-path, which is what the coverage rasterizer and the footprint
//! sampler consume.

use crate::basics::{
    is_curve3, is_move_to, is_stop, is_vertex, PointD, VertexD, VertexSource, PATH_CMD_CURVE3,
    PATH_CMD_LINE_TO, PATH_CMD_MOVE_TO, PATH_CMD_STOP,
};
use crate::curves::Curve3Div;

#[derive(Debug, Clone, Default)]
pub struct PathStorage {
    vertices: Vec<VertexD>,
    iterator: usize,
}

impl PathStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.vertices.push(VertexD::new(x, y, PATH_CMD_MOVE_TO));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.vertices.push(VertexD::new(x, y, PATH_CMD_LINE_TO));
    }

    /// Add a quadratic Bezier curve from the current point.
    pub fn curve3(&mut self, x_ctrl: f64, y_ctrl: f64, x_to: f64, y_to: f64) {
        self.vertices
            .push(VertexD::new(x_ctrl, y_ctrl, PATH_CMD_CURVE3));
        self.vertices.push(VertexD::new(x_to, y_to, PATH_CMD_CURVE3));
    }

    pub fn total_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn command(&self, idx: usize) -> u32 {
        self.vertices.get(idx).map_or(PATH_CMD_STOP, |v| v.cmd)
    }

    /// Coordinates of vertex `idx`, or `None` past the end.
    pub fn vertex_at(&self, idx: usize) -> Option<PointD> {
        self.vertices.get(idx).map(|v| PointD::new(v.x, v.y))
    }

    pub fn last_command(&self) -> u32 {
        self.command(self.vertices.len().wrapping_sub(1))
    }

    /// Flatten every sub-path into a polyline.
    ///
    /// Curves are subdivided with [`Curve3Div`] at the given approximation
    /// scale. A sub-path made of a single `move_to` yields a one-point
    /// polyline; callers decide whether such a path is visible.
    pub fn flatten(&self, approximation_scale: f64) -> Vec<Vec<PointD>> {
        let mut polylines: Vec<Vec<PointD>> = Vec::new();
        let mut current: Vec<PointD> = Vec::new();
        let mut curve = Curve3Div::new();
        curve.set_approximation_scale(approximation_scale);

        let mut i = 0;
        while i < self.vertices.len() {
            let v = self.vertices[i];
            if is_move_to(v.cmd) {
                if !current.is_empty() {
                    polylines.push(std::mem::take(&mut current));
                }
                current.push(PointD::new(v.x, v.y));
                i += 1;
            } else if is_curve3(v.cmd) {
                let start = current.last().copied().unwrap_or_default();
                let Some(end) = self.vertices.get(i + 1) else {
                    break;
                };
                if current.is_empty() {
                    current.push(start);
                }
                curve.init(start, PointD::new(v.x, v.y), PointD::new(end.x, end.y));
                current.extend_from_slice(&curve.points()[1..]);
                i += 2;
            } else {
                if current.is_empty() {
                    current.push(PointD::default());
                }
                current.push(PointD::new(v.x, v.y));
                i += 1;
            }
        }
        if !current.is_empty() {
            polylines.push(current);
        }
        polylines
    }
}

impl VertexSource for PathStorage {
    fn rewind(&mut self, path_id: u32) {
        self.iterator = path_id as usize;
    }

    fn vertex(&mut self, x: &mut f64, y: &mut f64) -> u32 {
        let Some(v) = self.vertices.get(self.iterator) else {
            return PATH_CMD_STOP;
        };
        *x = v.x;
        *y = v.y;
        self.iterator += 1;
        v.cmd
    }
}

/// Collect every vertex of a source, stopping at the first non-vertex command.
pub fn collect_vertices(vs: &mut dyn VertexSource) -> Vec<VertexD> {
    let mut out = Vec::new();
    vs.rewind(0);
    let (mut x, mut y) = (0.0, 0.0);
    loop {
        let cmd = vs.vertex(&mut x, &mut y);
        if is_stop(cmd) || !is_vertex(cmd) {
            break;
        }
        out.push(VertexD::new(x, y, cmd));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_empty() {
        let ps = PathStorage::new();
        assert_eq!(ps.total_vertices(), 0);
        assert_eq!(ps.last_command(), PATH_CMD_STOP);
        assert!(ps.flatten(1.0).is_empty());
    }

    #[test]
    fn test_move_to_line_to() {
        let mut ps = PathStorage::new();
        ps.move_to(10.0, 20.0);
        ps.line_to(30.0, 40.0);
        ps.line_to(50.0, 60.0);

        assert_eq!(ps.total_vertices(), 3);
        assert_eq!(ps.command(0), PATH_CMD_MOVE_TO);
        assert_eq!(ps.command(2), PATH_CMD_LINE_TO);
        assert_eq!(ps.vertex_at(1), Some(PointD::new(30.0, 40.0)));

        let lines = ps.flatten(1.0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 3);
    }

    #[test]
    fn test_curve3_occupies_two_vertices() {
        let mut ps = PathStorage::new();
        ps.move_to(0.0, 0.0);
        ps.curve3(50.0, 100.0, 100.0, 0.0);

        assert_eq!(ps.total_vertices(), 3);
        assert_eq!(ps.command(1), PATH_CMD_CURVE3);
        assert_eq!(ps.command(2), PATH_CMD_CURVE3);
    }

    #[test]
    fn test_flatten_curve_ends_at_curve_end() {
        let mut ps = PathStorage::new();
        ps.move_to(0.0, 0.0);
        ps.curve3(50.0, 100.0, 100.0, 0.0);
        ps.line_to(120.0, 0.0);

        let lines = ps.flatten(1.0);
        assert_eq!(lines.len(), 1);
        let line = &lines[0];
        assert!(line.len() > 4);
        assert_eq!(line[0], PointD::new(0.0, 0.0));
        assert_eq!(line[line.len() - 2], PointD::new(100.0, 0.0));
        assert_eq!(line[line.len() - 1], PointD::new(120.0, 0.0));
    }

    #[test]
    fn test_flatten_splits_sub_paths() {
        let mut ps = PathStorage::new();
        ps.move_to(0.0, 0.0);
        ps.line_to(10.0, 0.0);
        ps.move_to(5.0, 5.0);

        let lines = ps.flatten(1.0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], vec![PointD::new(5.0, 5.0)]);
    }

    #[test]
    fn test_vertex_source_iteration() {
        let mut ps = PathStorage::new();
        ps.move_to(10.0, 20.0);
        ps.curve3(15.0, 25.0, 30.0, 40.0);

        let verts = collect_vertices(&mut ps);
        assert_eq!(verts.len(), 3);
        assert_eq!(verts[0].cmd, PATH_CMD_MOVE_TO);
        assert_eq!(verts[2], VertexD::new(30.0, 40.0, PATH_CMD_CURVE3));
    }
}
