//! Anti-aliased coverage rasterizer for stroked polylines.
//!
//! A stroke with round caps and round joins is exactly the set of points
//! within `line_width / 2` of its centerline, so coverage is computed from the
//! distance between each pixel center and the nearest centerline segment. The
//! edge is feathered over one pixel: a pixel whose center lies at distance `d`
//! receives coverage `clamp(w/2 + 0.5 - d, 0, 1)`.
//!
//! Coverage of every segment of one path is merged with `max` into a single
//! cover mask before blending, so a path that crosses itself is painted once
//! (the way a canvas fills a stroke outline), never darkened by overlap.

use crate::basics::{ifloor, PointD, RectI};
use crate::color::Rgba8;
use crate::math::{calc_distance, calc_segment_point_sq_distance, VERTEX_DIST_EPSILON};
use crate::rendering_buffer::RgbaBuffer;

pub const COVER_NONE: u8 = 0;
pub const COVER_FULL: u8 = 255;

/// Accumulates coverage for one stroked path at a time.
#[derive(Debug, Default)]
pub struct StrokeRasterizer {
    width: u32,
    height: u32,
    covers: Vec<u8>,
    dirty: Option<RectI>,
}

impl StrokeRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare an empty cover mask of the given size.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.covers.clear();
        self.covers.resize(width as usize * height as usize, COVER_NONE);
        self.dirty = None;
    }

    /// Add one polyline of the stroke's centerline.
    ///
    /// Polylines of zero total length are pruned, as a canvas prunes
    /// zero-length subpaths before stroking.
    pub fn add_polyline(&mut self, points: &[PointD], line_width: f64) {
        if points.len() < 2 || line_width <= 0.0 {
            return;
        }
        let length: f64 = points
            .windows(2)
            .map(|w| calc_distance(w[0].x, w[0].y, w[1].x, w[1].y))
            .sum();
        if length < VERTEX_DIST_EPSILON {
            return;
        }
        for w in points.windows(2) {
            self.add_segment(w[0], w[1], line_width / 2.0);
        }
    }

    fn add_segment(&mut self, p1: PointD, p2: PointD, half_width: f64) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        let reach = half_width + 0.5;
        let mut area = RectI::new(
            ifloor(p1.x.min(p2.x) - reach) as i32,
            ifloor(p1.y.min(p2.y) - reach) as i32,
            ifloor(p1.x.max(p2.x) + reach) as i32,
            ifloor(p1.y.max(p2.y) + reach) as i32,
        );
        let bounds = RectI::new(0, 0, self.width as i32 - 1, self.height as i32 - 1);
        if !area.clip(&bounds) {
            return;
        }

        let mut touched = false;
        for y in area.y1..=area.y2 {
            let cy = y as f64 + 0.5;
            let row = y as usize * self.width as usize;
            for x in area.x1..=area.x2 {
                let cx = x as f64 + 0.5;
                let d = calc_segment_point_sq_distance(p1.x, p1.y, p2.x, p2.y, cx, cy).sqrt();
                let cover = (reach - d).clamp(0.0, 1.0);
                if cover <= 0.0 {
                    continue;
                }
                let cover = (cover * COVER_FULL as f64).round() as u8;
                let slot = &mut self.covers[row + x as usize];
                if cover > *slot {
                    *slot = cover;
                    touched = true;
                }
            }
        }
        if touched {
            self.dirty = Some(match self.dirty {
                Some(d) => RectI::new(
                    d.x1.min(area.x1),
                    d.y1.min(area.y1),
                    d.x2.max(area.x2),
                    d.y2.max(area.y2),
                ),
                None => area,
            });
        }
    }

    pub fn cover(&self, x: u32, y: u32) -> u8 {
        self.covers[y as usize * self.width as usize + x as usize]
    }

    /// Number of pixels with non-zero coverage.
    pub fn covered_pixels(&self) -> usize {
        self.covers.iter().filter(|&&c| c > COVER_NONE).count()
    }

    /// Blend the accumulated coverage into `buf` with a solid color.
    /// The buffer must have the rasterizer's dimensions.
    pub fn render(&self, buf: &mut RgbaBuffer, color: &Rgba8) {
        debug_assert_eq!((buf.width(), buf.height()), (self.width, self.height));
        let Some(area) = self.dirty else {
            return;
        };
        let w = self.width as usize;
        for y in area.y1..=area.y2 {
            let row = y as usize * w;
            let span = &self.covers[row + area.x1 as usize..=row + area.x2 as usize];
            buf.blend_solid_hspan(area.x1 as u32, y as u32, color, span);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line_coverage() {
        let mut ras = StrokeRasterizer::new();
        ras.reset(40, 20);
        ras.add_polyline(&[PointD::new(10.0, 10.0), PointD::new(30.0, 10.0)], 4.0);

        // Inside the body of the stroke.
        assert_eq!(ras.cover(20, 9), COVER_FULL);
        assert_eq!(ras.cover(20, 10), COVER_FULL);
        // Far from it.
        assert_eq!(ras.cover(20, 2), COVER_NONE);
        assert_eq!(ras.cover(2, 10), COVER_NONE);
        // Round cap reaches past the endpoint.
        assert!(ras.cover(31, 10) > COVER_NONE);
    }

    #[test]
    fn test_zero_length_polyline_is_pruned() {
        let mut ras = StrokeRasterizer::new();
        ras.reset(20, 20);
        ras.add_polyline(&[PointD::new(5.0, 5.0), PointD::new(5.0, 5.0)], 6.0);
        ras.add_polyline(&[PointD::new(5.0, 5.0)], 6.0);
        assert_eq!(ras.covered_pixels(), 0);
    }

    #[test]
    fn test_tiny_segment_draws_a_dot() {
        let mut ras = StrokeRasterizer::new();
        ras.reset(20, 20);
        ras.add_polyline(&[PointD::new(10.0, 10.0), PointD::new(10.1, 10.1)], 4.0);
        let n = ras.covered_pixels();
        // Roughly a disc of radius 2.5 (including the feathered edge).
        assert!((12..=36).contains(&n), "covered {}", n);
    }

    #[test]
    fn test_self_overlap_is_painted_once() {
        let mut ras = StrokeRasterizer::new();
        ras.reset(30, 30);
        let there_and_back = [
            PointD::new(5.0, 15.0),
            PointD::new(25.0, 15.0),
            PointD::new(5.0, 15.0),
        ];
        ras.add_polyline(&there_and_back, 3.0);

        let mut buf = RgbaBuffer::new(30, 30);
        let half_black = Rgba8::new(0, 0, 0, 128);
        ras.render(&mut buf, &half_black);
        assert_eq!(buf.pixel(15, 15).a, 128);
    }

    #[test]
    fn test_clipped_at_buffer_edges() {
        let mut ras = StrokeRasterizer::new();
        ras.reset(10, 10);
        ras.add_polyline(&[PointD::new(-50.0, 5.0), PointD::new(50.0, 5.0)], 2.0);
        assert_eq!(ras.cover(0, 5), COVER_FULL);
        assert_eq!(ras.cover(9, 5), COVER_FULL);

        let mut buf = RgbaBuffer::new(10, 10);
        ras.render(&mut buf, &Rgba8::BLACK);
        assert_eq!(buf.pixel(9, 4).a, 255);
        assert_eq!(buf.pixel(9, 0).a, 0);
    }
}
