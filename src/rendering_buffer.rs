//! Rendering buffer: owned, row-major RGBA pixel storage.
//!
//! Rows are laid out top-down with a stride of `width * 4` bytes, matching the
//! layout a canvas returns from `getImageData`. Blending follows the
//! non-premultiplied "source-over" rule; coverage values scale the source
//! alpha before blending.

use crate::basics::RectI;
use crate::color::Rgba8;

/// Bytes per pixel.
pub const BPP: usize = 4;

#[derive(Debug, Clone, Default)]
pub struct RgbaBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbaBuffer {
    /// A fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0u8; width as usize * height as usize * BPP],
        }
    }

    /// Re-dimension the buffer. Like assigning a canvas size, this always
    /// resets every pixel to transparent, even when the size is unchanged.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data
            .resize(width as usize * height as usize * BPP, 0);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        self.width as usize * BPP
    }

    /// The whole buffer, row-major RGBA.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bounds of the buffer as an inclusive rectangle.
    pub fn bounds(&self) -> RectI {
        RectI::new(0, 0, self.width as i32 - 1, self.height as i32 - 1)
    }

    pub fn row_slice(&self, y: u32) -> &[u8] {
        assert!(
            y < self.height,
            "row {} out of bounds (height={})",
            y,
            self.height
        );
        let start = y as usize * self.stride();
        &self.data[start..start + self.stride()]
    }

    pub fn row_slice_mut(&mut self, y: u32) -> &mut [u8] {
        assert!(
            y < self.height,
            "row {} out of bounds (height={})",
            y,
            self.height
        );
        let stride = self.stride();
        let start = y as usize * stride;
        &mut self.data[start..start + stride]
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgba8 {
        let off = x as usize * BPP;
        let row = self.row_slice(y);
        Rgba8::new(row[off], row[off + 1], row[off + 2], row[off + 3])
    }

    /// Reset a rectangle to transparent black. The rectangle is clipped to
    /// the buffer first; an empty intersection is a no-op.
    pub fn clear_rect(&mut self, rect: RectI) {
        let mut r = rect;
        if !r.clip(&self.bounds()) {
            return;
        }
        for y in r.y1..=r.y2 {
            let row = self.row_slice_mut(y as u32);
            row[r.x1 as usize * BPP..(r.x2 as usize + 1) * BPP].fill(0);
        }
    }

    /// Blend a horizontal span of per-pixel coverages with a solid color.
    /// The span must lie inside the buffer.
    pub fn blend_solid_hspan(&mut self, x: u32, y: u32, c: &Rgba8, covers: &[u8]) {
        let row = self.row_slice_mut(y);
        for (i, &cover) in covers.iter().enumerate() {
            if cover == 0 {
                continue;
            }
            let alpha = Rgba8::multiply(c.a, cover);
            if alpha == 0 {
                continue;
            }
            let off = (x as usize + i) * BPP;
            let p = &mut row[off..off + BPP];
            p[0] = Rgba8::lerp(p[0], c.r, alpha);
            p[1] = Rgba8::lerp(p[1], c.g, alpha);
            p[2] = Rgba8::lerp(p[2], c.b, alpha);
            p[3] = Rgba8::lerp(p[3], 255, alpha);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_transparent() {
        let buf = RgbaBuffer::new(8, 4);
        assert_eq!(buf.data().len(), 8 * 4 * BPP);
        assert!(buf.data().iter().all(|&b| b == 0));
        assert_eq!(buf.stride(), 32);
    }

    #[test]
    fn test_blend_full_cover() {
        let mut buf = RgbaBuffer::new(10, 10);
        let red = Rgba8::new_opaque(255, 0, 0);
        buf.blend_solid_hspan(2, 3, &red, &[255, 255, 0]);
        assert_eq!(buf.pixel(2, 3), red);
        assert_eq!(buf.pixel(3, 3), red);
        assert_eq!(buf.pixel(4, 3).a, 0);
    }

    #[test]
    fn test_blend_partial_cover_accumulates_alpha() {
        let mut buf = RgbaBuffer::new(4, 1);
        let black = Rgba8::BLACK;
        buf.blend_solid_hspan(0, 0, &black, &[128]);
        let a1 = buf.pixel(0, 0).a;
        buf.blend_solid_hspan(0, 0, &black, &[128]);
        let a2 = buf.pixel(0, 0).a;
        assert!(a1 > 0 && a2 > a1 && a2 < 255);
    }

    #[test]
    fn test_clear_rect_clips() {
        let mut buf = RgbaBuffer::new(6, 6);
        let c = Rgba8::new_opaque(1, 2, 3);
        for y in 0..6 {
            buf.blend_solid_hspan(0, y, &c, &[255; 6]);
        }
        buf.clear_rect(RectI::new(3, 3, 100, 100));
        assert_eq!(buf.pixel(2, 2), c);
        assert_eq!(buf.pixel(3, 3).a, 0);
        assert_eq!(buf.pixel(5, 5).a, 0);

        buf.clear_rect(RectI::new(-10, -10, -1, -1));
        assert_eq!(buf.pixel(0, 0), c);
    }

    #[test]
    fn test_resize_clears() {
        let mut buf = RgbaBuffer::new(2, 2);
        buf.blend_solid_hspan(0, 0, &Rgba8::BLACK, &[255, 255]);
        buf.resize(2, 2);
        assert!(buf.data().iter().all(|&b| b == 0));
        buf.resize(3, 5);
        assert_eq!(buf.data().len(), 3 * 5 * BPP);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_row_out_of_bounds_panics() {
        let buf = RgbaBuffer::new(2, 2);
        let _ = buf.row_slice(2);
    }
}
