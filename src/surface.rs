//! Raster surfaces: where strokes are painted and read back.
//!
//! The mapper never talks to a concrete canvas. It asks a [`SurfaceProvider`]
//! for a surface of the drawing's dimensions, clears it, strokes one path on
//! it and reads the RGBA bytes back. [`RgbaSurfaceProvider`] is the in-memory
//! implementation built on [`RgbaBuffer`] and [`StrokeRasterizer`]; other
//! providers (a GPU canvas, a headless browser) plug in behind the same traits.

use crate::basics::RectI;
use crate::color::Rgba8;
use crate::config::SurfaceConfig;
use crate::error::{Error, Result};
use crate::path_storage::PathStorage;
use crate::rasterizer_stroke::StrokeRasterizer;
use crate::rendering_buffer::RgbaBuffer;

/// Line width used when a stroke asks for a non-positive or non-finite one.
pub const DEFAULT_LINE_WIDTH: f64 = 1.0;

/// Pen used by [`RasterSurface::stroke_path`]. Caps and joins are always round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeStyle {
    pub color: Rgba8,
    pub line_width: f64,
}

impl StrokeStyle {
    pub fn new(color: Rgba8, line_width: f64) -> Self {
        let line_width = if line_width.is_finite() && line_width > 0.0 {
            line_width
        } else {
            DEFAULT_LINE_WIDTH
        };
        Self { color, line_width }
    }
}

/// A 2D drawable surface with RGBA read-back.
pub trait RasterSurface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Reset a rectangle to transparent.
    fn clear(&mut self, rect: RectI);
    /// Stroke `path` with round caps and joins.
    fn stroke_path(&mut self, path: &PathStorage, style: &StrokeStyle);
    /// Every pixel, row-major RGBA, `width * height * 4` bytes.
    fn pixels(&self) -> &[u8];

    fn clear_all(&mut self) {
        let (w, h) = (self.width() as i32, self.height() as i32);
        self.clear(RectI::new(0, 0, w - 1, h - 1));
    }
}

/// Hands out a surface sized for one unit of work.
///
/// A provider that cannot produce a drawable surface reports
/// [`Error::Surface`]; callers treat that as fatal for the current job.
pub trait SurfaceProvider {
    type Surface: RasterSurface;

    fn surface(&mut self, width: u32, height: u32) -> Result<&mut Self::Surface>;
}

/// In-memory RGBA surface.
#[derive(Debug)]
pub struct RgbaSurface {
    buf: RgbaBuffer,
    ras: StrokeRasterizer,
    approximation_scale: f64,
}

impl RgbaSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: RgbaBuffer::new(width, height),
            ras: StrokeRasterizer::new(),
            approximation_scale: 1.0,
        }
    }

    /// Curve flattening precision; 1.0 keeps curves within half a pixel.
    pub fn set_approximation_scale(&mut self, s: f64) {
        self.approximation_scale = s;
    }

    /// Re-dimension the surface, clearing it.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.buf.resize(width, height);
    }

    pub fn buffer(&self) -> &RgbaBuffer {
        &self.buf
    }
}

impl RasterSurface for RgbaSurface {
    fn width(&self) -> u32 {
        self.buf.width()
    }

    fn height(&self) -> u32 {
        self.buf.height()
    }

    fn clear(&mut self, rect: RectI) {
        self.buf.clear_rect(rect);
    }

    fn stroke_path(&mut self, path: &PathStorage, style: &StrokeStyle) {
        self.ras.reset(self.buf.width(), self.buf.height());
        for polyline in path.flatten(self.approximation_scale) {
            self.ras.add_polyline(&polyline, style.line_width);
        }
        self.ras.render(&mut self.buf, &style.color);
    }

    fn pixels(&self) -> &[u8] {
        self.buf.data()
    }
}

/// Provider backed by a single reusable [`RgbaSurface`].
///
/// The same surface is re-dimensioned for every request, so its contents
/// never outlive the unit of work that asked for it.
#[derive(Debug)]
pub struct RgbaSurfaceProvider {
    config: SurfaceConfig,
    surface: RgbaSurface,
}

impl RgbaSurfaceProvider {
    pub fn new(config: SurfaceConfig) -> Self {
        let mut surface = RgbaSurface::new(0, 0);
        surface.set_approximation_scale(config.approximation_scale);
        Self { config, surface }
    }
}

impl Default for RgbaSurfaceProvider {
    fn default() -> Self {
        Self::new(SurfaceConfig::default())
    }
}

impl SurfaceProvider for RgbaSurfaceProvider {
    type Surface = RgbaSurface;

    fn surface(&mut self, width: u32, height: u32) -> Result<&mut RgbaSurface> {
        if width == 0 || height == 0 {
            return Err(Error::Surface {
                width,
                height,
                reason: "surface has no pixels".into(),
            });
        }
        if width > self.config.max_width || height > self.config.max_height {
            return Err(Error::Surface {
                width,
                height,
                reason: format!(
                    "exceeds the configured maximum of {}x{}",
                    self.config.max_width, self.config.max_height
                ),
            });
        }
        self.surface.resize(width, height);
        Ok(&mut self.surface)
    }
}
