//! Stroke-to-pixel sensation mapping.
//!
//! Each stroke of a drawing is painted alone on a freshly cleared surface and
//! the surface is read back: every pixel with non-zero alpha is tagged with
//! the stroke's sensation. Strokes are processed in drawing order, so where
//! strokes overlap the last one wins. A single sweep of the finished map then
//! yields the drawn points and the per-category area.

use std::collections::BTreeMap;
use std::slice;

use tracing::debug;

use crate::area::AreaTally;
use crate::error::Result;
use crate::model::{PersonaDrawing, Sensation, SensationPoint};
use crate::stroke_path::draw_strokes;
use crate::surface::{RasterSurface, SurfaceProvider};

#[inline]
fn pack(x: u32, y: u32) -> u64 {
    (u64::from(y) << 32) | u64::from(x)
}

#[inline]
fn unpack(key: u64) -> (u32, u32) {
    (key as u32, (key >> 32) as u32)
}

/// Sparse pixel → sensation store for one drawing.
///
/// Keys pack `(y, x)` into one `u64`, so iteration is row-major.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensationPixelMap {
    width: u32,
    height: u32,
    pixels: BTreeMap<u64, Sensation>,
}

impl SensationPixelMap {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: BTreeMap::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Tag a pixel, returning the sensation it replaces.
    pub fn set(&mut self, x: u32, y: u32, sensation: Sensation) -> Option<Sensation> {
        self.pixels.insert(pack(x, y), sensation)
    }

    pub fn get(&self, x: u32, y: u32) -> Option<Sensation> {
        self.pixels.get(&pack(x, y)).copied()
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Every tagged pixel as `(x, y, sensation)`, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, Sensation)> + '_ {
        self.pixels.iter().map(|(&key, &s)| {
            let (x, y) = unpack(key);
            (x, y, s)
        })
    }

    /// Visit every pixel once: collect it as a drawn point and, when a tally
    /// is given, count it under its sensation.
    pub fn sweep(&self, mut tally: Option<&mut AreaTally>) -> Vec<SensationPoint> {
        let mut points = Vec::with_capacity(self.len());
        for (x, y, sensation) in self.iter() {
            points.push(SensationPoint::new(f64::from(x), f64::from(y), sensation));
            if let Some(t) = tally.as_deref_mut() {
                t.record(sensation);
            }
        }
        points
    }
}

/// Map every stroke of `drawing` to the pixels it paints.
///
/// Strokes are drawn unscaled at the drawing's natural size. A provider that
/// cannot produce a surface aborts the whole drawing.
pub fn compute_sensation_map<P: SurfaceProvider>(
    drawing: &PersonaDrawing,
    provider: &mut P,
) -> Result<SensationPixelMap> {
    let (width, height) = (drawing.img_width, drawing.img_height);
    let mut map = SensationPixelMap::new(width, height);

    for (i, stroke) in drawing.strokes().iter().enumerate() {
        let surface = provider.surface(width, height)?;
        surface.clear_all();
        draw_strokes(surface, slice::from_ref(stroke), None);

        let sensation = stroke.sensation();
        let mut painted = 0usize;
        for (idx, px) in surface.pixels().chunks_exact(4).enumerate() {
            if px[3] > 0 {
                let x = (idx % width as usize) as u32;
                let y = (idx / width as usize) as u32;
                map.set(x, y, sensation);
                painted += 1;
            }
        }
        debug!(stroke = i, %sensation, painted, "stroke mapped");
    }
    Ok(map)
}

impl PersonaDrawing {
    /// Rebuild the sensation map and drawn points from the strokes, counting
    /// every drawn pixel once into `tally`.
    pub fn compute_derived<P: SurfaceProvider>(
        &mut self,
        provider: &mut P,
        tally: &mut AreaTally,
    ) -> Result<()> {
        self.invalidate();
        let map = compute_sensation_map(self, provider)?;
        let points = map.sweep(Some(tally));
        debug!(
            width = self.img_width,
            height = self.img_height,
            strokes = self.strokes().len(),
            drawn = points.len(),
            "drawing mapped"
        );
        self.store_derived(map, points);
        Ok(())
    }
}

/// Drawn points of a drawing, computed without touching its caches.
pub fn drawn_points<P: SurfaceProvider>(
    drawing: &PersonaDrawing,
    provider: &mut P,
) -> Result<Vec<SensationPoint>> {
    Ok(compute_sensation_map(drawing, provider)?.sweep(None))
}
