//! Merging many drawings of one side into per-pixel cells.
//!
//! This is the coarse, surface-free counterpart of the sensation mapper used
//! for density views: each stroke's footprint is traced from its geometry and
//! every covered cell collects one point per stroke.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info};

use crate::footprint::curve_footprint;
pub use crate::footprint::PixelCell;
use crate::model::{PersonaDrawing, SensationPoint};
use crate::progress::{Phase, ProgressSink, ProgressTracker};

/// All points that landed on one pixel cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PixelBin {
    pub x: i64,
    pub y: i64,
    pub points: Vec<SensationPoint>,
}

impl PixelBin {
    pub fn cell(&self) -> PixelCell {
        PixelCell::new(self.x, self.y)
    }
}

/// Fold every drawing into pixel cells, ordered by `(x, y)`.
///
/// Strokes with fewer than two points have no curve and are skipped. Progress
/// is reported after each drawing, then once more before the result is
/// handed back. No drawings means an empty result and no events.
pub fn merge_drawings(drawings: &[&PersonaDrawing], sink: &mut dyn ProgressSink) -> Vec<PixelBin> {
    if drawings.is_empty() {
        return Vec::new();
    }

    let total = drawings.len();
    let mut tracker = ProgressTracker::new(Phase::Binning, total);
    let mut cells: BTreeMap<PixelCell, Vec<SensationPoint>> = BTreeMap::new();

    for drawing in drawings {
        for stroke in drawing.strokes() {
            if stroke.points.len() < 2 {
                continue;
            }
            let sensation = stroke.sensation();
            let footprint = curve_footprint(
                &stroke.points,
                stroke.brush_size,
                drawing.img_width,
                drawing.img_height,
            );
            for cell in footprint {
                cells
                    .entry(cell)
                    .or_default()
                    .push(SensationPoint::new(cell.ix as f64, cell.iy as f64, sensation));
            }
        }
        tracker.advance();
        let percent = (100 * tracker.current() + total / 2) / total;
        tracker.report(sink, format!("Merging drawings ({}%)", percent));
    }
    debug!(drawings = total, cells = cells.len(), "drawings merged");

    tracker.report(sink, "Moving data");
    let bins: Vec<PixelBin> = cells
        .into_iter()
        .map(|(cell, points)| PixelBin {
            x: cell.ix,
            y: cell.iy,
            points,
        })
        .collect();
    info!(drawings = total, bins = bins.len(), "pixel bins ready");
    bins
}
