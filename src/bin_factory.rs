//! Rectangular binning of two-dimensional points.
//!
//! The plane is cut into `bin_width x bin_height` cells. A point `(x, y)`
//! belongs to cell `(floor(x / bin_width), floor(y / bin_height))`, anchored
//! in the original domain at `(nx * bin_width, ny * bin_height)`.
//!
//! The grid covers a fixed domain. A point whose cell lies outside it is a
//! domain mismatch and aborts the run with [`Error::BinNotFound`].

use std::collections::BTreeMap;
use std::ops::Range;

use serde::Serialize;
use tracing::debug;

use crate::basics::{iceil, ifloor};
use crate::config::{BinAllocation, BinningConfig};
use crate::error::{Error, Result};
use crate::model::SensationPoint;

/// Cell index in the reduced domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BinId {
    pub nx: i64,
    pub ny: i64,
}

impl BinId {
    pub fn new(nx: i64, ny: i64) -> Self {
        Self { nx, ny }
    }
}

/// One cell and the points that fell into it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub nx: i64,
    pub ny: i64,
    pub x: f64,
    pub y: f64,
    pub points: Vec<SensationPoint>,
}

impl Bin {
    fn new(id: BinId, bin_width: f64, bin_height: f64) -> Self {
        Self {
            nx: id.nx,
            ny: id.ny,
            x: id.nx as f64 * bin_width,
            y: id.ny as f64 * bin_height,
            points: Vec::new(),
        }
    }

    pub fn id(&self) -> BinId {
        BinId::new(self.nx, self.ny)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Cell indices whose cells intersect `[start, end)`.
fn axis_ids(start: f64, end: f64, step: f64) -> Range<i64> {
    if end <= start {
        return 0..0;
    }
    ifloor(start / step)..iceil(end / step)
}

fn check_domain(domain: [f64; 2]) -> Result<()> {
    if domain[0].is_finite() && domain[1].is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidDomain {
            start: domain[0],
            end: domain[1],
        })
    }
}

#[derive(Debug, Clone)]
pub struct BinFactory {
    bin_width: f64,
    bin_height: f64,
    allocation: BinAllocation,
    x_ids: Range<i64>,
    y_ids: Range<i64>,
    bins: BTreeMap<BinId, Bin>,
}

impl BinFactory {
    /// Grid over `x_domain x y_domain` with every cell allocated up front.
    pub fn new(x_domain: [f64; 2], y_domain: [f64; 2], bin_width: f64, bin_height: f64) -> Result<Self> {
        Self::with_allocation(x_domain, y_domain, bin_width, bin_height, BinAllocation::Eager)
    }

    pub fn with_allocation(
        x_domain: [f64; 2],
        y_domain: [f64; 2],
        bin_width: f64,
        bin_height: f64,
        allocation: BinAllocation,
    ) -> Result<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        if !valid(bin_width) || !valid(bin_height) {
            return Err(Error::InvalidBinSize {
                width: bin_width,
                height: bin_height,
            });
        }
        check_domain(x_domain)?;
        check_domain(y_domain)?;

        let mut factory = Self {
            bin_width,
            bin_height,
            allocation,
            x_ids: axis_ids(x_domain[0], x_domain[1], bin_width),
            y_ids: axis_ids(y_domain[0], y_domain[1], bin_height),
            bins: BTreeMap::new(),
        };
        if allocation == BinAllocation::Eager {
            factory.make_bins();
        }
        Ok(factory)
    }

    pub fn from_config(x_domain: [f64; 2], y_domain: [f64; 2], config: &BinningConfig) -> Result<Self> {
        Self::with_allocation(
            x_domain,
            y_domain,
            config.bin_width,
            config.bin_height,
            config.allocation,
        )
    }

    fn make_bins(&mut self) {
        for nx in self.x_ids.clone() {
            for ny in self.y_ids.clone() {
                let id = BinId::new(nx, ny);
                self.bins.insert(id, Bin::new(id, self.bin_width, self.bin_height));
            }
        }
    }

    pub fn bin_width(&self) -> f64 {
        self.bin_width
    }

    pub fn bin_height(&self) -> f64 {
        self.bin_height
    }

    pub fn bin_id(&self, x: f64, y: f64) -> BinId {
        BinId::new(ifloor(x / self.bin_width), ifloor(y / self.bin_height))
    }

    fn in_domain(&self, id: BinId) -> bool {
        self.x_ids.contains(&id.nx) && self.y_ids.contains(&id.ny)
    }

    /// Assign `points` to their cells, replacing the previous run's contents.
    pub fn bin_points(&mut self, points: &[SensationPoint]) -> Result<()> {
        self.bin_points_with_progress(points, |_, _| {})
    }

    /// Like [`bin_points`](Self::bin_points), reporting `(done, total)` after
    /// every point.
    pub fn bin_points_with_progress<F>(&mut self, points: &[SensationPoint], mut on_progress: F) -> Result<()>
    where
        F: FnMut(usize, usize),
    {
        self.reset();
        let total = points.len();

        for (i, p) in points.iter().enumerate() {
            let id = self.bin_id(p.x, p.y);
            let bin = match self.allocation {
                BinAllocation::Eager => self.bins.get_mut(&id),
                BinAllocation::Lazy if self.in_domain(id) => {
                    let (w, h) = (self.bin_width, self.bin_height);
                    Some(self.bins.entry(id).or_insert_with(|| Bin::new(id, w, h)))
                }
                BinAllocation::Lazy => None,
            };
            let Some(bin) = bin else {
                return Err(Error::BinNotFound {
                    nx: id.nx,
                    ny: id.ny,
                    x: p.x,
                    y: p.y,
                });
            };
            bin.points.push(*p);
            on_progress(i + 1, total);
        }
        debug!(points = total, bins = self.bins().len(), "points binned");
        Ok(())
    }

    fn reset(&mut self) {
        match self.allocation {
            BinAllocation::Eager => self.bins.values_mut().for_each(|b| b.points.clear()),
            BinAllocation::Lazy => self.bins.clear(),
        }
    }

    /// Non-empty bins, ordered by `(nx, ny)`.
    pub fn bins(&self) -> Vec<&Bin> {
        self.bins.values().filter(|b| !b.is_empty()).collect()
    }

    pub fn into_bins(self) -> Vec<Bin> {
        self.bins.into_values().filter(|b| !b.is_empty()).collect()
    }

    /// Number of cells currently allocated, empty or not.
    pub fn allocated(&self) -> usize {
        self.bins.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sensation;

    fn sp(x: f64, y: f64) -> SensationPoint {
        SensationPoint::new(x, y, Sensation::new(1, 1))
    }

    #[test]
    fn test_four_bins_over_square_domain() {
        let mut f = BinFactory::new([0.0, 20.0], [0.0, 20.0], 10.0, 10.0).unwrap();
        assert_eq!(f.allocated(), 4);
        let anchors: Vec<(f64, f64)> = f.bins.values().map(|b| (b.x, b.y)).collect();
        assert_eq!(anchors, vec![(0.0, 0.0), (0.0, 10.0), (10.0, 0.0), (10.0, 10.0)]);

        f.bin_points(&[sp(12.0, 3.0)]).unwrap();
        let bins = f.bins();
        assert_eq!(bins.len(), 1);
        assert_eq!((bins[0].x, bins[0].y), (10.0, 0.0));
        assert_eq!(bins[0].id(), BinId::new(1, 0));
    }

    #[test]
    fn test_only_non_empty_bins_are_returned() {
        let mut f = BinFactory::new([0.0, 30.0], [0.0, 30.0], 10.0, 10.0).unwrap();
        f.bin_points(&[sp(1.0, 1.0), sp(2.0, 2.0), sp(25.0, 25.0)]).unwrap();
        let bins = f.bins();
        assert_eq!(bins.len(), 2);
        assert_eq!(bins[0].len(), 2);
        assert_eq!(bins[1].id(), BinId::new(2, 2));
    }

    #[test]
    fn test_point_outside_domain_is_an_error() {
        let mut f = BinFactory::new([0.0, 20.0], [0.0, 20.0], 10.0, 10.0).unwrap();
        let err = f.bin_points(&[sp(5.0, 5.0), sp(25.0, 5.0)]).unwrap_err();
        assert!(matches!(err, Error::BinNotFound { nx: 2, ny: 0, .. }));
    }

    #[test]
    fn test_memberships_reset_per_run() {
        let mut f = BinFactory::new([0.0, 20.0], [0.0, 20.0], 10.0, 10.0).unwrap();
        f.bin_points(&[sp(1.0, 1.0)]).unwrap();
        f.bin_points(&[sp(15.0, 15.0)]).unwrap();
        let bins = f.bins();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].id(), BinId::new(1, 1));
    }

    #[test]
    fn test_progress_callback() {
        let mut f = BinFactory::new([0.0, 10.0], [0.0, 10.0], 1.0, 1.0).unwrap();
        let mut seen = Vec::new();
        f.bin_points_with_progress(&[sp(1.0, 1.0), sp(2.0, 2.0), sp(3.0, 3.0)], |done, total| {
            seen.push((done, total))
        })
        .unwrap();
        assert_eq!(seen, vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[test]
    fn test_lazy_allocation_matches_eager() {
        let points = [sp(0.5, 0.5), sp(19.9, 0.0), sp(12.0, 3.0), sp(12.5, 3.5)];
        let mut eager = BinFactory::new([0.0, 20.0], [0.0, 20.0], 10.0, 10.0).unwrap();
        let mut lazy =
            BinFactory::with_allocation([0.0, 20.0], [0.0, 20.0], 10.0, 10.0, BinAllocation::Lazy).unwrap();
        assert_eq!(lazy.allocated(), 0);

        eager.bin_points(&points).unwrap();
        lazy.bin_points(&points).unwrap();
        assert_eq!(eager.bins(), lazy.bins());
        assert_eq!(lazy.allocated(), 2);

        assert!(matches!(lazy.bin_points(&[sp(-1.0, 0.0)]), Err(Error::BinNotFound { .. })));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(matches!(
            BinFactory::new([0.0, 10.0], [0.0, 10.0], 0.0, 1.0),
            Err(Error::InvalidBinSize { .. })
        ));
        assert!(matches!(
            BinFactory::new([0.0, f64::INFINITY], [0.0, 10.0], 1.0, 1.0),
            Err(Error::InvalidDomain { .. })
        ));
    }

    #[test]
    fn test_domain_start_off_the_grid() {
        let mut f = BinFactory::new([-5.0, 5.0], [0.0, 10.0], 10.0, 10.0).unwrap();
        assert_eq!(f.allocated(), 2);
        f.bin_points(&[sp(3.0, 3.0), sp(-4.0, 3.0)]).unwrap();
        let ids: Vec<BinId> = f.bins().iter().map(|b| b.id()).collect();
        assert_eq!(ids, vec![BinId::new(-1, 0), BinId::new(0, 0)]);

        let mut lazy =
            BinFactory::with_allocation([-5.0, 5.0], [0.0, 10.0], 10.0, 10.0, BinAllocation::Lazy).unwrap();
        lazy.bin_points(&[sp(3.0, 3.0)]).unwrap();
        assert_eq!(lazy.allocated(), 1);
        assert!(lazy.bin_points(&[sp(12.0, 3.0)]).is_err());
    }

    #[test]
    fn test_huge_domain_start_terminates() {
        let f = BinFactory::with_allocation([1e18, 1e18 + 1024.0], [0.0, 1.0], 1.0, 1.0, BinAllocation::Lazy)
            .unwrap();
        assert_eq!(f.allocated(), 0);
        assert!(f.in_domain(f.bin_id(1e18, 0.5)));
    }

    #[test]
    fn test_empty_domain_has_no_bins() {
        let mut f = BinFactory::new([5.0, 5.0], [0.0, 10.0], 1.0, 1.0).unwrap();
        assert_eq!(f.allocated(), 0);
        assert!(f.bin_points(&[sp(5.0, 1.0)]).is_err());
    }

    #[test]
    fn test_unaligned_bins_anchor_on_grid() {
        let mut f = BinFactory::new([0.0, 10.0], [0.0, 10.0], 3.0, 4.0).unwrap();
        f.bin_points(&[sp(7.0, 9.5)]).unwrap();
        let bin = f.bins()[0];
        assert_eq!((bin.x, bin.y), (6.0, 8.0));
    }
}
