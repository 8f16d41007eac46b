//! Density fields: how deep should the curve go inside a region?
//!
//! This module defines the [`DensityField`] trait consulted once per
//! quadtree node and the [`DensityStrategy`] enum for selecting a
//! grid-backed implementation at runtime.
//!
//! # Contract
//!
//! - The returned value is the level the region asks to be subdivided
//!   to. The tree clamps negative and NaN values to `0.0`.
//! - Grid-backed fields only read cells returned by
//!   [`LevelGrid::cells_in`]; a region that covers no cell evaluates to
//!   [`EMPTY_REGION_LEVEL`].
//! - Aggregation never depends on cell visiting order.
//! - Randomized fields draw all their randomness at construction, so
//!   repeated queries are deterministic.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::levels::LevelGrid;
use crate::types::{Point, Region};

/// Level reported for a region that covers no grid cell.
pub const EMPTY_REGION_LEVEL: f64 = 0.0;

/// Share of cells a level must exceed to count as a majority.
pub const MAJORITY_THRESHOLD: f64 = 0.99;

/// Number of disks in a [`CircleField`].
pub const CIRCLE_COUNT: usize = 15;

/// Span of levels below `max_level` that circle levels are drawn from.
pub const CIRCLE_LEVEL_SPREAD: f64 = 3.0;

/// Samples per axis when a [`CircleField`] samples a region.
pub const CIRCLE_SAMPLES_PER_AXIS: u32 = 5;

/// Maps a region to the subdivision level it warrants.
pub trait DensityField {
    /// Required level for `region`.
    fn evaluate(&self, region: &Region) -> f64;
}

impl<F> DensityField for F
where
    F: Fn(&Region) -> f64,
{
    fn evaluate(&self, region: &Region) -> f64 {
        self(region)
    }
}

/// Selects which grid-backed density field to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DensityStrategy {
    /// Highest level of any covered pixel. Fine detail wins.
    #[default]
    Max,

    /// Mean level of the covered pixels.
    Average,

    /// The dominant quantized level, if it covers more than
    /// [`MAJORITY_THRESHOLD`] of the region. Mixed regions keep
    /// subdividing.
    Majority,

    /// Ignores the image: [`CIRCLE_COUNT`] random disks near the top of
    /// the level range, seeded from the config.
    Circles,
}

impl DensityStrategy {
    /// Stable lowercase name, used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Max => "max",
            Self::Average => "average",
            Self::Majority => "majority",
            Self::Circles => "circles",
        }
    }

    /// Build the field this strategy names over `grid`.
    ///
    /// `max_level` is the tree's depth cap; `seed` feeds the random
    /// circle placement.
    #[must_use]
    pub fn field<'a>(
        self,
        grid: &'a LevelGrid,
        max_level: u32,
        seed: u64,
    ) -> Box<dyn DensityField + 'a> {
        match self {
            Self::Max => Box::new(MaxField::new(grid)),
            Self::Average => Box::new(AverageField::new(grid)),
            Self::Majority => Box::new(MajorityField::new(grid, max_level)),
            Self::Circles => {
                let dims = grid.dimensions();
                let extent = Region::new(0.0, 0.0, f64::from(dims.width), f64::from(dims.height));
                let mut rng = StdRng::seed_from_u64(seed);
                Box::new(CircleField::random(&extent, max_level, &mut rng))
            }
        }
    }
}

/// The same level everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantField(pub f64);

impl DensityField for ConstantField {
    fn evaluate(&self, _region: &Region) -> f64 {
        self.0
    }
}

/// Maximum level among the covered cells, floored at zero.
#[derive(Debug, Clone, Copy)]
pub struct MaxField<'a> {
    grid: &'a LevelGrid,
}

impl<'a> MaxField<'a> {
    /// Create a max field over `grid`.
    #[must_use]
    pub const fn new(grid: &'a LevelGrid) -> Self {
        Self { grid }
    }
}

impl DensityField for MaxField<'_> {
    fn evaluate(&self, region: &Region) -> f64 {
        self.grid
            .values_in(region)
            .fold(EMPTY_REGION_LEVEL, f64::max)
    }
}

/// Mean level of the covered cells.
#[derive(Debug, Clone, Copy)]
pub struct AverageField<'a> {
    grid: &'a LevelGrid,
}

impl<'a> AverageField<'a> {
    /// Create an average field over `grid`.
    #[must_use]
    pub const fn new(grid: &'a LevelGrid) -> Self {
        Self { grid }
    }
}

impl DensityField for AverageField<'_> {
    #[allow(clippy::cast_precision_loss)]
    fn evaluate(&self, region: &Region) -> f64 {
        let (sum, count) = self
            .grid
            .values_in(region)
            .fold((0.0, 0_usize), |(sum, count), v| (sum + v, count + 1));
        if count == 0 {
            EMPTY_REGION_LEVEL
        } else {
            sum / count as f64
        }
    }
}

/// Majority vote over quantized cell levels.
///
/// Each cell is quantized to `floor(v)` clamped into `0..=max_level`. If
/// one level's count exceeds [`MAJORITY_THRESHOLD`] of the covered cells
/// that level is returned (the higher level on ties). Otherwise the field
/// returns `max_level + 1`, which always asks for further subdivision.
#[derive(Debug, Clone, Copy)]
pub struct MajorityField<'a> {
    grid: &'a LevelGrid,
    max_level: u32,
}

impl<'a> MajorityField<'a> {
    /// Create a majority field over `grid` for a tree capped at `max_level`.
    #[must_use]
    pub const fn new(grid: &'a LevelGrid, max_level: u32) -> Self {
        Self { grid, max_level }
    }

    /// Value reported when no level dominates.
    #[must_use]
    pub fn unsettled_level(&self) -> f64 {
        f64::from(self.max_level) + 1.0
    }
}

impl DensityField for MajorityField<'_> {
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn evaluate(&self, region: &Region) -> f64 {
        let bins = self.max_level as usize + 1;
        let mut frequency = vec![0_usize; bins];
        let mut total = 0_usize;
        for v in self.grid.values_in(region) {
            // NaN saturates to 0 through the cast.
            let level = (v.max(0.0).floor() as usize).min(bins - 1);
            frequency[level] += 1;
            total += 1;
        }
        if total == 0 {
            return EMPTY_REGION_LEVEL;
        }

        let floor = total as f64 * MAJORITY_THRESHOLD;
        let (level, count) = frequency
            .iter()
            .copied()
            .enumerate()
            .max_by_key(|&(level, count)| (count, level))
            .unwrap_or((0, 0));

        if count as f64 > floor {
            level as f64
        } else {
            self.unsettled_level()
        }
    }
}

/// A disk carrying a fixed level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Circle {
    /// Disk centre.
    pub center: Point,
    /// Disk radius.
    pub radius: f64,
    /// Level reported for points strictly inside.
    pub level: f64,
}

/// Highest level of any disk containing one of a lattice of sample points.
///
/// A region is sampled on a [`CIRCLE_SAMPLES_PER_AXIS`]² lattice starting
/// at its anchor with steps of `width / n` and `height / n`. Points
/// outside every disk contribute `0.0`.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleField {
    circles: Vec<Circle>,
}

impl CircleField {
    /// Use an explicit set of disks.
    #[must_use]
    pub const fn new(circles: Vec<Circle>) -> Self {
        Self { circles }
    }

    /// Scatter [`CIRCLE_COUNT`] disks over `extent`.
    ///
    /// Radii are uniform in `[0, diagonal / 3)`, centres uniform over the
    /// extent, and levels uniform in `[max_level - 3, max_level)` clamped
    /// at zero.
    pub fn random<R: Rng>(extent: &Region, max_level: u32, rng: &mut R) -> Self {
        let max_radius = extent.width.hypot(extent.height) / 3.0;
        let top = f64::from(max_level);
        let circles = (0..CIRCLE_COUNT)
            .map(|_| {
                let radius = rng.random::<f64>() * max_radius;
                let center = Point::new(
                    rng.random::<f64>().mul_add(extent.width, extent.position.x),
                    rng.random::<f64>().mul_add(extent.height, extent.position.y),
                );
                let level = rng
                    .random::<f64>()
                    .mul_add(CIRCLE_LEVEL_SPREAD, top - CIRCLE_LEVEL_SPREAD)
                    .max(0.0);
                Circle {
                    center,
                    radius,
                    level,
                }
            })
            .collect();
        Self { circles }
    }

    /// The disks, in construction order.
    #[must_use]
    pub fn circles(&self) -> &[Circle] {
        &self.circles
    }

    /// Highest level of a disk strictly containing `p`, or `0.0`.
    #[must_use]
    pub fn level_at(&self, p: Point) -> f64 {
        self.circles
            .iter()
            .filter(|c| c.center.distance(p) < c.radius)
            .map(|c| c.level)
            .fold(0.0, f64::max)
    }
}

impl DensityField for CircleField {
    fn evaluate(&self, region: &Region) -> f64 {
        let n = f64::from(CIRCLE_SAMPLES_PER_AXIS);
        let dx = region.width / n;
        let dy = region.height / n;
        let mut result = 0.0_f64;
        for i in 0..CIRCLE_SAMPLES_PER_AXIS {
            for j in 0..CIRCLE_SAMPLES_PER_AXIS {
                let p = Point::new(
                    f64::from(i).mul_add(dx, region.position.x),
                    f64::from(j).mul_add(dy, region.position.y),
                );
                result = result.max(self.level_at(p));
            }
        }
        result
    }
}
