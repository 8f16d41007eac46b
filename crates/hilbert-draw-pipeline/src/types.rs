//! Shared types for the hilbert-draw pipeline.

use serde::{Deserialize, Serialize};

use crate::density::DensityStrategy;
use crate::symmetry::SymmetryElement;

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal position (pixels from left edge).
    pub x: f64,
    /// Vertical position (pixels from top edge).
    pub y: f64,
}

impl Point {
    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }
}

/// A sequence of connected points forming a path.
///
/// For curve output the order is the curve itself: consecutive points are
/// joined by a straight segment and duplicates are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns the first point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&Point> {
        self.0.first()
    }

    /// Returns the last point, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Point> {
        self.0.last()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Consumes the polyline and returns the underlying vector of points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point> {
        self.0
    }

    /// Total length of all segments.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

impl FromIterator<Point> for Polyline {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// An axis-aligned rectangle: anchor corner plus extents.
///
/// The anchor is the corner with the smallest coordinates. A region is
/// what every quadtree node covers and what a [`DensityField`] is asked
/// about.
///
/// [`DensityField`]: crate::density::DensityField
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Anchor corner.
    pub position: Point,
    /// Horizontal extent.
    pub width: f64,
    /// Vertical extent.
    pub height: f64,
}

impl Region {
    /// Create a region anchored at `(x, y)`.
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            position: Point::new(x, y),
            width,
            height,
        }
    }

    /// Region covering a whole image, anchored at the origin.
    #[must_use]
    pub fn from_dimensions(dimensions: Dimensions) -> Self {
        Self::new(
            0.0,
            0.0,
            f64::from(dimensions.width),
            f64::from(dimensions.height),
        )
    }

    /// Area of the region.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Check that the region can be subdivided: finite anchor and
    /// strictly positive, finite extents.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError::InvalidConfig`] describing the first violation.
    pub fn validate(&self) -> Result<(), CurveError> {
        if !(self.position.x.is_finite() && self.position.y.is_finite()) {
            return Err(CurveError::InvalidConfig(format!(
                "root position must be finite, got ({}, {})",
                self.position.x, self.position.y,
            )));
        }
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(CurveError::InvalidConfig(format!(
                "root width must be positive and finite, got {}",
                self.width,
            )));
        }
        if !(self.height.is_finite() && self.height > 0.0) {
            return Err(CurveError::InvalidConfig(format!(
                "root height must be positive and finite, got {}",
                self.height,
            )));
        }
        Ok(())
    }

    /// Whether `self` and `other` touch along an edge of positive length.
    ///
    /// Corner contact and overlap do not count. `tolerance` absorbs
    /// floating-point error in the shared coordinate.
    #[cfg(test)]
    pub(crate) fn shares_edge(&self, other: &Self, tolerance: f64) -> bool {
        let (ax0, ay0) = (self.position.x, self.position.y);
        let (ax1, ay1) = (ax0 + self.width, ay0 + self.height);
        let (bx0, by0) = (other.position.x, other.position.y);
        let (bx1, by1) = (bx0 + other.width, by0 + other.height);

        let x_overlap = ax1.min(bx1) - ax0.max(bx0);
        let y_overlap = ay1.min(by1) - ay0.max(by0);

        let vertical_contact = ((ax1 - bx0).abs() <= tolerance
            || (bx1 - ax0).abs() <= tolerance)
            && y_overlap > tolerance;
        let horizontal_contact = ((ay1 - by0).abs() <= tolerance
            || (by1 - ay0).abs() <= tolerance)
            && x_overlap > tolerance;

        vertical_contact || horizontal_contact
    }
}

/// Configuration for curve generation.
///
/// # Level range
///
/// `min_level` and `max_level` bound the logarithmic intensity remap that
/// turns pixels into levels. `max_level` is additionally the hard cap on
/// quadtree depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Hard cap on subdivision depth. `0` produces a single point.
    pub max_level: u32,

    /// Level assigned to pixels carrying no ink.
    pub min_level: u32,

    /// How a region's required depth is derived from the level grid.
    pub density: DensityStrategy,

    /// Orientation of the root square.
    pub root_symmetry: SymmetryElement,

    /// Seed for strategies that draw random numbers at construction.
    pub seed: u64,

    /// Treat bright pixels as ink instead of dark ones.
    pub invert: bool,
}

impl CurveConfig {
    /// Default subdivision cap.
    pub const DEFAULT_MAX_LEVEL: u32 = 7;
    /// Default level for blank pixels.
    pub const DEFAULT_MIN_LEVEL: u32 = 0;
    /// Default random seed.
    pub const DEFAULT_SEED: u64 = 0;
    /// Default density strategy.
    pub const DEFAULT_DENSITY: DensityStrategy = DensityStrategy::Max;
    /// Largest accepted `max_level`.
    ///
    /// Keeps `2.5^max_level` finite in the level remap and the worst-case
    /// node count within memory.
    pub const MAX_LEVEL_LIMIT: u32 = 16;

    /// Check cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError::InvalidConfig`] if `max_level` exceeds
    /// [`Self::MAX_LEVEL_LIMIT`] or `min_level > max_level`.
    pub fn validate(&self) -> Result<(), CurveError> {
        if self.max_level > Self::MAX_LEVEL_LIMIT {
            return Err(CurveError::InvalidConfig(format!(
                "max_level ({}) must not exceed {}",
                self.max_level,
                Self::MAX_LEVEL_LIMIT,
            )));
        }
        if self.min_level > self.max_level {
            return Err(CurveError::InvalidConfig(format!(
                "min_level ({}) must not exceed max_level ({})",
                self.min_level, self.max_level,
            )));
        }
        Ok(())
    }
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            max_level: Self::DEFAULT_MAX_LEVEL,
            min_level: Self::DEFAULT_MIN_LEVEL,
            density: Self::DEFAULT_DENSITY,
            root_symmetry: SymmetryElement::IDENTITY,
            seed: Self::DEFAULT_SEED,
            invert: false,
        }
    }
}

/// Result of running the full image-to-curve pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveResult {
    /// Leaf anchors in curve order.
    pub polyline: Polyline,

    /// Dimensions of the source image in pixels.
    ///
    /// Export serializers use this to set coordinate spaces
    /// (e.g., SVG `viewBox`).
    pub dimensions: Dimensions,
}

/// Errors that can occur during curve generation.
#[derive(Debug, thiserror::Error)]
pub enum CurveError {
    /// Failed to decode the input image.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The input image bytes were empty.
    #[error("input image data is empty")]
    EmptyInput,

    /// Configuration or root region is invalid.
    #[error("invalid curve configuration: {0}")]
    InvalidConfig(String),
}
