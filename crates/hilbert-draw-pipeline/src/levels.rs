//! Image decoding and intensity-to-level remapping.
//!
//! Accepts raw image bytes (PNG, JPEG, BMP, WebP), reduces them to a
//! per-pixel "ink" amount, and rescales ink logarithmically into curve
//! levels. The resulting [`LevelGrid`] is the data behind the grid-backed
//! density fields.
//!
//! The remap is
//!
//! ```text
//! level = log_b( ink / ink_max * (b^max - b^min) + b^min )
//! ```
//!
//! with `b =` [`LEVEL_BASE`], so blank pixels sit at `min_level`, the
//! darkest pixel at `max_level`, and mid tones are pushed towards the top
//! of the range.

use std::ops::Range;

use image::GrayAlphaImage;

use crate::types::{CurveError, Dimensions, Region};

/// Logarithm base of the intensity remap.
pub const LEVEL_BASE: f64 = 2.5;

/// A row-major grid of non-negative level values, one per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelGrid {
    width: u32,
    height: u32,
    values: Vec<f64>,
}

/// Half-open column and row ranges of the cells a region covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    /// Covered columns.
    pub columns: Range<u32>,
    /// Covered rows.
    pub rows: Range<u32>,
}

impl CellRange {
    /// Returns `true` when the region covers no cell.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    /// Number of covered cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len() * self.rows.len()
    }
}

impl LevelGrid {
    /// Wrap a row-major value buffer.
    ///
    /// # Errors
    ///
    /// Returns [`CurveError::InvalidConfig`] if `values.len()` is not
    /// `width * height`.
    pub fn new(width: u32, height: u32, values: Vec<f64>) -> Result<Self, CurveError> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(CurveError::InvalidConfig(format!(
                "level grid {width}x{height} needs {expected} values, got {}",
                values.len(),
            )));
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Build a grid by evaluating `f(x, y)` for every cell.
    #[must_use]
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f64) -> Self {
        let values = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| f(x, y))
            .collect();
        Self {
            width,
            height,
            values,
        }
    }

    /// Grid size in cells.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// Value at `(x, y)`, or `None` outside the grid.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<f64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// The cells touched by `region`, clamped to the grid.
    ///
    /// A cell is covered when the region overlaps any part of it, so a
    /// sub-pixel region still sees the pixel beneath it. Regions that lie
    /// outside the grid, have non-positive extent, or carry non-finite
    /// coordinates cover nothing.
    #[must_use]
    pub fn cells_in(&self, region: &Region) -> CellRange {
        CellRange {
            columns: span(region.position.x, region.width, self.width),
            rows: span(region.position.y, region.height, self.height),
        }
    }

    /// Iterate over the values of the cells covered by `region`.
    pub fn values_in(&self, region: &Region) -> impl Iterator<Item = f64> + '_ {
        let CellRange { columns, rows } = self.cells_in(region);
        let width = self.width as usize;
        rows.flat_map(move |y| {
            let start = y as usize * width;
            let cols = columns.start as usize..columns.end as usize;
            self.values[start + cols.start..start + cols.end]
                .iter()
                .copied()
        })
    }
}

/// Clamp the interval `[start, start + extent)` to whole cells in
/// `0..limit`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn span(start: f64, extent: f64, limit: u32) -> Range<u32> {
    if !(start.is_finite() && extent.is_finite()) || extent <= 0.0 {
        return 0..0;
    }
    let lo = start.floor().max(0.0);
    let hi = (start + extent).ceil().min(f64::from(limit));
    if hi <= lo {
        return 0..0;
    }
    // Both bounds are integral and within 0..=limit here.
    (lo as u32)..(hi as u32)
}

/// Decode raw image bytes into luma + alpha.
///
/// # Errors
///
/// Returns [`CurveError::EmptyInput`] if `bytes` is empty.
/// Returns [`CurveError::ImageDecode`] if the image format is
/// unrecognized or the data is corrupt.
#[must_use = "returns the decoded image"]
pub fn decode_and_grayscale(bytes: &[u8]) -> Result<GrayAlphaImage, CurveError> {
    if bytes.is_empty() {
        return Err(CurveError::EmptyInput);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(img.to_luma_alpha8())
}

/// Amount of ink a pixel carries, `0..=255`.
///
/// Fully transparent pixels carry none. Otherwise dark pixels carry the
/// most ink, or bright ones when `invert` is set.
#[must_use]
pub fn ink(luma: u8, alpha: u8, invert: bool) -> u8 {
    if alpha == 0 {
        0
    } else if invert {
        luma
    } else {
        255 - luma
    }
}

/// Remap ink amounts to levels in `[min_level, max_level]`.
///
/// `ink` is row-major with `width * height` entries; missing entries are
/// treated as blank. An all-blank image maps every cell to `min_level`.
/// Output is finite for `max_level` up to
/// [`CurveConfig::MAX_LEVEL_LIMIT`](crate::CurveConfig::MAX_LEVEL_LIMIT).
#[must_use]
pub fn intensity_to_levels(
    width: u32,
    height: u32,
    ink: &[u8],
    min_level: u32,
    max_level: u32,
) -> LevelGrid {
    let ink_max = ink.iter().copied().max().filter(|&m| m > 0).unwrap_or(1);
    let low = LEVEL_BASE.powf(f64::from(min_level));
    let high = LEVEL_BASE.powf(f64::from(max_level));
    let ln_base = LEVEL_BASE.ln();

    LevelGrid::from_fn(width, height, |x, y| {
        let amount = ink
            .get(y as usize * width as usize + x as usize)
            .copied()
            .unwrap_or(0);
        let t = f64::from(amount) / f64::from(ink_max);
        t.mul_add(high - low, low).ln() / ln_base
    })
}

/// Decode an image and remap it into a level grid in one step.
///
/// # Errors
///
/// Propagates [`decode_and_grayscale`] errors.
pub fn image_to_levels(
    bytes: &[u8],
    min_level: u32,
    max_level: u32,
    invert: bool,
) -> Result<LevelGrid, CurveError> {
    let gray = decode_and_grayscale(bytes)?;
    let ink: Vec<u8> = gray
        .pixels()
        .map(|p| ink(p.0[0], p.0[1], invert))
        .collect();
    Ok(intensity_to_levels(
        gray.width(),
        gray.height(),
        &ink,
        min_level,
        max_level,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn encode_png(img: &image::RgbaImage) -> Vec<u8> {
        let mut buf = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut buf);
        image::ImageEncoder::write_image(
            encoder,
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
        buf
    }

    // --- LevelGrid tests ---

    #[test]
    fn new_rejects_wrong_length() {
        assert!(LevelGrid::new(2, 2, vec![0.0; 3]).is_err());
        assert!(LevelGrid::new(2, 2, vec![0.0; 4]).is_ok());
    }

    #[test]
    fn from_fn_is_row_major() {
        let grid = LevelGrid::from_fn(3, 2, |x, y| f64::from(10 * y + x));
        assert_eq!(grid.get(2, 0), Some(2.0));
        assert_eq!(grid.get(0, 1), Some(10.0));
        assert_eq!(grid.get(3, 0), None);
        assert_eq!(grid.get(0, 2), None);
    }

    #[test]
    fn cells_in_whole_pixels() {
        let grid = LevelGrid::from_fn(8, 8, |_, _| 0.0);
        let cells = grid.cells_in(&Region::new(2.0, 4.0, 2.0, 4.0));
        assert_eq!(cells.columns, 2..4);
        assert_eq!(cells.rows, 4..8);
        assert_eq!(cells.len(), 8);
    }

    #[test]
    fn cells_in_clamps_to_grid() {
        let grid = LevelGrid::from_fn(4, 4, |_, _| 0.0);
        let cells = grid.cells_in(&Region::new(-2.0, 3.0, 4.0, 10.0));
        assert_eq!(cells.columns, 0..2);
        assert_eq!(cells.rows, 3..4);
    }

    #[test]
    fn cells_in_subpixel_region_sees_one_pixel() {
        let grid = LevelGrid::from_fn(4, 4, |_, _| 0.0);
        let cells = grid.cells_in(&Region::new(1.25, 1.5, 0.25, 0.25));
        assert_eq!(cells.columns, 1..2);
        assert_eq!(cells.rows, 1..2);
    }

    #[test]
    fn cells_in_outside_or_degenerate_is_empty() {
        let grid = LevelGrid::from_fn(4, 4, |_, _| 0.0);
        assert!(grid.cells_in(&Region::new(10.0, 0.0, 2.0, 2.0)).is_empty());
        assert!(grid.cells_in(&Region::new(-5.0, 0.0, 2.0, 2.0)).is_empty());
        assert!(grid.cells_in(&Region::new(0.0, 0.0, 0.0, 2.0)).is_empty());
        assert!(grid.cells_in(&Region::new(f64::NAN, 0.0, 1.0, 1.0)).is_empty());
    }

    #[test]
    fn values_in_visits_covered_cells() {
        let grid = LevelGrid::from_fn(4, 4, |x, y| f64::from(4 * y + x));
        let mut values: Vec<f64> = grid.values_in(&Region::new(1.0, 2.0, 2.0, 2.0)).collect();
        values.sort_by(f64::total_cmp);
        assert_eq!(values, vec![9.0, 10.0, 13.0, 14.0]);
    }

    // --- Remap tests ---

    #[test]
    fn ink_respects_alpha_and_invert() {
        assert_eq!(ink(0, 0, false), 0);
        assert_eq!(ink(0, 255, false), 255);
        assert_eq!(ink(200, 255, false), 55);
        assert_eq!(ink(200, 255, true), 200);
    }

    #[test]
    fn remap_hits_range_endpoints() {
        let grid = intensity_to_levels(3, 1, &[0, 128, 255], 1, 6);
        assert!((grid.get(0, 0).unwrap() - 1.0).abs() < 1e-9);
        assert!((grid.get(2, 0).unwrap() - 6.0).abs() < 1e-9);
        let mid = grid.get(1, 0).unwrap();
        // Logarithmic: half ink lands well above the midpoint.
        assert!(mid > 3.5 && mid < 6.0, "mid level {mid}");
    }

    #[test]
    fn remap_blank_image_is_min_level() {
        let grid = intensity_to_levels(2, 2, &[0; 4], 2, 5);
        for y in 0..2 {
            for x in 0..2 {
                assert!((grid.get(x, y).unwrap() - 2.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn remap_stays_finite_at_level_limit() {
        let limit = crate::types::CurveConfig::MAX_LEVEL_LIMIT;
        let grid = intensity_to_levels(3, 1, &[0, 1, 255], 0, limit);
        for x in 0..3 {
            let level = grid.get(x, 0).unwrap();
            assert!(level.is_finite() && level >= 0.0, "cell {x}: {level}");
        }
        assert!(grid.get(0, 0).unwrap().abs() < 1e-9);
        assert!((grid.get(2, 0).unwrap() - f64::from(limit)).abs() < 1e-9);
    }

    #[test]
    fn remap_is_monotone() {
        let ink: Vec<u8> = (0..=255).collect();
        let grid = intensity_to_levels(256, 1, &ink, 0, 7);
        for x in 1..256 {
            assert!(grid.get(x, 0).unwrap() > grid.get(x - 1, 0).unwrap());
        }
    }

    // --- Decoding tests ---

    #[test]
    fn empty_input_returns_error() {
        let result = decode_and_grayscale(&[]);
        assert!(matches!(result, Err(CurveError::EmptyInput)));
    }

    #[test]
    fn corrupt_bytes_returns_image_decode_error() {
        let result = decode_and_grayscale(&[0xFF, 0xFE, 0x00, 0x01]);
        assert!(matches!(result, Err(CurveError::ImageDecode(_))));
    }

    #[test]
    fn image_to_levels_maps_black_to_max() {
        let img = image::RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        let grid = image_to_levels(&encode_png(&img), 0, 5, false).unwrap();
        assert_eq!(
            grid.dimensions(),
            Dimensions {
                width: 2,
                height: 1
            }
        );
        assert!((grid.get(0, 0).unwrap() - 5.0).abs() < 1e-9);
        assert!(grid.get(1, 0).unwrap().abs() < 1e-9);
    }
}
