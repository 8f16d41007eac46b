//! hilbert-draw-pipeline: Adaptive pseudo-Hilbert curves (sans-IO).
//!
//! Turns a raster image into a single polyline that visits every leaf of
//! an adaptive quadtree in Hilbert order: dark regions get a fine curve,
//! light regions a coarse one.
//!
//! image -> ink levels -> density field -> quadtree -> leaf anchors
//!
//! This crate has **no I/O dependencies**. It operates on in-memory byte
//! slices and returns structured data. Files, SVG and the command line
//! live in `hilbert-draw-export` and `hilbert-draw`.

pub mod density;
pub mod diagnostics;
pub mod levels;
pub mod symmetry;
pub mod traversal;
pub mod tree;
pub mod types;

pub use density::{DensityField, DensityStrategy};
pub use diagnostics::{Clock, CurveDiagnostics};
pub use levels::LevelGrid;
pub use symmetry::SymmetryElement;
pub use traversal::count_jumps;
pub use tree::{QuadNode, QuadTree};
pub use types::{CurveConfig, CurveError, CurveResult, Dimensions, Point, Polyline, Region};

use diagnostics::{CurveSummary, StageDiagnostics, StageMetrics};

/// Build the quadtree for an already remapped level grid.
///
/// The root covers the whole grid and is oriented by
/// `config.root_symmetry`. The density field is chosen by
/// `config.density`.
///
/// # Errors
///
/// Returns [`CurveError::InvalidConfig`] if the configuration is
/// inconsistent or the grid has a zero extent.
pub fn generate(grid: &LevelGrid, config: &CurveConfig) -> Result<QuadTree, CurveError> {
    config.validate()?;
    let field = config.density.field(grid, config.max_level, config.seed);
    build_tree(&*field, grid.dimensions(), config)
}

fn build_tree(
    field: &dyn DensityField,
    dimensions: Dimensions,
    config: &CurveConfig,
) -> Result<QuadTree, CurveError> {
    QuadTree::build(
        Region::from_dimensions(dimensions),
        config.root_symmetry,
        config.max_level,
        field,
    )
}

/// Run the full image-to-curve pipeline.
///
/// Takes raw image bytes (PNG, JPEG, BMP, WebP) and a configuration, and
/// produces a [`CurveResult`] holding the curve and the source image
/// dimensions.
///
/// # Pipeline steps
///
/// 1. Decode image, reduce to ink, remap logarithmically to levels
/// 2. Build the density field (pluggable strategy)
/// 3. Build the adaptive quadtree
/// 4. Collect leaf anchors in curve order
///
/// # Errors
///
/// Returns [`CurveError::InvalidConfig`] if `min_level > max_level`.
/// Returns [`CurveError::EmptyInput`] if `image_bytes` is empty.
/// Returns [`CurveError::ImageDecode`] if the image format is unrecognized.
pub fn process(image_bytes: &[u8], config: &CurveConfig) -> Result<CurveResult, CurveError> {
    config.validate()?;

    let grid = levels::image_to_levels(
        image_bytes,
        config.min_level,
        config.max_level,
        config.invert,
    )?;
    let tree = generate(&grid, config)?;

    Ok(CurveResult {
        polyline: tree.points(),
        dimensions: grid.dimensions(),
    })
}

/// Like [`process`], but also times each stage and summarizes the tree.
///
/// # Errors
///
/// Same as [`process`].
pub fn process_with_diagnostics<C: Clock>(
    image_bytes: &[u8],
    config: &CurveConfig,
    clock: &C,
) -> Result<(CurveResult, CurveDiagnostics), CurveError> {
    config.validate()?;
    let run_start = clock.now();

    let start = clock.now();
    let grid = levels::image_to_levels(
        image_bytes,
        config.min_level,
        config.max_level,
        config.invert,
    )?;
    let dimensions = grid.dimensions();
    let levels = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Levels {
            input_bytes: image_bytes.len(),
            width: dimensions.width,
            height: dimensions.height,
            min_level: config.min_level,
            max_level: config.max_level,
        },
    };

    let start = clock.now();
    let density = config.density.field(&grid, config.max_level, config.seed);
    let field = StageDiagnostics {
        duration: clock.elapsed(&start),
        metrics: StageMetrics::Field {
            strategy: config.density,
        },
    };

    let start = clock.now();
    let tree = build_tree(&*density, dimensions, config)?;
    let build_duration = clock.elapsed(&start);

    let start = clock.now();
    let polyline = tree.points();
    let traversal_duration = clock.elapsed(&start);

    let total_duration = clock.elapsed(&run_start);

    let summary = CurveSummary::from_tree(&tree, dimensions.width, dimensions.height);
    let build = StageDiagnostics {
        duration: build_duration,
        metrics: StageMetrics::Build {
            node_count: summary.node_count,
            leaf_count: summary.leaf_count,
            max_depth: summary.max_depth,
        },
    };
    let traversal = StageDiagnostics {
        duration: traversal_duration,
        metrics: StageMetrics::Traversal {
            point_count: polyline.len(),
            jump_count: summary.jump_count,
            path_length: polyline.length(),
        },
    };

    tracing::debug!(
        points = polyline.len(),
        jumps = summary.jump_count,
        strategy = config.density.name(),
        "curve generated"
    );

    let diagnostics = CurveDiagnostics {
        levels,
        field,
        build,
        traversal,
        total_duration,
        summary,
    };
    Ok((
        CurveResult {
            polyline,
            dimensions,
        },
        diagnostics,
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::*;

    /// Encode an RGBA image as PNG.
    fn png(width: u32, height: u32, pixel: impl Fn(u32, u32) -> [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_fn(width, height, |x, y| image::Rgba(pixel(x, y)));
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

    /// Advances one millisecond every time it is read.
    struct TickClock {
        ticks: Cell<u64>,
    }

    impl Clock for TickClock {
        type Instant = u64;

        fn now(&self) -> u64 {
            let t = self.ticks.get();
            self.ticks.set(t + 1);
            t
        }

        fn elapsed(&self, since: &u64) -> Duration {
            Duration::from_millis(self.ticks.get() - since)
        }
    }

    fn config(max_level: u32) -> CurveConfig {
        CurveConfig {
            max_level,
            ..CurveConfig::default()
        }
    }

    #[test]
    fn process_empty_input() {
        let result = process(&[], &CurveConfig::default());
        assert!(matches!(result, Err(CurveError::EmptyInput)));
    }

    #[test]
    fn process_corrupt_input() {
        let result = process(&[0xFF, 0x00], &CurveConfig::default());
        assert!(matches!(result, Err(CurveError::ImageDecode(_))));
    }

    #[test]
    fn process_rejects_inverted_level_range() {
        let config = CurveConfig {
            min_level: 5,
            max_level: 3,
            ..CurveConfig::default()
        };
        let result = process(&png(4, 4, |_, _| [0, 0, 0, 255]), &config);
        assert!(matches!(result, Err(CurveError::InvalidConfig(_))));
    }

    #[test]
    fn black_image_reaches_full_depth() {
        let result = process(&png(4, 4, |_, _| [0, 0, 0, 255]), &config(2)).unwrap();
        assert_eq!(result.dimensions, Dimensions { width: 4, height: 4 });
        assert_eq!(result.polyline.len(), 16);
        assert_eq!(result.polyline.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(result.polyline.last(), Some(&Point::new(3.0, 0.0)));
    }

    #[test]
    fn white_image_is_a_single_point() {
        let result = process(&png(4, 4, |_, _| [255, 255, 255, 255]), &config(2)).unwrap();
        assert_eq!(result.polyline.points(), &[Point::new(0.0, 0.0)]);
    }

    #[test]
    fn invert_swaps_light_and_dark() {
        let config = CurveConfig {
            invert: true,
            ..config(2)
        };
        let result = process(&png(4, 4, |_, _| [255, 255, 255, 255]), &config).unwrap();
        assert_eq!(result.polyline.len(), 16);
    }

    #[test]
    fn transparent_pixels_carry_no_ink() {
        let result = process(&png(4, 4, |_, _| [0, 0, 0, 0]), &config(2)).unwrap();
        assert_eq!(result.polyline.len(), 1);
    }

    #[test]
    fn dark_quadrant_is_refined() {
        // Only the top-left 4x4 block is black.
        let bytes = png(8, 8, |x, y| {
            if x < 4 && y < 4 {
                [0, 0, 0, 255]
            } else {
                [255, 255, 255, 255]
            }
        });
        let result = process(&bytes, &config(3)).unwrap();
        let fine = result
            .polyline
            .points()
            .iter()
            .filter(|p| p.x < 4.0 && p.y < 4.0)
            .count();
        assert_eq!(fine, 16);
        assert_eq!(result.polyline.len(), 16 + 3);
    }

    #[test]
    fn circles_strategy_is_deterministic_per_seed() {
        let bytes = png(16, 16, |_, _| [0, 0, 0, 255]);
        let config = CurveConfig {
            density: DensityStrategy::Circles,
            seed: 7,
            ..config(5)
        };
        let a = process(&bytes, &config).unwrap();
        let b = process(&bytes, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn generate_matches_process() {
        let bytes = png(8, 8, |x, _| [u8::try_from(x * 30).unwrap(), 0, 0, 255]);
        let config = config(3);
        let grid = levels::image_to_levels(&bytes, 0, 3, false).unwrap();
        let tree = generate(&grid, &config).unwrap();
        assert_eq!(tree.points(), process(&bytes, &config).unwrap().polyline);
    }

    #[test]
    fn diagnostics_match_result() {
        let clock = TickClock {
            ticks: Cell::new(0),
        };
        let bytes = png(8, 8, |_, _| [0, 0, 0, 255]);
        let (result, diag) = process_with_diagnostics(&bytes, &config(3), &clock).unwrap();

        assert_eq!(result, process(&bytes, &config(3)).unwrap());
        assert_eq!(diag.summary.leaf_count, 64);
        assert_eq!(diag.summary.node_count, 85);
        assert_eq!(diag.summary.max_depth, 3);
        assert_eq!(diag.summary.jump_count, 0);
        assert_eq!(diag.summary.depth_histogram, vec![0, 0, 0, 64]);
        assert!(matches!(
            diag.traversal.metrics,
            StageMetrics::Traversal {
                point_count: 64,
                ..
            }
        ));
        // Every stage reads the clock once, and the total spans them all.
        assert_eq!(diag.levels.duration, Duration::from_millis(1));
        assert!(diag.total_duration >= diag.build.duration + diag.traversal.duration);
    }

    #[test]
    fn diagnostics_propagate_errors() {
        let clock = TickClock {
            ticks: Cell::new(0),
        };
        let result = process_with_diagnostics(&[], &CurveConfig::default(), &clock);
        assert!(matches!(result, Err(CurveError::EmptyInput)));
    }
}
