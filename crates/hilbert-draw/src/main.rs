//! hilbert-draw: draw an image as a single adaptive pseudo-Hilbert curve.
//!
//! Reads an image, builds the curve with configurable level range and
//! density strategy, and prints per-stage diagnostics. Useful for:
//!
//! - Producing plotter-ready SVG with `--svg`
//! - Comparing density strategies (`max`, `average`, `majority`, `circles`)
//! - Tuning the level range against leaf and jump counts
//!
//! Log verbosity follows `RUST_LOG` (default `warn`).
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin hilbert-draw -- [OPTIONS] <IMAGE_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use hilbert_draw_pipeline::diagnostics::Clock;
use hilbert_draw_pipeline::{
    CurveConfig, CurveDiagnostics, CurveResult, DensityStrategy, SymmetryElement,
};
use tracing_subscriber::EnvFilter;

/// Draw an image as an adaptive pseudo-Hilbert curve.
///
/// Dark regions of the image get a fine curve, light regions a coarse
/// one. Prints per-stage timing and tree statistics.
#[derive(Parser)]
#[command(name = "hilbert-draw", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Deepest subdivision level.
    #[arg(long, default_value_t = CurveConfig::DEFAULT_MAX_LEVEL)]
    max_level: u32,

    /// Level assigned to blank pixels.
    #[arg(long, default_value_t = CurveConfig::DEFAULT_MIN_LEVEL)]
    min_level: u32,

    /// How a region's pixels decide its level.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_DENSITY)]
    density: Density,

    /// Seed for the random circle field.
    #[arg(long, default_value_t = CurveConfig::DEFAULT_SEED)]
    seed: u64,

    /// Let bright pixels carry ink instead of dark ones.
    #[arg(long)]
    invert: bool,

    /// Quarter turns applied to the root orientation.
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..4))]
    root_rotation: u8,

    /// Mirror the root orientation.
    #[arg(long)]
    root_reflect: bool,

    /// Write SVG output to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Write the curve points as JSON to file.
    #[arg(long)]
    points: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Full curve config as a JSON string.
    ///
    /// When provided, all other curve parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Density strategy selection.
#[derive(Clone, Copy, ValueEnum)]
enum Density {
    /// Highest level of any covered pixel.
    Max,
    /// Mean level of the covered pixels.
    Average,
    /// Dominant level, mixed regions keep subdividing.
    Majority,
    /// Random disks, ignores the image.
    Circles,
}

/// Maps a [`DensityStrategy`] to the local CLI [`Density`] enum.
const fn density_from_pipeline(d: DensityStrategy) -> Density {
    match d {
        DensityStrategy::Max => Density::Max,
        DensityStrategy::Average => Density::Average,
        DensityStrategy::Majority => Density::Majority,
        DensityStrategy::Circles => Density::Circles,
    }
}

/// The CLI default strategy, derived from [`CurveConfig::DEFAULT_DENSITY`]
/// so the two cannot silently diverge.
const CLI_DEFAULT_DENSITY: Density = density_from_pipeline(CurveConfig::DEFAULT_DENSITY);

/// Build a [`CurveConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<CurveConfig, String> {
    let config = if let Some(ref json) = cli.config_json {
        serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"))?
    } else {
        CurveConfig {
            max_level: cli.max_level,
            min_level: cli.min_level,
            density: match cli.density {
                Density::Max => DensityStrategy::Max,
                Density::Average => DensityStrategy::Average,
                Density::Majority => DensityStrategy::Majority,
                Density::Circles => DensityStrategy::Circles,
            },
            root_symmetry: SymmetryElement::new(cli.root_rotation, cli.root_reflect),
            seed: cli.seed,
            invert: cli.invert,
        }
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let image_bytes = match std::fs::read(&cli.image_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };

    eprintln!(
        "Image: {} ({} bytes)",
        cli.image_path.display(),
        image_bytes.len(),
    );
    eprintln!("Config: {config:#?}");
    eprintln!("Runs: {}", cli.runs);
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run + 1, cli.runs);
        }

        let (result, diagnostics) =
            match hilbert_draw_pipeline::process_with_diagnostics(&image_bytes, &config, &StdClock)
            {
                Ok(output) => output,
                Err(e) => {
                    eprintln!("Curve error: {e}");
                    return ExitCode::FAILURE;
                }
            };

        if cli.json {
            match serde_json::to_string_pretty(&diagnostics) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", diagnostics.report());
        }

        // Write outputs on the first run only.
        if run == 0 {
            if let Some(ref svg_path) = cli.svg
                && let Err(msg) = write_svg(svg_path, &cli.image_path, &result, &config)
            {
                eprintln!("{msg}");
                return ExitCode::FAILURE;
            }
            if let Some(ref points_path) = cli.points
                && let Err(msg) = write_points(points_path, &result)
            {
                eprintln!("{msg}");
                return ExitCode::FAILURE;
            }
        }

        all_diagnostics.push(diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Serialize the curve to SVG, embedding the config for reproducibility.
fn write_svg(
    svg_path: &Path,
    image_path: &Path,
    result: &CurveResult,
    config: &CurveConfig,
) -> Result<(), String> {
    let title = image_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("hilbert-draw");
    let desc = format!(
        "levels {}..={}, density {}, {} points",
        config.min_level,
        config.max_level,
        config.density.name(),
        result.polyline.len(),
    );
    let config_json = serde_json::to_string(config)
        .map_err(|e| format!("Error serializing config: {e}"))?;
    let metadata = hilbert_draw_export::SvgMetadata {
        title: Some(title),
        description: Some(&desc),
        config_json: Some(&config_json),
    };
    let svg = hilbert_draw_export::to_svg(&result.polyline, result.dimensions, &metadata);
    std::fs::write(svg_path, &svg)
        .map_err(|e| format!("Error writing SVG to {}: {e}", svg_path.display()))?;
    eprintln!(
        "SVG written to {} ({} bytes)",
        svg_path.display(),
        svg.len(),
    );
    Ok(())
}

/// Write the curve points as a JSON array of `{x, y}` objects.
fn write_points(points_path: &Path, result: &CurveResult) -> Result<(), String> {
    let json = serde_json::to_string(&result.polyline)
        .map_err(|e| format!("Error serializing points: {e}"))?;
    std::fs::write(points_path, &json)
        .map_err(|e| format!("Error writing points to {}: {e}", points_path.display()))?;
    eprintln!(
        "{} points written to {}",
        result.polyline.len(),
        points_path.display(),
    );
    Ok(())
}

/// [`Clock`] implementation backed by [`std::time::Instant`].
struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        Instant::now()
    }

    fn elapsed(&self, since: &Instant) -> Duration {
        since.elapsed()
    }
}

/// Function pointer type for extracting a stage duration from diagnostics.
type StageExtractor = fn(&CurveDiagnostics) -> Duration;

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[CurveDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    println!();
    println!("{:<24} {:>12}", "Stage", "Mean (ms)");
    println!("{}", "-".repeat(40));

    let stage_extractors: &[(&str, StageExtractor)] = &[
        ("Levels", |d| d.levels.duration),
        ("Density Field", |d| d.field.duration),
        ("Build", |d| d.build.duration),
        ("Traversal", |d| d.traversal.duration),
    ];

    for (name, extractor) in stage_extractors {
        let stage_mean = all_diagnostics
            .iter()
            .map(|d| extractor(d).as_secs_f64() * 1000.0)
            .sum::<f64>()
            / all_diagnostics.len() as f64;
        println!("{name:<24} {stage_mean:>10.3}ms");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("hilbert-draw").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_pipeline_defaults() {
        let config = config_from_cli(&parse(&["in.png"])).unwrap();
        assert_eq!(config, CurveConfig::default());
    }

    #[test]
    fn flags_populate_config() {
        let cli = parse(&[
            "in.png",
            "--max-level",
            "5",
            "--min-level",
            "1",
            "--density",
            "majority",
            "--seed",
            "9",
            "--invert",
            "--root-rotation",
            "2",
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.max_level, 5);
        assert_eq!(config.min_level, 1);
        assert_eq!(config.density, DensityStrategy::Majority);
        assert_eq!(config.seed, 9);
        assert!(config.invert);
        assert_eq!(config.root_symmetry, SymmetryElement::new(2, false));
    }

    #[test]
    fn root_rotation_out_of_range_is_rejected() {
        let parsed = Cli::try_parse_from(["hilbert-draw", "in.png", "--root-rotation", "4"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "in.png",
            "--max-level",
            "2",
            "--config-json",
            r#"{"max_level": 6, "density": "Circles"}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.max_level, 6);
        assert_eq!(config.density, DensityStrategy::Circles);
        assert_eq!(config.min_level, CurveConfig::DEFAULT_MIN_LEVEL);
    }

    #[test]
    fn invalid_config_is_reported() {
        let cli = parse(&["in.png", "--max-level", "2", "--min-level", "3"]);
        let err = config_from_cli(&cli).unwrap_err();
        assert!(err.contains("min_level"), "{err}");

        let cli = parse(&["in.png", "--config-json", "{not json"]);
        assert!(config_from_cli(&cli).unwrap_err().contains("--config-json"));
    }
}
