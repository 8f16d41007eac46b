//! Curve diagnostics: timing, counts, and tree shape for each stage.
//!
//! Collected by [`process_with_diagnostics`](crate::process_with_diagnostics)
//! alongside the curve itself, for tuning level ranges and comparing
//! density strategies.
//!
//! Time is read through the [`Clock`] trait so callers pick the source
//! (`std::time::Instant` in the CLI, a fake in tests). Durations are
//! serialized as fractional seconds (`f64`) for JSON compatibility,
//! since `std::time::Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::density::DensityStrategy;
use crate::tree::QuadTree;

/// Injectable time source.
pub trait Clock {
    /// Opaque point in time.
    type Instant;

    /// The current instant.
    fn now(&self) -> Self::Instant;

    /// Time passed since `since`.
    fn elapsed(&self, since: &Self::Instant) -> Duration;
}

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single curve run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveDiagnostics {
    /// Stage 1: decode the image and remap it to levels.
    pub levels: StageDiagnostics,
    /// Stage 2: construct the density field.
    pub field: StageDiagnostics,
    /// Stage 3: build the quadtree.
    pub build: StageDiagnostics,
    /// Stage 4: walk the leaves into a polyline.
    pub traversal: StageDiagnostics,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
    /// Tree shape and output counts.
    pub summary: CurveSummary,
}

/// Diagnostics for a single stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
    /// Stage-specific metrics.
    pub metrics: StageMetrics,
}

/// Stage-specific metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StageMetrics {
    /// Decoding and level remapping.
    Levels {
        /// Size of the input image bytes.
        input_bytes: usize,
        /// Grid width in cells (image pixels).
        width: u32,
        /// Grid height in cells (image pixels).
        height: u32,
        /// Level assigned to blank cells.
        min_level: u32,
        /// Level assigned to the darkest cells.
        max_level: u32,
    },
    /// Density field construction.
    Field {
        /// Which strategy was used.
        strategy: DensityStrategy,
    },
    /// Quadtree construction.
    Build {
        /// Nodes in the tree, internal and leaf.
        node_count: usize,
        /// Leaves in the tree.
        leaf_count: usize,
        /// Deepest leaf level.
        max_depth: u32,
    },
    /// Leaf traversal.
    Traversal {
        /// Points in the output polyline.
        point_count: usize,
        /// Consecutive leaves whose anchors are not neighbours.
        jump_count: usize,
        /// Total polyline length in pixels.
        path_length: f64,
    },
}

/// Tree shape and output counts for a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSummary {
    /// Source image width in pixels.
    pub image_width: u32,
    /// Source image height in pixels.
    pub image_height: u32,
    /// Nodes in the tree.
    pub node_count: usize,
    /// Leaves in the tree (= output points).
    pub leaf_count: usize,
    /// Deepest leaf level.
    pub max_depth: u32,
    /// `depth_histogram[l]` is the number of leaves at level `l`.
    pub depth_histogram: Vec<usize>,
    /// Visible jumps in the curve.
    pub jump_count: usize,
}

impl CurveSummary {
    /// Summarize a built tree.
    #[must_use]
    pub fn from_tree(tree: &QuadTree, image_width: u32, image_height: u32) -> Self {
        let max_depth = tree.depth();
        let mut depth_histogram = vec![0; max_depth as usize + 1];
        let mut leaf_count = 0;
        for leaf in tree.leaves() {
            depth_histogram[leaf.level() as usize] += 1;
            leaf_count += 1;
        }

        Self {
            image_width,
            image_height,
            node_count: tree.nodes().count(),
            leaf_count,
            max_depth,
            depth_histogram,
            jump_count: crate::traversal::count_jumps(tree.leaves()),
        }
    }
}

impl CurveDiagnostics {
    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Curve Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {}x{}",
            self.summary.image_width, self.summary.image_height,
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<24} {:>10} {:>10}  {}",
            "Stage", "Duration", "% Total", "Details"
        ));
        lines.push("-".repeat(80));

        let total_ms = duration_ms(self.total_duration);
        let stages = [
            ("Levels", &self.levels),
            ("Density Field", &self.field),
            ("Build", &self.build),
            ("Traversal", &self.traversal),
        ];
        for (name, diag) in &stages {
            let ms = duration_ms(diag.duration);
            let pct = if total_ms > 0.0 {
                ms / total_ms * 100.0
            } else {
                0.0
            };
            let details = format_metrics(&diag.metrics);
            lines.push(format!("{name:<24} {ms:>8.3}ms {pct:>9.1}%  {details}"));
        }

        lines.push(String::new());
        lines.push(format!(
            "Leaves: {}  |  Max depth: {}  |  Jumps: {}",
            self.summary.leaf_count, self.summary.max_depth, self.summary.jump_count,
        ));
        let histogram: Vec<String> = self
            .summary
            .depth_histogram
            .iter()
            .enumerate()
            .filter(|(_, count)| **count > 0)
            .map(|(level, count)| format!("L{level}={count}"))
            .collect();
        lines.push(format!("Leaves per level: {}", histogram.join(" ")));

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn format_metrics(metrics: &StageMetrics) -> String {
    match metrics {
        StageMetrics::Levels {
            input_bytes,
            width,
            height,
            min_level,
            max_level,
        } => format!("{input_bytes} bytes -> {width}x{height} levels {min_level}..={max_level}"),
        StageMetrics::Field { strategy } => format!("strategy={}", strategy.name()),
        StageMetrics::Build {
            node_count,
            leaf_count,
            max_depth,
        } => format!("{node_count} nodes, {leaf_count} leaves, depth {max_depth}"),
        StageMetrics::Traversal {
            point_count,
            jump_count,
            path_length,
        } => format!("{point_count} pts, {jump_count} jumps, length {path_length:.1}"),
    }
}
