// ==============================================================================
// downsampler.rs - Significance-Preserving Density Reduction
// ==============================================================================
// Description: Reduces per-chromosome point density for render performance
// Author: Matt Barham
// Created: 2026-02-10
// Modified: 2026-02-10
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::messages::{Cancelled, CancelToken, PipelineMessage, ProgressSink};
use crate::models::ProjectedPoint;

/// Density reduction configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DensityConfig {
    /// Points with p below this are "significant" and exempt from sampling
    pub significance_threshold: f64,

    /// Per-chromosome cap applied to non-significant points
    pub max_points_per_chromosome: usize,

    /// Keep 100% of significant points regardless of dataset size
    pub preserve_significant: bool,

    /// Reduction only engages above this total point count
    pub min_points_to_engage: usize,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 1e-4,
            max_points_per_chromosome: 50_000,
            preserve_significant: true,
            min_points_to_engage: 100_000,
        }
    }
}

impl DensityConfig {
    /// Whether a dataset of this size warrants reduction at all.
    pub fn should_engage(&self, point_count: usize) -> bool {
        point_count > self.min_points_to_engage
    }
}

/// Per-chromosome stride sampler.
///
/// With `preserve_significant` set, no point whose p-value crosses the
/// significance threshold is ever dropped, for any input size.
#[derive(Debug, Clone, Copy, Default)]
pub struct Downsampler;

impl Downsampler {
    pub fn new() -> Self {
        Self
    }

    pub fn reduce(
        &self,
        points: Vec<ProjectedPoint>,
        config: &DensityConfig,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Vec<ProjectedPoint>, Cancelled> {
        sink.emit(PipelineMessage::Status {
            message: "Applying density reduction...".to_string(),
        });

        let original_count = points.len();

        let mut by_chromosome: BTreeMap<u32, Vec<ProjectedPoint>> = BTreeMap::new();
        for point in points {
            by_chromosome.entry(point.chromosome).or_default().push(point);
        }

        let mut reduced = Vec::new();
        for (_, chr_points) in by_chromosome {
            cancel.bail_if_cancelled()?;

            if config.preserve_significant {
                let (significant, non_significant): (Vec<_>, Vec<_>) = chr_points
                    .into_iter()
                    .partition(|p| p.p_value < config.significance_threshold);

                reduced.extend(significant);
                sample_into(&mut reduced, non_significant, config.max_points_per_chromosome);
            } else {
                sample_into(&mut reduced, chr_points, config.max_points_per_chromosome);
            }
        }

        info!(
            "Density reduction complete: {} -> {} points",
            original_count,
            reduced.len()
        );
        sink.emit(PipelineMessage::Status {
            message: format!(
                "Density reduction complete. Reduced from {} to {} points.",
                original_count,
                reduced.len()
            ),
        });

        Ok(reduced)
    }
}

/// Uniform stride sampling: every Nth point with N = floor(len / cap), or
/// everything when under the cap.
fn sample_into(out: &mut Vec<ProjectedPoint>, points: Vec<ProjectedPoint>, cap: usize) {
    if points.len() > cap && cap > 0 {
        let stride = points.len() / cap;
        out.extend(points.into_iter().step_by(stride.max(1)));
    } else {
        out.extend(points);
    }
}
