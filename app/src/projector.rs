// ==============================================================================
// projector.rs - Genome-Wide Coordinate Projection
// ==============================================================================
// Description: Lays chromosomes end-to-end on a single cumulative axis
// Author: Matt Barham
// Created: 2026-02-10
// Modified: 2026-02-10
// Version: 1.0.0
// ==============================================================================

use std::collections::BTreeMap;
use tracing::info;

use crate::messages::{Cancelled, CancelToken, PipelineMessage, ProgressSink};
use crate::models::{ChromosomeLayout, ProjectedPoint, VariantRecord};

/// Floor applied to p-values before the log transform, so p = 0 still maps
/// to a finite y coordinate.
pub const P_VALUE_FLOOR: f64 = 1e-300;

/// Projection owns the 0-60% band of plot progress; trace building takes
/// the rest.
pub const PROJECTION_PROGRESS_SHARE: f32 = 60.0;

/// Significance transform used for the plot's y axis.
pub fn log_p(p_value: f64) -> f64 {
    -p_value.max(P_VALUE_FLOOR).log10()
}

/// Projected points plus the per-chromosome axis layout derived with them.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub points: Vec<ProjectedPoint>,
    pub layouts: Vec<ChromosomeLayout>,
}

/// Assigns each record a cumulative genome-wide coordinate.
///
/// Chromosomes are processed in ascending numeric order; each one starts
/// exactly where the previous one's maximum observed position ended, so the
/// axis is contiguous with no visual gap. A chromosome's on-axis length is
/// its observed maximum data position, not a reference-genome length.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateProjector;

impl CoordinateProjector {
    pub fn new() -> Self {
        Self
    }

    pub fn project(
        &self,
        records: &[VariantRecord],
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<Projection, Cancelled> {
        // BTreeMap keys give the ascending numeric chromosome order that
        // determines both processing order and left-to-right placement.
        let mut by_chromosome: BTreeMap<u32, Vec<VariantRecord>> = BTreeMap::new();
        for record in records {
            by_chromosome
                .entry(record.chromosome)
                .or_default()
                .push(*record);
        }

        let total_chromosomes = by_chromosome.len();
        let mut points = Vec::with_capacity(records.len());
        let mut layouts = Vec::with_capacity(total_chromosomes);
        let mut offset: i64 = 0;

        for (index, (chromosome, mut chr_records)) in by_chromosome.into_iter().enumerate() {
            cancel.bail_if_cancelled()?;

            sink.emit(PipelineMessage::Progress {
                percent: (index as f32 / total_chromosomes as f32) * PROJECTION_PROGRESS_SHARE,
                message: format!(
                    "Processing chromosome {} ({}/{})",
                    chromosome,
                    index + 1,
                    total_chromosomes
                ),
            });

            // Stable, so equal positions keep their original file order
            chr_records.sort_by_key(|r| r.position);

            let max_position = chr_records.iter().fold(0i64, |acc, r| acc.max(r.position));

            let mut min_projected = i64::MAX;
            let mut max_projected = i64::MIN;
            for record in &chr_records {
                let projected_position = offset + record.position;
                min_projected = min_projected.min(projected_position);
                max_projected = max_projected.max(projected_position);

                points.push(ProjectedPoint {
                    chromosome,
                    original_position: record.position,
                    projected_position,
                    p_value: record.p_value,
                    log_p: log_p(record.p_value),
                });
            }

            offset += max_position;

            layouts.push(ChromosomeLayout {
                chromosome,
                tick_center: (min_projected as f64 + max_projected as f64) / 2.0,
                label: chromosome.to_string(),
            });
        }

        info!(
            "Projected {} points across {} chromosomes",
            points.len(),
            layouts.len()
        );

        Ok(Projection { points, layouts })
    }
}
