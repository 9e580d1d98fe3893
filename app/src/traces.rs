// ==============================================================================
// traces.rs - Renderable Trace Construction
// ==============================================================================
// Description: Builds per-chromosome plot series, axis ticks, and the
//              significance reference line
// Author: Matt Barham
// Created: 2026-02-10
// Modified: 2026-02-10
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::messages::{Cancelled, CancelToken, PipelineMessage, ProgressSink};
use crate::models::{
    ChromosomeLayout, PlotTrace, PointMeta, ProjectedPoint, TraceBundle, TraceStyle,
};
use crate::projector::log_p;

/// Genome-wide significance cutoff conventional for GWAS.
pub const GENOME_WIDE_SIGNIFICANCE: f64 = 5e-8;

/// Trace building owns the 60-90% band of plot progress.
const TRACE_PROGRESS_START: f32 = 60.0;
const TRACE_PROGRESS_SHARE: f32 = 30.0;

/// Default chromosome color cycle (22 entries, one per autosome).
pub fn default_palette() -> Vec<String> {
    [
        "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2",
        "#7f7f7f", "#bcbd22", "#17becf", "#aec7e8", "#ffbb78", "#98df8a", "#ff9896",
        "#c5b0d5", "#c49c94", "#f7b6d3", "#c7c7c7", "#dbdb8d", "#9edae5", "#393b79",
        "#637939",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

/// Options for one trace-building run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotOptions {
    /// Chromosome color cycle; falls back to the default palette when empty
    pub palette: Vec<String>,

    pub show_significance_line: bool,

    /// p-value cutoff for the reference line (drawn at -log10 of this)
    pub significance_threshold: f64,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            palette: default_palette(),
            show_significance_line: true,
            significance_threshold: GENOME_WIDE_SIGNIFICANCE,
        }
    }
}

/// Groups projected points into one series per chromosome and derives the
/// axis metadata the rendering layer needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceBuilder;

impl TraceBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        points: &[ProjectedPoint],
        layouts: &[ChromosomeLayout],
        options: &PlotOptions,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<TraceBundle, Cancelled> {
        let palette = if options.palette.is_empty() {
            default_palette()
        } else {
            options.palette.clone()
        };

        let mut by_chromosome: BTreeMap<u32, Vec<&ProjectedPoint>> = BTreeMap::new();
        for point in points {
            by_chromosome.entry(point.chromosome).or_default().push(point);
        }

        let total_chromosomes = by_chromosome.len();
        let mut traces = Vec::with_capacity(total_chromosomes + 1);

        for (index, (chromosome, chr_points)) in by_chromosome.into_iter().enumerate() {
            cancel.bail_if_cancelled()?;

            sink.emit(PipelineMessage::Progress {
                percent: TRACE_PROGRESS_START
                    + (index as f32 / total_chromosomes as f32) * TRACE_PROGRESS_SHARE,
                message: format!(
                    "Creating trace for chromosome {} ({}/{})",
                    chromosome,
                    index + 1,
                    total_chromosomes
                ),
            });

            // Color keyed to the chromosome number itself, so chr7 is the
            // same color whether or not chr1-6 are present.
            let color = palette[(chromosome.saturating_sub(1) as usize) % palette.len()].clone();

            traces.push(PlotTrace {
                name: format!("Chr {}", chromosome),
                chromosome: Some(chromosome),
                x: chr_points
                    .iter()
                    .map(|p| p.projected_position as f64)
                    .collect(),
                y: chr_points.iter().map(|p| p.log_p).collect(),
                style: TraceStyle::Markers,
                color,
                metadata: chr_points
                    .iter()
                    .map(|p| PointMeta {
                        chromosome: p.chromosome,
                        position: p.original_position,
                        p_value: p.p_value,
                    })
                    .collect(),
            });
        }

        sink.emit(PipelineMessage::Progress {
            percent: TRACE_PROGRESS_START + TRACE_PROGRESS_SHARE,
            message: "Adding significance line and calculating ticks...".to_string(),
        });

        if options.show_significance_line && !points.is_empty() {
            let max_projected = points
                .iter()
                .map(|p| p.projected_position)
                .fold(0i64, i64::max) as f64;
            let y = log_p(options.significance_threshold);

            traces.push(PlotTrace {
                name: format!("Significance ({:e})", options.significance_threshold),
                chromosome: None,
                x: vec![0.0, max_projected],
                y: vec![y, y],
                style: TraceStyle::DashedLine,
                color: "red".to_string(),
                metadata: Vec::new(),
            });
        }

        let bundle = TraceBundle {
            traces,
            ticks: layouts.iter().map(|l| l.tick_center).collect(),
            labels: layouts.iter().map(|l| l.label.clone()).collect(),
            point_count: points.len(),
        };

        info!(
            "Built {} traces for {} points across {} chromosomes",
            bundle.traces.len(),
            bundle.point_count,
            total_chromosomes
        );

        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{CancelSource, NullSink};

    fn point(chromosome: u32, projected: i64, p_value: f64) -> ProjectedPoint {
        ProjectedPoint {
            chromosome,
            original_position: projected,
            projected_position: projected,
            p_value,
            log_p: log_p(p_value),
        }
    }

    fn layout(chromosome: u32, tick_center: f64) -> ChromosomeLayout {
        ChromosomeLayout {
            chromosome,
            tick_center,
            label: chromosome.to_string(),
        }
    }

    fn build(
        points: &[ProjectedPoint],
        layouts: &[ChromosomeLayout],
        options: &PlotOptions,
    ) -> TraceBundle {
        TraceBuilder::new()
            .build(points, layouts, options, &NullSink, &CancelToken::never())
            .unwrap()
    }

    #[test]
    fn test_default_palette_has_one_color_per_autosome() {
        let palette = default_palette();
        assert_eq!(palette.len(), 22);
        assert_eq!(palette[0], "#1f77b4");
    }

    #[test]
    fn test_one_trace_per_chromosome_plus_threshold() {
        let points = [
            point(1, 100, 0.5),
            point(1, 200, 0.01),
            point(2, 300, 0.9),
        ];
        let layouts = [layout(1, 150.0), layout(2, 300.0)];
        let bundle = build(&points, &layouts, &PlotOptions::default());

        assert_eq!(bundle.traces.len(), 3);
        assert_eq!(bundle.traces[0].name, "Chr 1");
        assert_eq!(bundle.traces[0].x, vec![100.0, 200.0]);
        assert_eq!(bundle.traces[1].name, "Chr 2");
        assert_eq!(bundle.point_count, 3);
        assert_eq!(bundle.ticks, vec![150.0, 300.0]);
        assert_eq!(bundle.labels, vec!["1", "2"]);
    }

    #[test]
    fn test_color_is_stable_for_a_chromosome_regardless_of_subset() {
        let palette = default_palette();

        let only_chr7 = build(&[point(7, 1, 0.5)], &[], &PlotOptions::default());
        assert_eq!(only_chr7.traces[0].color, palette[6]);

        let with_others = build(
            &[point(1, 1, 0.5), point(7, 2, 0.5)],
            &[],
            &PlotOptions::default(),
        );
        assert_eq!(with_others.traces[1].color, palette[6]);
    }

    #[test]
    fn test_palette_wraps_past_its_length() {
        let palette = default_palette();
        let bundle = build(&[point(23, 1, 0.5)], &[], &PlotOptions::default());
        assert_eq!(bundle.traces[0].color, palette[0]); // (23 - 1) % 22
    }

    #[test]
    fn test_threshold_line_spans_full_axis() {
        let points = [point(1, 100, 0.5), point(2, 5000, 0.5)];
        let bundle = build(&points, &[], &PlotOptions::default());

        let line = bundle.traces.last().unwrap();
        assert_eq!(line.chromosome, None);
        assert_eq!(line.style, TraceStyle::DashedLine);
        assert_eq!(line.color, "red");
        assert_eq!(line.x, vec![0.0, 5000.0]);
        let expected_y = log_p(GENOME_WIDE_SIGNIFICANCE);
        assert_eq!(line.y, vec![expected_y, expected_y]);
        assert!(line.metadata.is_empty());
    }

    #[test]
    fn test_threshold_line_can_be_disabled() {
        let options = PlotOptions {
            show_significance_line: false,
            ..PlotOptions::default()
        };
        let bundle = build(&[point(1, 100, 0.5)], &[], &options);
        assert_eq!(bundle.traces.len(), 1);
        assert!(bundle.traces.iter().all(|t| t.chromosome.is_some()));
    }

    #[test]
    fn test_no_threshold_line_for_empty_input() {
        let bundle = build(&[], &[], &PlotOptions::default());
        assert!(bundle.traces.is_empty());
        assert_eq!(bundle.point_count, 0);
    }

    #[test]
    fn test_metadata_carries_original_coordinates() {
        let points = [ProjectedPoint {
            chromosome: 2,
            original_position: 10,
            projected_position: 1010,
            p_value: 1e-9,
            log_p: log_p(1e-9),
        }];
        let bundle = build(&points, &[], &PlotOptions::default());

        let meta = bundle.traces[0].metadata[0];
        assert_eq!(meta.chromosome, 2);
        assert_eq!(meta.position, 10);
        assert_eq!(meta.p_value, 1e-9);
    }

    #[test]
    fn test_progress_covers_trace_band() {
        let points = [point(1, 1, 0.5), point(2, 2, 0.5)];
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        TraceBuilder::new()
            .build(&points, &[], &PlotOptions::default(), &tx, &CancelToken::never())
            .unwrap();
        drop(tx);

        let mut percents = Vec::new();
        while let Ok(message) = rx.try_recv() {
            if let PipelineMessage::Progress { percent, .. } = message {
                percents.push(percent);
            }
        }
        assert_eq!(percents, vec![60.0, 75.0, 90.0]);
    }

    #[test]
    fn test_stale_token_cancels_build() {
        let source = CancelSource::new();
        let stale = source.issue();
        let _current = source.issue();

        let result = TraceBuilder::new().build(
            &[point(1, 1, 0.5)],
            &[],
            &PlotOptions::default(),
            &NullSink,
            &stale,
        );
        assert_eq!(result, Err(Cancelled));
    }
}
