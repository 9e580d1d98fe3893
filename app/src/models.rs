// ==============================================================================
// models.rs - GWAS Pipeline Data Models
// ==============================================================================
// Description: Data structures shared by the cleaning and plotting stages
// Author: Matt Barham
// Created: 2026-02-10
// Modified: 2026-02-10
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};

/// Maximum number of records carried by the bounded preview result.
pub const PREVIEW_LIMIT: usize = 1000;

/// A single validated GWAS association record.
///
/// A record only exists if all three fields parsed and passed their range
/// checks; rejected rows are counted, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Chromosome number (numeric, always > 0)
    pub chromosome: u32,

    /// Base pair position. Any valid integer is accepted; positivity is
    /// deliberately not enforced.
    pub position: i64,

    /// Association p-value, in (0, 1]
    pub p_value: f64,
}

/// Aggregate counts for one cleaning run. Immutable once computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningStats {
    pub total_lines: usize,
    pub valid_lines: usize,
    pub filtered_lines: usize,
}

impl CleaningStats {
    pub fn new(total_lines: usize, valid_lines: usize) -> Self {
        Self {
            total_lines,
            valid_lines,
            filtered_lines: total_lines - valid_lines,
        }
    }
}

/// Output of a cleaning run: validated records in original file order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningResult {
    pub header: [String; 3],
    pub records: Vec<VariantRecord>,
    pub stats: CleaningStats,
}

impl CleaningResult {
    /// Canonical output header, regardless of input column order.
    pub fn cleaned_header() -> [String; 3] {
        ["CHR".to_string(), "POS".to_string(), "P".to_string()]
    }

    /// Bounded preview: a prefix of at most `limit` accepted records, with
    /// stats recomputed for that subset only.
    pub fn preview(&self, limit: usize) -> CleaningResult {
        let take = self.records.len().min(limit);
        CleaningResult {
            header: self.header.clone(),
            records: self.records[..take].to_vec(),
            stats: CleaningStats::new(take, take),
        }
    }
}

/// Full and preview results produced by a single cleaning run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningOutput {
    pub full: CleaningResult,
    pub preview: CleaningResult,
}

/// A record placed on the genome-wide cumulative axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub chromosome: u32,

    /// Position within the chromosome, as read from the input
    pub original_position: i64,

    /// Cumulative coordinate: chromosome offset + original position
    pub projected_position: i64,

    pub p_value: f64,

    /// -log10(max(p, 1e-300)); the floor keeps this finite for p = 0
    pub log_p: f64,
}

/// Axis placement for one chromosome on the cumulative coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromosomeLayout {
    pub chromosome: u32,

    /// Midpoint of the chromosome's projected range
    pub tick_center: f64,

    /// Stringified chromosome number, used as the axis tick label
    pub label: String,
}

/// Per-point metadata attached to traces for interactive lookup
/// (click-to-navigate in the embedding UI).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointMeta {
    pub chromosome: u32,
    pub position: i64,
    pub p_value: f64,
}

/// Rendering style of a trace. The charting layer is external; these map
/// onto scatter-marker and dashed-line series respectively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStyle {
    Markers,
    DashedLine,
}

/// One renderable series: a chromosome's points, or the significance line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotTrace {
    pub name: String,

    /// `None` for the threshold reference line
    pub chromosome: Option<u32>,

    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub style: TraceStyle,
    pub color: String,
    pub metadata: Vec<PointMeta>,
}

/// Everything the rendering layer needs for one Manhattan plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceBundle {
    pub traces: Vec<PlotTrace>,
    pub ticks: Vec<f64>,
    pub labels: Vec<String>,
    pub point_count: usize,
}
