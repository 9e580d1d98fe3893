// ==============================================================================
// cleaner.rs - Streaming GWAS Data Cleaning
// ==============================================================================
// Description: Batched cleaning of raw association output into validated records
// Author: Matt Barham
// Created: 2026-02-10
// Modified: 2026-02-10
// Version: 1.0.0
// ==============================================================================
// Input: delimited text with a #CHROM/POS/P header, potentially millions of
// rows. Some upstream producers double-escape control characters, so the
// delimiters may arrive as the two-character sequences "\n" and "\t" instead
// of real newlines and tabs.
// ==============================================================================

use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

use crate::messages::{Cancelled, CancelToken, PipelineMessage, ProgressSink};
use crate::models::{CleaningOutput, CleaningResult, CleaningStats, PREVIEW_LIMIT};
use crate::validator::{ColumnMap, HeaderError, RecordValidator};

/// Rows consumed per batch before yielding to the cancellation check.
pub const BATCH_SIZE: usize = 10_000;

/// A progress notification is emitted every this many processed rows.
pub const PROGRESS_INTERVAL: usize = 100_000;

/// Two-character escape sequences some producers emit in place of the real
/// control characters.
const LITERAL_NEWLINE: &str = "\\n";
const LITERAL_TAB: &str = "\\t";

/// Errors that abort a cleaning run. Row-level problems are never errors;
/// they only increment the filtered count.
#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No data found in input file")]
    NoData,

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Row delimiter in effect for a given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineBreak {
    /// The two-character sequence backslash-n
    LiteralEscape,
    Newline,
}

impl LineBreak {
    fn pattern(self) -> &'static str {
        match self {
            LineBreak::LiteralEscape => LITERAL_NEWLINE,
            LineBreak::Newline => "\n",
        }
    }
}

/// Field delimiter in effect for a given input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldBreak {
    /// The two-character sequence backslash-t
    LiteralEscape,
    Tab,
}

impl FieldBreak {
    fn pattern(self) -> &'static str {
        match self {
            FieldBreak::LiteralEscape => LITERAL_TAB,
            FieldBreak::Tab => "\t",
        }
    }
}

/// Delimiter resolution, decided once per input rather than re-inspected per
/// line: the row delimiter from the whole content, the field delimiter from
/// the header row. Guards against upstream producers that double-escape
/// control characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimiterPolicy {
    pub line: LineBreak,
    pub field: FieldBreak,
}

impl DelimiterPolicy {
    pub fn resolve(content: &str) -> Self {
        let line = if content.contains(LITERAL_NEWLINE) {
            LineBreak::LiteralEscape
        } else {
            LineBreak::Newline
        };

        let header = content.split(line.pattern()).next().unwrap_or("");
        let field = if header.contains(LITERAL_TAB) {
            FieldBreak::LiteralEscape
        } else {
            FieldBreak::Tab
        };

        Self { line, field }
    }

    pub fn split_lines<'a>(&self, content: &'a str) -> impl Iterator<Item = &'a str> {
        content.split(self.line.pattern())
    }

    pub fn split_fields<'a>(&self, line: &'a str) -> Vec<&'a str> {
        line.split(self.field.pattern()).collect()
    }
}

/// Batched cleaner for raw association output.
///
/// Rows are consumed lazily in fixed-size batches so peak memory is bounded
/// by the accepted record set, not the raw text split; the cancellation
/// token is checked once per batch.
#[derive(Debug, Clone, Copy)]
pub struct StreamingCleaner {
    batch_size: usize,
    progress_interval: usize,
}

impl Default for StreamingCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamingCleaner {
    pub fn new() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    /// Override the batch and progress cadence. Used by tests to exercise
    /// batching without multi-million-row inputs.
    pub fn with_cadence(batch_size: usize, progress_interval: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            progress_interval: progress_interval.max(1),
        }
    }

    /// Clean raw delimited text into validated records plus a bounded
    /// preview, reporting progress along the way.
    pub fn clean(
        &self,
        raw: &str,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<CleaningOutput, CleaningError> {
        if raw.trim().is_empty() {
            return Err(CleaningError::NoData);
        }

        let policy = DelimiterPolicy::resolve(raw);
        debug!("Delimiter policy: {:?}", policy);

        let mut lines = policy.split_lines(raw);
        let header_line = lines.next().ok_or(CleaningError::NoData)?;
        let header_fields = policy.split_fields(header_line);
        let columns = ColumnMap::resolve(&header_fields)?;
        debug!(
            "Column indices - CHROM: {}, POS: {}, P: {}",
            columns.chromosome, columns.position, columns.p_value
        );

        let validator = RecordValidator::new(columns);

        // Blank rows are skipped without affecting stats, so the reported
        // total counts data rows only.
        let total = policy
            .split_lines(raw)
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .count();
        if total == 0 {
            return Err(CleaningError::NoData);
        }

        let mut records = Vec::new();
        let mut processed = 0usize;
        let mut valid = 0usize;

        loop {
            cancel.bail_if_cancelled()?;

            let mut batch_rows = 0usize;
            for line in lines.by_ref().take(self.batch_size) {
                batch_rows += 1;

                if line.trim().is_empty() {
                    continue;
                }
                processed += 1;

                let fields = policy.split_fields(line);
                if let Some(record) = validator.validate(&fields) {
                    records.push(record);
                    valid += 1;
                }

                if processed % self.progress_interval == 0 {
                    debug!("Processed {} lines ({} valid)", processed, valid);
                    sink.emit(PipelineMessage::CleaningProgress {
                        processed,
                        total,
                        valid,
                    });
                }
            }

            if batch_rows == 0 {
                break;
            }
        }

        let stats = CleaningStats::new(processed, valid);
        info!(
            "Cleaning complete: {} rows processed, {} valid, {} filtered",
            stats.total_lines, stats.valid_lines, stats.filtered_lines
        );

        let full = CleaningResult {
            header: CleaningResult::cleaned_header(),
            records,
            stats,
        };
        let preview = full.preview(PREVIEW_LIMIT);

        Ok(CleaningOutput { full, preview })
    }

    /// Clean a file on disk, e.g. the association output the analysis binary
    /// leaves behind.
    pub fn clean_path(
        &self,
        path: impl AsRef<Path>,
        sink: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<CleaningOutput, CleaningError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        self.clean(&raw, sink, cancel)
    }
}
