// ==============================================================================
// messages.rs - Pipeline Message Protocol
// ==============================================================================
// Description: Message vocabulary, progress sink, and cancellation tokens for
//              the off-main-thread pipeline stages
// Author: Matt Barham
// Created: 2026-02-10
// Modified: 2026-02-10
// Version: 1.0.0
// ==============================================================================

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::downsampler::DensityConfig;
use crate::models::{
    ChromosomeLayout, CleaningResult, ProjectedPoint, TraceBundle, VariantRecord,
};
use crate::traces::PlotOptions;

/// A stage observed a newer request and exited early at a batch boundary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("stage cancelled by a newer request")]
pub struct Cancelled;

/// Issues cancellation tokens. Each `issue()` starts a new generation and
/// invalidates every token issued before it, so at most one job per session
/// ever runs to completion.
#[derive(Debug, Default)]
pub struct CancelSource {
    latest: Arc<AtomicU64>,
}

impl CancelSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation. Tokens from earlier generations report
    /// cancellation from this point on.
    pub fn issue(&self) -> CancelToken {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        CancelToken {
            generation,
            latest: Arc::clone(&self.latest),
        }
    }
}

/// Generation-counter cancellation token. Stages check it between batches
/// and return `Cancelled` instead of being terminated mid-computation.
#[derive(Debug, Clone)]
pub struct CancelToken {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl CancelToken {
    /// A token that never reports cancellation. Used by callers that run a
    /// stage synchronously without a session.
    pub fn never() -> Self {
        Self {
            generation: 0,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.latest.load(Ordering::SeqCst) != self.generation
    }

    /// Batch-boundary check: `Err(Cancelled)` once a newer job has started.
    pub fn bail_if_cancelled(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Inbound pipeline requests. Per the single-owner hand-off discipline,
/// every request carries its dataset by value; the stages hold no state
/// between invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineRequest {
    Clean {
        raw_text: String,
    },
    Project {
        records: Vec<VariantRecord>,
    },
    ReduceDensity {
        points: Vec<ProjectedPoint>,
        config: DensityConfig,
    },
    BuildTraces {
        points: Vec<ProjectedPoint>,
        layouts: Vec<ChromosomeLayout>,
        options: PlotOptions,
    },
}

/// Outbound notifications from the pipeline stages.
///
/// Ordering guarantees: progress messages of a run are emitted in
/// non-decreasing completion order, and the terminal message of a run
/// (`CleaningComplete`, `DataProcessed`, `DensityReduced`, `TracesReady`,
/// or `Error`) is always the last one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineMessage {
    Status {
        message: String,
    },
    Progress {
        percent: f32,
        message: String,
    },
    CleaningProgress {
        processed: usize,
        total: usize,
        valid: usize,
    },
    CleaningComplete {
        result: CleaningResult,
        preview: CleaningResult,
    },
    DataProcessed {
        points: Vec<ProjectedPoint>,
        layouts: Vec<ChromosomeLayout>,
    },
    DensityReduced {
        points: Vec<ProjectedPoint>,
        original_count: usize,
    },
    TracesReady {
        bundle: TraceBundle,
    },
    Error {
        message: String,
    },
}

/// Destination for stage notifications. Implemented for the tokio unbounded
/// sender so stages can post straight into a session channel.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, message: PipelineMessage);
}

impl ProgressSink for UnboundedSender<PipelineMessage> {
    fn emit(&self, message: PipelineMessage) {
        // The receiver may already be gone (caller dropped a superseded run);
        // notifications are fire-and-forget.
        let _ = self.send(message);
    }
}

/// Sink that drops every message. For synchronous library use and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _message: PipelineMessage) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_token_is_never_cancelled() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());
        assert!(token.bail_if_cancelled().is_ok());
    }

    #[test]
    fn test_issue_invalidates_previous_generation() {
        let source = CancelSource::new();

        let first = source.issue();
        assert!(!first.is_cancelled());

        let second = source.issue();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(first.bail_if_cancelled(), Err(Cancelled));
    }

    #[test]
    fn test_messages_use_tagged_snake_case_wire_format() {
        let json = serde_json::to_value(&PipelineMessage::Progress {
            percent: 42.5,
            message: "Processing chromosome 7 (7/22)".to_string(),
        })
        .unwrap();
        assert_eq!(json["type"], "progress");
        assert_eq!(json["percent"], 42.5);

        let request: PipelineRequest =
            serde_json::from_str(r##"{"type":"clean","raw_text":"#CHROM\tPOS\tP"}"##).unwrap();
        assert!(matches!(request, PipelineRequest::Clean { .. }));
    }

    #[test]
    fn test_sender_sink_delivers_messages() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.emit(PipelineMessage::Status {
            message: "Processing GWAS data...".to_string(),
        });

        match rx.try_recv() {
            Ok(PipelineMessage::Status { message }) => {
                assert_eq!(message, "Processing GWAS data...");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_sender_sink_ignores_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        // Must not panic.
        tx.emit(PipelineMessage::Status {
            message: "late".to_string(),
        });
    }
}
