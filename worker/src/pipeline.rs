// ==============================================================================
// pipeline.rs - Manhattan Pipeline Orchestrator
// ==============================================================================
// Description: Sequences cleaning, projection, density reduction, and trace
//              building across isolated execution contexts
// Author: Matt Barham
// Created: 2026-02-10
// Modified: 2026-02-10
// Version: 1.0.0
// ==============================================================================

use chrono::Utc;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};
use uuid::Uuid;

use gwas_processor::cleaner::{CleaningError, StreamingCleaner};
use gwas_processor::downsampler::Downsampler;
use gwas_processor::messages::{
    CancelSource, CancelToken, PipelineMessage, PipelineRequest, ProgressSink,
};
use gwas_processor::projector::CoordinateProjector;
use gwas_processor::traces::TraceBuilder;

/// Session state machine. `Ready` is terminal until a new request restarts
/// the machine; `Error` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Cleaning,
    Cleaned,
    Projecting,
    Ready,
    Error,
}

/// Errors surfaced to the binary when driving a session run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Pipeline error: {0}")]
    Stage(String),

    #[error("Pipeline run ended without a result")]
    NoResult,

    #[error("Unexpected terminal message for this request")]
    UnexpectedMessage,
}

/// One pipeline session: at most one job in flight. Submitting a new request
/// starts a new cancellation generation, so a superseded job exits cleanly
/// at its next batch boundary instead of being terminated outright.
pub struct PipelineSession {
    state: Arc<Mutex<PipelineState>>,
    cancel: CancelSource,
}

impl Default for PipelineSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineSession {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(PipelineState::Idle)),
            cancel: CancelSource::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        *self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Submit a request and receive this run's message stream. The stage
    /// runs in its own blocking context; all communication is by message,
    /// and the dataset travels by value in both directions.
    pub fn submit(&self, request: PipelineRequest) -> UnboundedReceiver<PipelineMessage> {
        let run_id = Uuid::new_v4();
        let token = self.cancel.issue();

        set_state(
            &self.state,
            match request {
                PipelineRequest::Clean { .. } => PipelineState::Cleaning,
                _ => PipelineState::Projecting,
            },
        );

        let (caller_tx, caller_rx) = unbounded_channel();
        let (stage_tx, mut stage_rx) = unbounded_channel();

        let stage = tokio::task::spawn_blocking(move || run_request(request, &stage_tx, &token));

        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            info!(
                run_id = %run_id,
                started_at = %Utc::now().to_rfc3339(),
                "Pipeline run started"
            );

            while let Some(message) = stage_rx.recv().await {
                apply_transition(&state, &message);
                // The caller may have dropped a superseded run's receiver;
                // keep draining so state transitions stay accurate.
                let _ = caller_tx.send(message);
            }

            if let Err(join_error) = stage.await {
                // Runtime failure inside the stage context. Terminal for this
                // run; independent runs are unaffected.
                error!(run_id = %run_id, "Pipeline stage failed: {}", join_error);
                set_state(&state, PipelineState::Error);
                let _ = caller_tx.send(PipelineMessage::Error {
                    message: format!("Pipeline stage failure: {}", join_error),
                });
            }

            debug!(run_id = %run_id, "Pipeline run finished");
        });

        caller_rx
    }
}

fn set_state(state: &Arc<Mutex<PipelineState>>, next: PipelineState) {
    *state
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
}

/// Transitions driven by message receipt.
fn apply_transition(state: &Arc<Mutex<PipelineState>>, message: &PipelineMessage) {
    match message {
        PipelineMessage::CleaningComplete { .. } => set_state(state, PipelineState::Cleaned),
        PipelineMessage::TracesReady { .. } => set_state(state, PipelineState::Ready),
        PipelineMessage::Error { .. } => set_state(state, PipelineState::Error),
        _ => {}
    }
}

/// Execute one request synchronously inside its blocking context. The
/// terminal message (result or error) is always the last one emitted; a
/// cancelled run simply stops emitting.
fn run_request(
    request: PipelineRequest,
    sink: &UnboundedSender<PipelineMessage>,
    cancel: &CancelToken,
) {
    match request {
        PipelineRequest::Clean { raw_text } => {
            sink.emit(PipelineMessage::Status {
                message: "Processing GWAS data...".to_string(),
            });
            match StreamingCleaner::new().clean(&raw_text, sink, cancel) {
                Ok(output) => {
                    sink.emit(PipelineMessage::Status {
                        message: format!(
                            "Processing complete. {} valid entries found.",
                            output.full.stats.valid_lines
                        ),
                    });
                    sink.emit(PipelineMessage::CleaningComplete {
                        result: output.full,
                        preview: output.preview,
                    });
                }
                Err(CleaningError::Cancelled(_)) => {
                    debug!("Cleaning run superseded by a newer request");
                }
                Err(e) => sink.emit(PipelineMessage::Error {
                    message: e.to_string(),
                }),
            }
        }

        PipelineRequest::Project { records } => {
            sink.emit(PipelineMessage::Status {
                message: "Starting data processing...".to_string(),
            });
            match CoordinateProjector::new().project(&records, sink, cancel) {
                Ok(projection) => {
                    sink.emit(PipelineMessage::Progress {
                        percent: 60.0,
                        message: format!(
                            "Data processing complete. Processed {} points.",
                            projection.points.len()
                        ),
                    });
                    sink.emit(PipelineMessage::DataProcessed {
                        points: projection.points,
                        layouts: projection.layouts,
                    });
                }
                Err(_) => debug!("Projection run superseded by a newer request"),
            }
        }

        PipelineRequest::ReduceDensity { points, config } => {
            let original_count = points.len();
            match Downsampler::new().reduce(points, &config, sink, cancel) {
                Ok(points) => sink.emit(PipelineMessage::DensityReduced {
                    points,
                    original_count,
                }),
                Err(_) => debug!("Density reduction superseded by a newer request"),
            }
        }

        PipelineRequest::BuildTraces {
            points,
            layouts,
            options,
        } => {
            sink.emit(PipelineMessage::Status {
                message: "Creating plot traces...".to_string(),
            });
            match TraceBuilder::new().build(&points, &layouts, &options, sink, cancel) {
                Ok(bundle) => {
                    let chromosome_traces =
                        bundle.traces.iter().filter(|t| t.chromosome.is_some()).count();
                    sink.emit(PipelineMessage::Progress {
                        percent: 100.0,
                        message: format!(
                            "Plot ready! Displaying {} points across {} chromosomes.",
                            bundle.point_count, chromosome_traces
                        ),
                    });
                    sink.emit(PipelineMessage::TracesReady { bundle });
                }
                Err(_) => debug!("Trace build superseded by a newer request"),
            }
        }
    }
}
