// ==============================================================================
// main.rs - Manhattan Worker Entry Point
// ==============================================================================
// Description: CLI that cleans GWAS summary statistics and emits Manhattan
//              plot traces as JSON
// Author: Matt Barham
// Created: 2026-02-10
// Modified: 2026-02-10
// Version: 1.0.0
// ==============================================================================

mod pipeline;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

use gwas_processor::downsampler::DensityConfig;
use gwas_processor::messages::{PipelineMessage, PipelineRequest};
use gwas_processor::traces::{default_palette, PlotOptions, GENOME_WIDE_SIGNIFICANCE};

use crate::pipeline::{PipelineError, PipelineSession};

#[derive(Parser, Debug)]
#[command(
    name = "manhattan-worker",
    about = "Clean GWAS summary statistics and build Manhattan plot traces",
    version
)]
struct Args {
    /// Path to the association output file (tab or comma separated)
    input: PathBuf,

    /// Where to write the trace bundle JSON
    #[arg(long, default_value = "traces.json")]
    out: PathBuf,

    /// Apply per-chromosome density reduction to very large datasets
    #[arg(long)]
    downsample: bool,

    /// Per-chromosome cap for non-significant points when downsampling
    #[arg(long, default_value_t = 50_000)]
    max_points_per_chromosome: usize,

    /// p-value cutoff for the significance reference line
    #[arg(long, default_value_t = GENOME_WIDE_SIGNIFICANCE)]
    significance_threshold: f64,

    /// Omit the significance reference line
    #[arg(long)]
    no_significance_line: bool,

    /// Print the bounded cleaning preview as JSON and exit
    #[arg(long)]
    preview_only: bool,
}

#[derive(Serialize)]
struct RunSummary {
    input: PathBuf,
    output: PathBuf,
    total_lines: usize,
    valid_lines: usize,
    filtered_lines: usize,
    plotted_points: usize,
    traces: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();

    let raw_text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file {}", args.input.display()))?;

    let session = PipelineSession::new();

    // Stage 1: clean and validate
    let (result, preview) = match drive(&session, PipelineRequest::Clean { raw_text }).await? {
        PipelineMessage::CleaningComplete { result, preview } => (result, preview),
        _ => return Err(PipelineError::UnexpectedMessage.into()),
    };
    info!(
        "Cleaned {} data rows: {} valid, {} filtered",
        result.stats.total_lines, result.stats.valid_lines, result.stats.filtered_lines
    );

    if args.preview_only {
        serde_json::to_writer_pretty(std::io::stdout().lock(), &preview)
            .context("Failed to write preview JSON")?;
        println!();
        return Ok(());
    }
    let stats = result.stats;

    // Stage 2: project onto the cumulative genome-wide axis
    let (points, layouts) = match drive(&session, PipelineRequest::Project {
        records: result.records,
    })
    .await?
    {
        PipelineMessage::DataProcessed { points, layouts } => (points, layouts),
        _ => return Err(PipelineError::UnexpectedMessage.into()),
    };

    // Stage 3: optional density reduction
    let config = DensityConfig {
        max_points_per_chromosome: args.max_points_per_chromosome,
        ..DensityConfig::default()
    };
    let points = if args.downsample && config.should_engage(points.len()) {
        match drive(&session, PipelineRequest::ReduceDensity { points, config }).await? {
            PipelineMessage::DensityReduced {
                points,
                original_count,
            } => {
                info!(
                    "Density reduction: {} -> {} points",
                    original_count,
                    points.len()
                );
                points
            }
            _ => return Err(PipelineError::UnexpectedMessage.into()),
        }
    } else {
        if args.downsample {
            info!("Dataset below the density reduction threshold, keeping all points");
        }
        points
    };

    // Stage 4: build renderable traces
    let options = PlotOptions {
        palette: default_palette(),
        show_significance_line: !args.no_significance_line,
        significance_threshold: args.significance_threshold,
    };
    let bundle = match drive(&session, PipelineRequest::BuildTraces {
        points,
        layouts,
        options,
    })
    .await?
    {
        PipelineMessage::TracesReady { bundle } => bundle,
        _ => return Err(PipelineError::UnexpectedMessage.into()),
    };

    let file = File::create(&args.out)
        .with_context(|| format!("Failed to create output file {}", args.out.display()))?;
    serde_json::to_writer(BufWriter::new(file), &bundle)
        .context("Failed to write trace bundle JSON")?;

    let summary = RunSummary {
        input: args.input,
        output: args.out,
        total_lines: stats.total_lines,
        valid_lines: stats.valid_lines,
        filtered_lines: stats.filtered_lines,
        plotted_points: bundle.point_count,
        traces: bundle.traces.len(),
    };
    println!("{}", serde_json::to_string(&summary)?);

    Ok(())
}

/// Submit one request and consume its run to the terminal message, logging
/// progress along the way. A pipeline `Error` message aborts the run.
async fn drive(
    session: &PipelineSession,
    request: PipelineRequest,
) -> Result<PipelineMessage, PipelineError> {
    let mut rx = session.submit(request);
    let mut terminal = None;

    while let Some(message) = rx.recv().await {
        match &message {
            PipelineMessage::Status { message } => info!("{}", message),
            PipelineMessage::Progress { percent, message } => {
                info!("[{:>5.1}%] {}", percent, message)
            }
            PipelineMessage::CleaningProgress {
                processed,
                total,
                valid,
            } => info!("Cleaned {}/{} rows ({} valid)", processed, total, valid),
            PipelineMessage::Error { message } => {
                return Err(PipelineError::Stage(message.clone()))
            }
            _ => terminal = Some(message),
        }
    }

    terminal.ok_or(PipelineError::NoResult)
}
