// ABOUTME: Batch pipeline orchestration from catalog to binned output table
// ABOUTME: Runs catalog → tracks → kinematics → outlier filter → binner, isolating per-run failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pipeline orchestration.
//!
//! Strictly staged: catalog → track parsing → kinematics → global outlier
//! filter → binning. Everything is held in memory; the statistics pass and
//! the bin boundaries need the full retained set. A corrupt catalog aborts
//! the batch; a bad track file or corrupt coordinates fail only their run,
//! which is recorded in the report and logged.

use crate::binning::bin_points;
use crate::catalog::load_catalog;
use crate::config::PipelineConfig;
use crate::errors::AppResult;
use crate::geocoding::ReverseGeocoder;
use crate::kinematics::KinematicsEngine;
use crate::models::BinnedPoint;
use crate::stats::filter_outliers;
use crate::track::parse_track_file;
use tracing::{error, info, warn};

/// One run that could not contribute points, with the reason.
#[derive(Debug, Clone)]
pub struct RunFailure {
    /// Catalog identifier of the failed run
    pub run_id: String,
    /// Track file that was being processed
    pub track_file: String,
    /// Human-readable failure reason
    pub reason: String,
}

/// Counts and per-run failures from one pipeline execution.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    /// Runs surviving the catalog filters
    pub runs_loaded: usize,
    /// Runs that contributed points
    pub runs_processed: usize,
    /// Runs that failed track parsing or kinematics
    pub failures: Vec<RunFailure>,
    /// Points enriched before outlier filtering
    pub points_enriched: usize,
    /// Points retained after outlier filtering
    pub points_retained: usize,
}

/// The binned table plus its execution report.
#[derive(Debug)]
pub struct PipelineOutcome {
    /// One row per retained, binned point
    pub points: Vec<BinnedPoint>,
    /// Execution counters and per-run failures
    pub report: PipelineReport,
}

/// Execute the full enrichment pipeline.
///
/// # Errors
///
/// Returns an error for batch-fatal conditions only: an unreadable or
/// corrupt catalog. Per-run failures are reported, not raised.
pub async fn run_pipeline(
    config: &PipelineConfig,
    geocoder: &dyn ReverseGeocoder,
) -> AppResult<PipelineOutcome> {
    let runs = load_catalog(&config.catalog_path(), config.max_pace_minutes)?;
    let engine = KinematicsEngine::new(geocoder, config.timezone);

    let mut report = PipelineReport {
        runs_loaded: runs.len(),
        ..PipelineReport::default()
    };
    let mut enriched = Vec::new();

    for run in &runs {
        let track_path = config.track_path(&run.track_file);
        let points = match parse_track_file(&track_path) {
            Ok(points) => points,
            Err(e) => {
                warn!(run_id = %run.id, error = %e, "skipping run with unreadable track");
                report.failures.push(RunFailure {
                    run_id: run.id.clone(),
                    track_file: run.track_file.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match engine.enrich_run(run, &points).await {
            Ok(mut run_points) => {
                report.runs_processed += 1;
                enriched.append(&mut run_points);
            }
            Err(e) => {
                // Coordinate integrity problem: surfaced, run excluded.
                error!(run_id = %run.id, error = %e, "kinematics failed for run");
                report.failures.push(RunFailure {
                    run_id: run.id.clone(),
                    track_file: run.track_file.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    report.points_enriched = enriched.len();
    if enriched.is_empty() {
        warn!("no points enriched; output table will be empty");
    }

    let retained = filter_outliers(enriched);
    report.points_retained = retained.len();

    let points = bin_points(&retained);
    info!(
        runs_loaded = report.runs_loaded,
        runs_processed = report.runs_processed,
        runs_failed = report.failures.len(),
        points_enriched = report.points_enriched,
        points_retained = report.points_retained,
        "pipeline complete"
    );

    Ok(PipelineOutcome { points, report })
}
