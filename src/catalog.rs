// ABOUTME: Run catalog loader for RunKeeper-style activity exports
// ABOUTME: Parses the summary CSV, converts textual durations, and applies the pace sanity filter
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run catalog loading.
//!
//! The catalog is one CSV row per recorded activity. Rows without a pace are
//! expected (manual entries) and dropped silently; malformed duration text is
//! corrupt input and aborts the whole batch. Runs slower than the pace
//! threshold are dropped before their track file is ever opened.

use crate::errors::{AppError, AppResult};
use crate::models::RunSummary;
use chrono::NaiveDateTime;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

/// Catalog date format (`2019-01-05 14:02:32`)
const CATALOG_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One raw catalog row as exported. Columns not listed here are ignored.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "Activity Id")]
    activity_id: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Distance (mi)")]
    distance: f64,
    #[serde(rename = "Duration")]
    duration: String,
    #[serde(rename = "Average Pace")]
    average_pace: Option<String>,
    #[serde(rename = "GPX File")]
    gpx_file: Option<String>,
}

/// Parse `H:MM:SS` or `MM:SS` duration text into seconds.
///
/// # Errors
///
/// Returns an invalid-format error for anything else; the catalog exporter
/// only ever writes these two shapes, so a mismatch means corrupt input.
pub fn parse_duration_seconds(text: &str) -> AppResult<f64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    let bad = || AppError::invalid_format(format!("bad duration text '{text}'"));

    let numbers: Vec<f64> = parts
        .iter()
        .map(|p| p.parse::<f64>().map_err(|_| bad()))
        .collect::<AppResult<_>>()?;
    if numbers.iter().any(|n| *n < 0.0) {
        return Err(bad());
    }

    match numbers.as_slice() {
        [minutes, seconds] => Ok(minutes * 60.0 + seconds),
        [hours, minutes, seconds] => Ok(hours * 3600.0 + minutes * 60.0 + seconds),
        _ => Err(bad()),
    }
}

/// Load the run catalog, keeping only runs with a sane average pace.
///
/// Rows with no pace or no track file are dropped silently; a pace at or
/// above `max_pace_minutes` drops the row as well (forgotten-to-stop runs).
///
/// # Errors
///
/// Returns an error when the CSV cannot be read or deserialized, or when a
/// duration/pace/date field is present but malformed.
pub fn load_catalog(path: &Path, max_pace_minutes: f64) -> AppResult<Vec<RunSummary>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        AppError::not_found(format!("run catalog '{}'", path.display())).with_source(e)
    })?;

    let mut runs = Vec::new();
    let mut skipped_no_pace = 0usize;
    let mut skipped_slow = 0usize;

    for row in reader.deserialize() {
        let row: CatalogRow = row
            .map_err(|e| AppError::invalid_format(format!("bad catalog row: {e}")))?;

        // Manual entries carry no pace and no GPX file; both are expected.
        let (Some(pace_text), Some(gpx_file)) = (row.average_pace, row.gpx_file) else {
            skipped_no_pace += 1;
            continue;
        };
        if pace_text.trim().is_empty() || gpx_file.trim().is_empty() {
            skipped_no_pace += 1;
            continue;
        }

        let average_pace_seconds = parse_duration_seconds(&pace_text)?;
        let duration_seconds = parse_duration_seconds(&row.duration)?;

        if average_pace_seconds / 60.0 >= max_pace_minutes {
            debug!(
                activity_id = %row.activity_id,
                pace_seconds = average_pace_seconds,
                "dropping run over pace threshold"
            );
            skipped_slow += 1;
            continue;
        }

        let start_date = NaiveDateTime::parse_from_str(&row.date, CATALOG_DATE_FORMAT)
            .map_err(|e| {
                AppError::invalid_format(format!("bad catalog date '{}': {e}", row.date))
            })?;

        runs.push(RunSummary {
            id: row.activity_id,
            start_date,
            average_pace_seconds,
            duration_seconds,
            distance: row.distance,
            track_file: gpx_file,
        });
    }

    info!(
        loaded = runs.len(),
        skipped_no_pace, skipped_slow, "run catalog loaded"
    );
    Ok(runs)
}
