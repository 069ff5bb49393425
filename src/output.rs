// ABOUTME: Output sink writing the binned point table for downstream visualization
// ABOUTME: CSV writer plus a JSON-records rendering of the same table
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output serialization.
//!
//! The binned table is the product: one flat row per retained point. CSV is
//! the storage format; JSON records are what a visualization client consumes.

use crate::errors::{AppError, AppResult};
use crate::models::BinnedPoint;
use std::path::Path;
use tracing::info;

/// Write the binned table as CSV.
///
/// # Errors
///
/// Returns a storage error when the file cannot be created or a row cannot
/// be serialized.
pub fn write_csv(path: &Path, points: &[BinnedPoint]) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::storage(format!("cannot create '{}': {e}", path.display())))?;
    for point in points {
        writer
            .serialize(point)
            .map_err(|e| AppError::storage(format!("cannot write row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::storage(format!("cannot flush '{}': {e}", path.display())))?;
    info!(path = %path.display(), rows = points.len(), "binned table written");
    Ok(())
}

/// Read a previously written binned table back from CSV.
///
/// # Errors
///
/// Returns an error when the file is absent or a row does not deserialize.
pub fn read_csv(path: &Path) -> AppResult<Vec<BinnedPoint>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| {
        AppError::not_found(format!("binned table '{}'", path.display())).with_source(e)
    })?;
    reader
        .deserialize()
        .map(|row| row.map_err(|e| AppError::invalid_format(format!("bad table row: {e}"))))
        .collect()
}

/// Render the binned table as a JSON array of records.
///
/// # Errors
///
/// Returns a storage error when serialization fails.
pub fn to_json_records(points: &[BinnedPoint]) -> AppResult<String> {
    serde_json::to_string(points)
        .map_err(|e| AppError::storage(format!("cannot serialize records: {e}")))
}
