// ABOUTME: Core data model for the enrichment pipeline
// ABOUTME: Run summaries, raw track points, enriched points, and binned output rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core data model.
//!
//! Records flow through the pipeline in this order:
//! [`RunSummary`] (catalog) → [`RawTrackPoint`] (GPX) → [`EnrichedPoint`]
//! (kinematics) → [`BinnedPoint`] (output row). Each stage is a plain value
//! type; there is no per-point identity to track across stages.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// One run from the catalog, with textual fields already converted to numbers.
///
/// Invariant: `average_pace_seconds` is present and below the sanity
/// threshold (15 min per distance unit by default); the catalog loader
/// enforces this before any track file is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Export-assigned activity identifier
    pub id: String,
    /// Local start date/time as recorded in the catalog
    pub start_date: NaiveDateTime,
    /// Average pace in seconds per distance unit
    pub average_pace_seconds: f64,
    /// Total duration in seconds
    pub duration_seconds: f64,
    /// Total distance in the export's distance unit (miles for RunKeeper)
    pub distance: f64,
    /// Track file reference, relative to the export directory
    pub track_file: String,
}

impl RunSummary {
    /// Average pace in minutes per distance unit
    #[must_use]
    pub fn average_pace_minutes(&self) -> f64 {
        self.average_pace_seconds / 60.0
    }

    /// Total duration in minutes
    #[must_use]
    pub fn duration_minutes(&self) -> f64 {
        self.duration_seconds / 60.0
    }
}

/// One GPS fix parsed from a track file, in recording order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawTrackPoint {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Elevation in meters
    pub elevation: f64,
    /// Recording instant (UTC)
    pub timestamp: DateTime<Utc>,
}

/// A track point annotated with kinematics and run-level context.
///
/// `speed_m_per_s` is defined relative to the immediately preceding point of
/// the same run only; the first point of every run carries 0. Run aggregates
/// use the convention documented in DESIGN.md: pace in minutes per distance
/// unit, distance in raw export units, duration in minutes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedPoint {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Elevation in meters
    pub elevation: f64,
    /// Recording instant converted to the configured local timezone,
    /// formatted `YYYY-MM-DD HH:MM:SS`
    pub local_time: String,
    /// Start-location label resolved once per run (`"Unknown"` on lookup failure)
    pub start_location: String,
    /// Instantaneous speed in m/s (0 for the first point of a run)
    pub speed_m_per_s: f64,
    /// Owning run's average pace in minutes per distance unit
    pub run_avg_pace: f64,
    /// Owning run's total distance in export units
    pub run_distance: f64,
    /// Owning run's total duration in minutes
    pub run_duration_min: f64,
    /// Local hour of day (0-23)
    pub hour_of_day: u8,
    /// Local day of week, Monday = 0
    pub day_of_week: u8,
}

/// One output row: an enriched point with continuous fields discretized.
///
/// Field names follow the downstream visualization contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinnedPoint {
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    /// Elevation in meters
    pub ele: f64,
    /// Local-timezone timestamp string
    pub timestamp: String,
    /// Start-location label
    pub location: String,
    /// Palette color hex for the point's speed bin
    pub color: String,
    /// Interval label for the run's average pace
    pub run_avg_pace: String,
    /// Interval label for the run's distance
    pub run_distance: String,
    /// Interval label for the run's duration
    pub run_duration: String,
    /// Local hour of day (0-23)
    pub hour: u8,
    /// Local day of week, Monday = 0
    pub dow: u8,
}
