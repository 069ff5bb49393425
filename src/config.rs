// ABOUTME: Environment-based configuration for the pipeline
// ABOUTME: Paths, policy thresholds, timezone, and geocoding settings with typed defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Environment-based configuration.
//!
//! Every knob has a typed default so `PipelineConfig::from_env()` always
//! succeeds on a machine with no environment set; the CLI overrides
//! individual fields on top.

use crate::errors::{AppError, AppResult};
use chrono_tz::Tz;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default sanity threshold for average pace, in minutes per distance unit
pub const DEFAULT_MAX_PACE_MINUTES: f64 = 15.0;

/// Default local timezone for output timestamps
pub const DEFAULT_TIMEZONE: &str = "America/New_York";

/// Default reverse-geocoding endpoint
pub const DEFAULT_GEOCODING_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Default reverse-geocoding request timeout in seconds
pub const DEFAULT_GEOCODING_TIMEOUT_SECS: u64 = 10;

/// Pipeline configuration, sourced from the environment with CLI overrides.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Export directory holding the catalog CSV and the GPX files
    pub data_dir: PathBuf,
    /// Catalog CSV filename within `data_dir`
    pub catalog_file: String,
    /// Output CSV path
    pub output_file: PathBuf,
    /// Runs with average pace at or above this many minutes per unit are dropped
    pub max_pace_minutes: f64,
    /// Timezone for output timestamps and hour/day-of-week features
    pub timezone: Tz,
    /// Reverse-geocoding endpoint base URL
    pub geocoding_base_url: String,
    /// Whether to call the reverse-geocoding service at all
    pub geocoding_enabled: bool,
    /// Reverse-geocoding request timeout
    pub geocoding_timeout: Duration,
}

impl PipelineConfig {
    /// Load configuration from `RUNMAP_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns a config error when a set variable fails to parse (bad
    /// timezone name, non-numeric threshold).
    pub fn from_env() -> AppResult<Self> {
        let data_dir = PathBuf::from(env_or("RUNMAP_DATA_DIR", "./data"));
        let catalog_file = env_or("RUNMAP_CATALOG_FILE", "cardioActivities.csv");
        let output_file = PathBuf::from(env_or("RUNMAP_OUTPUT_FILE", "./data/run_data.csv"));

        let max_pace_minutes = parse_env("RUNMAP_MAX_PACE_MINUTES", DEFAULT_MAX_PACE_MINUTES)?;
        if max_pace_minutes <= 0.0 {
            return Err(AppError::config(
                "RUNMAP_MAX_PACE_MINUTES must be positive",
            ));
        }

        let tz_name = env_or("RUNMAP_TIMEZONE", DEFAULT_TIMEZONE);
        let timezone = tz_name
            .parse::<Tz>()
            .map_err(|e| AppError::config(format!("invalid RUNMAP_TIMEZONE '{tz_name}': {e}")))?;

        let geocoding_timeout_secs: u64 =
            parse_env("RUNMAP_GEOCODING_TIMEOUT_SECS", DEFAULT_GEOCODING_TIMEOUT_SECS)?;

        Ok(Self {
            data_dir,
            catalog_file,
            output_file,
            max_pace_minutes,
            timezone,
            geocoding_base_url: env_or("RUNMAP_GEOCODING_BASE_URL", DEFAULT_GEOCODING_BASE_URL),
            geocoding_enabled: parse_env("RUNMAP_GEOCODING_ENABLED", true)?,
            geocoding_timeout: Duration::from_secs(geocoding_timeout_secs),
        })
    }

    /// Full path to the catalog CSV
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }

    /// Full path to one run's track file
    #[must_use]
    pub fn track_path(&self, track_file: &str) -> PathBuf {
        self.data_dir.join(track_file)
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.into())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> AppResult<T>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| AppError::config(format!("invalid {key} '{raw}': {e}"))),
        Err(_) => Ok(default),
    }
}
