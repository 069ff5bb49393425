// ABOUTME: Library entry point for the runmap enrichment pipeline
// ABOUTME: Wires catalog loading, GPX parsing, kinematics, filtering, binning, and output
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]

//! # Runmap
//!
//! Turns a personal GPS run export (one CSV summary row per run, one GPX
//! track per run) into an enriched, binned point table for map-based
//! visualization: every retained GPS fix annotated with instantaneous
//! speed (as a gradient color), the run's aggregate pace/distance/duration
//! (as interval buckets), a start-location label, and local-time features.
//!
//! ## Pipeline
//!
//! 1. [`catalog`] — load run summaries, drop paceless and implausibly slow runs
//! 2. [`track`] — parse each run's GPX file into ordered raw points
//! 3. [`kinematics`] — derive speed from WGS84 geodesic distance and elapsed
//!    time, resolve the start location once per run
//! 4. [`stats`] — drop speed outliers outside one global standard deviation
//! 5. [`binning`] — discretize speed and run aggregates for the map legend
//! 6. [`output`] — write the table as CSV or JSON records
//!
//! [`pipeline::run_pipeline`] chains the stages; per-run failures are
//! collected in the report instead of aborting the batch.
//!
//! ## Example
//!
//! ```rust,no_run
//! use runmap::config::PipelineConfig;
//! use runmap::geocoding::NominatimGeocoder;
//! use runmap::pipeline::run_pipeline;
//!
//! #[tokio::main]
//! async fn main() -> runmap::errors::AppResult<()> {
//!     let config = PipelineConfig::from_env()?;
//!     let geocoder = NominatimGeocoder::new(
//!         config.geocoding_base_url.clone(),
//!         config.geocoding_enabled,
//!         config.geocoding_timeout,
//!     )?;
//!     let outcome = run_pipeline(&config, &geocoder).await?;
//!     runmap::output::write_csv(&config.output_file, &outcome.points)?;
//!     Ok(())
//! }
//! ```

pub mod binning;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod geocoding;
pub mod kinematics;
pub mod logging;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod stats;
pub mod track;
