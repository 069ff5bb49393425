// ABOUTME: CLI for the runmap enrichment pipeline
// ABOUTME: Generates the binned point table from an export and shows a generated table as JSON
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runmap command line.
//!
//! ```bash
//! # Generate the binned table from the export in RUNMAP_DATA_DIR
//! runmap generate
//!
//! # Point at a specific export and also print JSON records
//! runmap generate --data-dir ./export --output ./run_data.csv --json
//!
//! # Print a previously generated table as JSON records
//! runmap show --input ./run_data.csv
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use runmap::config::PipelineConfig;
use runmap::geocoding::NominatimGeocoder;
use runmap::{logging, output, pipeline};
use std::path::PathBuf;
use tracing::warn;

#[derive(Parser)]
#[command(
    name = "runmap",
    about = "GPS run-history enrichment pipeline",
    long_about = "Enrich a GPS run export into a binned per-point table for map visualization"
)]
struct Cli {
    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline and write the binned table
    Generate {
        /// Export directory holding the catalog CSV and GPX files
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Output CSV path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Skip the reverse-geocoding lookups (labels become "Unknown")
        #[arg(long)]
        no_geocoding: bool,

        /// Also print the table as JSON records
        #[arg(long)]
        json: bool,
    },
    /// Print a previously generated table as JSON records
    Show {
        /// Generated CSV path (defaults to the configured output path)
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut config = PipelineConfig::from_env()?;

    match cli.command {
        Command::Generate {
            data_dir,
            output,
            no_geocoding,
            json,
        } => {
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(path) = output {
                config.output_file = path;
            }
            if no_geocoding {
                config.geocoding_enabled = false;
            }

            let geocoder = NominatimGeocoder::new(
                config.geocoding_base_url.clone(),
                config.geocoding_enabled,
                config.geocoding_timeout,
            )?;

            let outcome = pipeline::run_pipeline(&config, &geocoder).await?;
            for failure in &outcome.report.failures {
                warn!(
                    run_id = %failure.run_id,
                    track_file = %failure.track_file,
                    "run excluded: {}",
                    failure.reason
                );
            }
            output::write_csv(&config.output_file, &outcome.points)?;

            if json {
                println!("{}", output::to_json_records(&outcome.points)?);
            } else {
                println!(
                    "wrote {} points from {} runs to {} ({} run(s) failed)",
                    outcome.points.len(),
                    outcome.report.runs_processed,
                    config.output_file.display(),
                    outcome.report.failures.len()
                );
            }
        }
        Command::Show { input } => {
            let path = input.unwrap_or(config.output_file);
            let points = output::read_csv(&path)?;
            println!("{}", output::to_json_records(&points)?);
        }
    }

    Ok(())
}
