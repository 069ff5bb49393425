// ABOUTME: Structured logging setup for the pipeline and CLI
// ABOUTME: Tracing subscriber with env-filter, compact output, level from flag or RUST_LOG
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging setup.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise the crate logs at `debug` with
/// `verbose` and `info` without.
pub fn init(verbose: bool) {
    let default_directive = if verbose { "runmap=debug,info" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
