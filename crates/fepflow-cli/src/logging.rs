use crate::error::{CliError, Result};
use std::fs::File;
use std::path::Path;
use tracing_subscriber::{
    filter::{LevelFilter, Targets},
    fmt::{self},
    prelude::*,
};

/// Captured engine output is logged under this target.
const ENGINE_OUTPUT_TARGET: &str = "fepflow::engine_output";

pub fn level_filter(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        LevelFilter::ERROR
    } else {
        match verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let level_filter = level_filter(verbosity, quiet);

    // Full engine output only reaches the console at -vvv.
    let console_targets = Targets::new()
        .with_default(level_filter)
        .with_target(
            ENGINE_OUTPUT_TARGET,
            if verbosity >= 3 && !quiet {
                LevelFilter::TRACE
            } else {
                LevelFilter::OFF
            },
        );

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .compact()
        .with_filter(console_targets);

    let subscriber = tracing_subscriber::registry().with(stderr_layer);

    if let Some(path) = log_file {
        let file = File::create(path).map_err(CliError::Io)?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_thread_ids(true)
            .with_target(true)
            .with_filter(LevelFilter::DEBUG.max(level_filter));

        subscriber.with(file_layer).init();
    } else {
        subscriber.init();
    }

    Ok(())
}
