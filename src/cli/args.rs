//! Command-line argument definitions for the REM archiver
//!
//! This module defines the complete CLI interface using the clap derive
//! API, with one subcommand per operating mode.

use crate::constants::{DEFAULT_BACKFILL_START_YEAR, DEFAULT_DATA_DIR, DEFAULT_FALLBACK_LOOKBACK_DAYS};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// CLI arguments for the REM station archiver
///
/// Builds and incrementally maintains one CSV dataset per weather station
/// of the San Luis REM climate portal.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "rem-archiver",
    version,
    about = "Build and incrementally maintain per-station CSV archives from the San Luis REM network",
    long_about = "Downloads time-series observations from the San Luis REM climate portal, one \
                  calendar month at a time, and maintains one append-only CSV dataset per \
                  station. A full backfill creates the archive; incremental updates extend it \
                  from each file's own last confirmed timestamp."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands for the REM archiver
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Download the full historical record for every discovered station
    Backfill(BackfillArgs),
    /// Incrementally update the existing per-station datasets
    Update(UpdateArgs),
    /// Discover and list the portal's qualifying stations
    Stations(StationsArgs),
}

/// Arguments for the backfill command
#[derive(Debug, Clone, Parser)]
pub struct BackfillArgs {
    /// Directory receiving one CSV per station
    ///
    /// Created if it does not exist. Files are named {id}_{Name}.csv.
    #[arg(
        short = 'd',
        long = "data-dir",
        value_name = "PATH",
        default_value = DEFAULT_DATA_DIR,
        help = "Directory receiving one CSV dataset per station"
    )]
    pub data_dir: PathBuf,

    /// First year of the historical range to request
    #[arg(
        long = "start-year",
        value_name = "YEAR",
        default_value_t = DEFAULT_BACKFILL_START_YEAR,
        help = "First year of the historical range"
    )]
    pub start_year: i32,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors and critical messages
    #[arg(short = 'q', long = "quiet", help = "Suppress non-error output")]
    pub quiet: bool,
}

/// Arguments for the update command
#[derive(Debug, Clone, Parser)]
pub struct UpdateArgs {
    /// Directory holding the per-station datasets from a previous backfill
    ///
    /// Must already exist; incremental mode never invents an archive.
    #[arg(
        short = 'd',
        long = "data-dir",
        value_name = "PATH",
        default_value = DEFAULT_DATA_DIR,
        help = "Directory holding the per-station CSV datasets"
    )]
    pub data_dir: PathBuf,

    /// Days to refill when a dataset exists but holds no data rows
    #[arg(
        long = "lookback-days",
        value_name = "DAYS",
        default_value_t = DEFAULT_FALLBACK_LOOKBACK_DAYS,
        help = "Lookback window for datasets with no derivable boundary"
    )]
    pub lookback_days: i64,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors and critical messages
    #[arg(short = 'q', long = "quiet", help = "Suppress non-error output")]
    pub quiet: bool,
}

/// Output format for the stations listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned plain-text table
    Table,
    /// JSON array of station records
    Json,
}

/// Arguments for the stations command
#[derive(Debug, Clone, Parser)]
pub struct StationsArgs {
    /// Listing output format
    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        default_value = "table",
        help = "Listing output format"
    )]
    pub format: OutputFormat,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors and critical messages
    #[arg(short = 'q', long = "quiet", help = "Suppress non-error output")]
    pub quiet: bool,
}

/// Map a verbosity count and quiet flag to a tracing level name
pub fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
