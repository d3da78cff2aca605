//! Command implementations for the REM archiver CLI
//!
//! This module contains the command execution logic, logging setup,
//! progress reporting, and the end-of-run summary. Station-level failures
//! are downgraded to skips here; only a missing archive directory aborts
//! an update run.

use crate::cli::args::{
    log_level, Args, BackfillArgs, Commands, OutputFormat, StationsArgs, UpdateArgs,
};
use crate::config::SyncConfig;
use crate::error::{RemError, Result};
use crate::models::RunStats;
use crate::sync::SyncEngine;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Dispatch the parsed command line
pub async fn run(args: Args, cancel: CancellationToken) -> Result<RunStats> {
    match args.command {
        Some(Commands::Backfill(backfill)) => run_backfill(backfill, cancel).await,
        Some(Commands::Update(update)) => run_update(update, cancel).await,
        Some(Commands::Stations(stations)) => run_stations(stations).await,
        None => Err(RemError::Configuration {
            message: "no command given".to_string(),
        }),
    }
}

/// Set up structured logging to stderr
fn setup_logging(verbose: u8, quiet: bool) -> Result<()> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let level = log_level(verbose, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rem_archiver={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(())
}

/// Download the full historical record for every discovered station
async fn run_backfill(args: BackfillArgs, cancel: CancellationToken) -> Result<RunStats> {
    setup_logging(args.verbose, args.quiet)?;

    let config = SyncConfig::default()
        .with_data_dir(&args.data_dir)
        .with_backfill_start_year(args.start_year);
    let engine = SyncEngine::new(config)?;

    println!("{}", "Discovering stations".bright_yellow());
    let stations = engine.discover_stations().await?;
    if stations.is_empty() {
        return Err(RemError::Configuration {
            message: "no qualifying stations (REM/SLA) found on the portal index".to_string(),
        });
    }
    println!(
        "  {} {} stations to process",
        "Found".bright_green(),
        stations.len().to_string().bright_white().bold()
    );

    fs::create_dir_all(&args.data_dir)?;

    let progress = create_progress_bar(stations.len() as u64, "Backfilling");
    let mut stats = RunStats::default();

    for station in &stations {
        if cancel.is_cancelled() {
            break;
        }
        progress.set_message(station.label());
        stats.stations_processed += 1;

        match engine.backfill_station(station, &cancel).await {
            Ok(rows) => {
                stats.stations_updated += 1;
                stats.rows_added += rows;
                info!("station {}: {} rows written", station.id, rows);
            }
            Err(e @ RemError::NoUsableData { .. }) => {
                warn!("{e}");
                stats.record_skip(station.label(), "no usable data in range");
            }
            Err(e) => {
                error!("station {} failed: {e}", station.id);
                stats.record_skip(station.label(), e.to_string());
            }
        }
        progress.inc(1);
    }
    progress.finish_with_message("Backfill complete");

    print_summary("Backfill Summary", &stats, &args.data_dir);
    Ok(stats)
}

/// Incrementally update every existing per-station dataset
async fn run_update(args: UpdateArgs, cancel: CancellationToken) -> Result<RunStats> {
    setup_logging(args.verbose, args.quiet)?;

    let config = SyncConfig::default()
        .with_data_dir(&args.data_dir)
        .with_fallback_lookback_days(args.lookback_days);
    let engine = SyncEngine::new(config)?;

    let files = dataset_files(&args.data_dir)?;
    println!(
        "{} {} dataset files to review",
        "Found".bright_green(),
        files.len().to_string().bright_white().bold()
    );

    let progress = create_progress_bar(files.len() as u64, "Updating");
    let mut stats = RunStats::default();

    for path in &files {
        if cancel.is_cancelled() {
            break;
        }
        let label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        progress.set_message(label.clone());
        stats.stations_processed += 1;

        match engine.update_station(path, &cancel).await {
            Ok(0) => {
                info!("{}: up to date", label);
            }
            Ok(rows) => {
                stats.stations_updated += 1;
                stats.rows_added += rows;
                info!("{}: +{} rows", label, rows);
            }
            Err(e) => {
                error!("{} failed: {e}", label);
                stats.record_skip(label, e.to_string());
            }
        }
        progress.inc(1);
    }
    progress.finish_with_message("Update complete");

    print_summary("Update Summary", &stats, &args.data_dir);
    Ok(stats)
}

/// Discover and list the portal's qualifying stations
async fn run_stations(args: StationsArgs) -> Result<RunStats> {
    setup_logging(args.verbose, args.quiet)?;

    let engine = SyncEngine::new(SyncConfig::default())?;
    let stations = engine.discover_stations().await?;

    match args.format {
        OutputFormat::Json => {
            let encoded = serde_json::to_string_pretty(&stations).map_err(|e| {
                RemError::Configuration {
                    message: format!("failed to encode station list: {e}"),
                }
            })?;
            println!("{encoded}");
        }
        OutputFormat::Table => {
            println!("{}", "Qualifying stations".bright_green().bold());
            for station in &stations {
                println!("  {:>4}  {}  ({})", station.id, station.name, station.tag);
            }
            println!(
                "\n  {} {}",
                "Total:".bright_cyan(),
                stations.len().to_string().bright_white().bold()
            );
        }
    }

    Ok(RunStats {
        stations_processed: stations.len(),
        ..Default::default()
    })
}

/// The per-station CSV files of an existing archive, sorted.
///
/// Incremental mode never invents an archive: an absent directory, or one
/// with no station CSVs at all, is the run-fatal storage error.
fn dataset_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    if !data_dir.is_dir() {
        return Err(RemError::StorageMissing {
            path: data_dir.to_path_buf(),
        });
    }

    let mut files: Vec<PathBuf> = fs::read_dir(data_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();

    if files.is_empty() {
        warn!("no station CSV files in {}", data_dir.display());
        return Err(RemError::StorageMissing {
            path: data_dir.to_path_buf(),
        });
    }

    Ok(files)
}

/// Create a progress bar with the shared styling
fn create_progress_bar(total: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}

/// Print the end-of-run summary block
fn print_summary(title: &str, stats: &RunStats, data_dir: &Path) {
    println!("\n{}", title.bright_green().bold());
    println!(
        "  {} {}",
        "Stations processed:".bright_cyan(),
        stats.stations_processed.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Stations with new rows:".bright_cyan(),
        stats.stations_updated.to_string().bright_white()
    );
    println!(
        "  {} {}",
        "Rows added:".bright_cyan(),
        stats.rows_added.to_string().bright_white().bold()
    );
    println!(
        "  {} {}",
        "Data directory:".bright_cyan(),
        data_dir.display()
    );
    if !stats.skipped.is_empty() {
        println!(
            "  {} {}",
            "Skipped:".bright_yellow(),
            stats.skipped.len().to_string().bright_yellow().bold()
        );
        for skip in &stats.skipped {
            println!("    {} ({})", skip.label, skip.reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dataset_files_missing_directory_is_storage_error() {
        let dir = TempDir::new().unwrap();
        let absent = dir.path().join("no_such_dir");
        assert!(matches!(
            dataset_files(&absent),
            Err(RemError::StorageMissing { .. })
        ));
    }

    #[test]
    fn test_dataset_files_empty_directory_is_storage_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            dataset_files(dir.path()),
            Err(RemError::StorageMissing { .. })
        ));
    }

    #[test]
    fn test_dataset_files_lists_only_csvs_sorted() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("90_Dique.csv"), "x").unwrap();
        fs::write(dir.path().join("27_Merlo.csv"), "x").unwrap();
        fs::write(dir.path().join("notas.txt"), "x").unwrap();

        let files = dataset_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["27_Merlo.csv", "90_Dique.csv"]);
    }
}
