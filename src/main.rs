use clap::Parser;
use rem_archiver::cli::{args::Args, commands};
use rem_archiver::RemError;
use std::process;
use tokio_util::sync::CancellationToken;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    // Create async runtime and run the main command logic with signal handling
    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    let result = runtime.block_on(async {
        // Cancellation token for coordinating graceful shutdown
        let cancellation_token = CancellationToken::new();

        let shutdown_signal = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install CTRL+C signal handler");
            cancellation_token.cancel();
        };

        tokio::select! {
            result = commands::run(args, cancellation_token.clone()) => {
                Some(result)
            }
            _ = shutdown_signal => {
                // every append already committed stays valid; the next run
                // simply refetches the months this one never reached
                None
            }
        }
    });

    match result {
        Some(Ok(_stats)) => {
            // Success - the summary has already been printed by the command
            process::exit(0);
        }
        Some(Err(error)) => {
            eprintln!("Error: {}", error);
            let code = match error {
                RemError::StorageMissing { .. } => 2,
                _ => 1,
            };
            process::exit(code);
        }
        None => {
            eprintln!("\nInterrupted by user.");
            process::exit(130);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("REM Archiver - San Luis Weather Station Downloader");
    println!("==================================================");
    println!();
    println!("Build and incrementally maintain one CSV dataset per weather station");
    println!("of the San Luis REM climate portal.");
    println!();
    println!("USAGE:");
    println!("    rem-archiver <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    backfill    Download the full historical record for every station");
    println!("    update      Incrementally update the existing per-station datasets");
    println!("    stations    Discover and list the portal's qualifying stations");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!();
    println!("EXAMPLES:");
    println!("    # Build the full archive into ./datos_masivos:");
    println!("    rem-archiver backfill");
    println!();
    println!("    # Bring an existing archive up to date:");
    println!("    rem-archiver update --data-dir /srv/rem/datos_masivos");
    println!();
    println!("    # List the stations the portal currently publishes:");
    println!("    rem-archiver stations --format json");
    println!();
    println!("For detailed help on any command, use:");
    println!("    rem-archiver <COMMAND> --help");
}
