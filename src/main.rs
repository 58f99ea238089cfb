//! tap-bridge: TAP virtual Ethernet adapter bridge
//!
//! Entry point for the tap-bridge diagnostic tool.

use std::process::ExitCode;
use tap_bridge::config::{Cli, Command, ValidatedConfig, write_default_config};

mod app;
#[cfg_attr(not(windows), allow(dead_code))]
mod run;

use app::{config_hint, exit_code, failure_code, run_hint, setup_tracing};

/// Main entry point.
///
/// Excluded from coverage as it's the thin wrapper around testable components.
#[cfg(not(tarpaulin_include))]
fn main() -> ExitCode {
    let cli = Cli::parse_args();

    // Handle init subcommand
    if let Some(Command::Init { output }) = &cli.command {
        return handle_init(output);
    }

    // Load and validate configuration
    let config = match ValidatedConfig::load(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if let Some(hint) = config_hint(&e) {
                eprintln!("\n{hint}");
            }
            return exit_code::CONFIG_ERROR;
        }
    };

    setup_tracing(config.verbose);
    tracing::info!("{config}");

    let outcome = match cli.command {
        Some(Command::List { json }) => run::list(&config, json),
        _ => run_watch(config),
    };

    match outcome {
        Ok(()) => exit_code::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            if let Some(hint) = run_hint(&e) {
                eprintln!("\n{hint}");
            }
            ExitCode::from(failure_code(&e))
        }
    }
}

/// Handles the `init` subcommand.
fn handle_init(output: &std::path::Path) -> ExitCode {
    match write_default_config(output) {
        Ok(()) => {
            println!("Configuration template written to: {}", output.display());
            exit_code::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code::CONFIG_ERROR
        }
    }
}

/// Runs watch mode on a fresh runtime.
///
/// Excluded from coverage - requires async runtime.
#[cfg(not(tarpaulin_include))]
fn run_watch(config: ValidatedConfig) -> Result<(), run::RunError> {
    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    runtime.block_on(run::watch(config))
}
