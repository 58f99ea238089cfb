//! Startup support for the binary: exit codes, hints, logging.

use tap_bridge::bridge::{BridgeError, OpenStatus};
use tap_bridge::config::{ConfigError, defaults};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::run::RunError;

/// Process exit codes.
///
/// Open failures get their own codes so scripts can tell a missing adapter
/// from one that exists but could not be opened.
pub mod exit_code {
    use std::process::ExitCode;

    pub const SUCCESS: ExitCode = ExitCode::SUCCESS;

    /// Invalid arguments or configuration file.
    pub const CONFIG_ERROR: ExitCode = ExitCode::FAILURE;

    pub const RUNTIME_ERROR: u8 = 2;
    pub const ADAPTER_NOT_FOUND: u8 = 3;
    pub const ADAPTER_OPEN_FAILED: u8 = 4;
}

/// Picks the exit code for a failed `list` or watch run.
pub fn failure_code(error: &RunError) -> u8 {
    match error {
        RunError::Open(e) => match e.status() {
            OpenStatus::NotFound => exit_code::ADAPTER_NOT_FOUND,
            OpenStatus::Ok | OpenStatus::OpenError => exit_code::ADAPTER_OPEN_FAILED,
        },
        _ => exit_code::RUNTIME_ERROR,
    }
}

/// Follow-up advice for a configuration error, if there is any.
pub fn config_hint(error: &ConfigError) -> Option<String> {
    match error {
        ConfigError::FileRead { .. } => {
            Some("Run 'tap-bridge init' to generate a configuration template.".to_string())
        }
        ConfigError::InvalidDriver { .. } => {
            Some("Accepted drivers: tapoas (oas), tap0901 (v9, tap-windows).".to_string())
        }
        ConfigError::InvalidBufferSize { .. } => Some(format!(
            "Pick a buffer size between {} and {} bytes.",
            defaults::MIN_BUFFER_SIZE,
            defaults::MAX_BUFFER_SIZE
        )),
        _ => None,
    }
}

/// Follow-up advice for a failed run, if there is any.
pub fn run_hint(error: &RunError) -> Option<&'static str> {
    match error {
        RunError::Open(BridgeError::NotFound { .. }) => Some(
            "Check that the TAP driver is installed, or select the other family with --driver.",
        ),
        RunError::Open(BridgeError::OpenFailed { .. }) => {
            Some("The adapter may be in use by another program, or may need administrator rights.")
        }
        _ => None,
    }
}

/// Installs the tracing subscriber. `RUST_LOG` overrides the default level.
pub fn setup_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
