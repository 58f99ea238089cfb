//! CLI argument parsing using clap.
//!
//! Defines the command-line interface with all options and subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::discovery::DriverFamily;

/// tap-bridge: TAP virtual Ethernet adapter bridge
///
/// Locates a TAP-Windows adapter, opens it, and reports the Ethernet
/// frames it delivers. Without a subcommand, watches frames until Ctrl+C.
#[derive(Debug, Parser)]
#[command(name = "tap-bridge")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Option<Command>,

    /// TAP driver family to match
    #[arg(long, value_enum, ignore_case = true, global = true)]
    pub driver: Option<DriverArg>,

    /// Connection name of the preferred adapter
    #[arg(long = "adapter-name", global = true)]
    pub adapter_name: Option<String>,

    /// Read buffer size in bytes
    #[arg(long = "buffer-size")]
    pub buffer_size: Option<usize>,

    /// Stop watching after this many frames (0 = unlimited)
    #[arg(long = "max-frames")]
    pub max_frames: Option<u64>,

    /// Path to configuration file
    #[arg(long, short, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

/// Subcommands for tap-bridge
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a default configuration file
    Init {
        /// Output path for the configuration file
        #[arg(long, short, default_value = "tap-bridge.toml")]
        output: PathBuf,
    },

    /// List adapters of the selected driver family
    List {
        /// Print the list as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Driver family argument for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DriverArg {
    /// The tapoas driver
    #[value(name = "tapoas", alias = "oas")]
    TapOas,
    /// The tap0901 driver (TAP-Windows V9)
    #[value(name = "tap0901", aliases = ["v9", "tap-windows"])]
    TapV9,
}

impl From<DriverArg> for DriverFamily {
    fn from(arg: DriverArg) -> Self {
        match arg {
            DriverArg::TapOas => Self::TapOas,
            DriverArg::TapV9 => Self::TapV9,
        }
    }
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Parses CLI arguments from an iterator (useful for testing).
    pub fn parse_from_iter<I, T>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::parse_from(iter)
    }
}
