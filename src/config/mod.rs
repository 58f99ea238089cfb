//! Configuration layer for tap-bridge.
//!
//! This module provides:
//! - CLI argument parsing ([`Cli`], [`Command`])
//! - TOML configuration file parsing ([`TomlConfig`])
//! - Validated configuration ([`ValidatedConfig`])
//! - Configuration file generation ([`write_default_config`])
//! - Default values ([`defaults`])
//!
//! # Priority
//!
//! Configuration values are resolved with the following priority (highest to lowest):
//!
//! 1. **Explicit CLI arguments** - Values explicitly passed via command line
//! 2. **TOML config file** - Values from the configuration file
//! 3. **Persisted setting** - The `TapDriver` registry flag (driver family only)
//! 4. **Built-in defaults** - Hardcoded default values
//!
//! # Driver Family
//!
//! The driver family is resolved once here and handed to the adapter
//! locator explicitly. Nothing downstream reads the persisted flag again.

mod cli;
pub mod defaults;
mod error;
mod toml;
mod validated;

#[cfg(test)]
mod validated_tests;

pub use cli::{Cli, Command, DriverArg};
pub use error::ConfigError;
pub use toml::{AdapterSection, TomlConfig, WatchSection, default_config_template};
pub use validated::{DriverSource, ValidatedConfig, write_default_config};
