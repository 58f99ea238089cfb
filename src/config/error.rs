//! Error types for configuration parsing and validation.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for configuration operations.
///
/// Covers errors from parsing, validation, and file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{}': {source}", path.display())]
    FileRead {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to write configuration file (for init command).
    #[error("Failed to write config file '{}': {source}", path.display())]
    FileWrite {
        /// Path to the config file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid driver family value.
    #[error("Invalid driver '{value}': expected tapoas or tap0901")]
    InvalidDriver {
        /// The invalid value provided
        value: String,
    },

    /// The expected adapter name is empty.
    #[error("Adapter name must not be empty")]
    InvalidAdapterName,

    /// Read buffer size out of range.
    #[error("Invalid buffer size {value}: {reason}")]
    InvalidBufferSize {
        /// The rejected size
        value: usize,
        /// Reason for invalidity
        reason: String,
    },
}
