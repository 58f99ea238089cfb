//! TOML configuration file parsing.
//!
//! Defines the structure of the configuration file with serde.

use std::path::Path;

use serde::Deserialize;

use super::ConfigError;

/// Root configuration structure from TOML file.
///
/// All fields are optional to allow partial configuration
/// that can be merged with CLI arguments.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TomlConfig {
    /// Adapter selection section
    #[serde(default)]
    pub adapter: AdapterSection,

    /// Watch mode section
    #[serde(default)]
    pub watch: WatchSection,
}

/// Adapter selection section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterSection {
    /// Driver family: "tapoas" or "tap0901"
    pub driver: Option<String>,

    /// Connection name of the preferred adapter
    pub name: Option<String>,

    /// Registry key holding the persisted `TapDriver` flag
    pub settings_key: Option<String>,
}

/// Watch mode section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchSection {
    /// Read buffer size in bytes
    pub buffer_size: Option<usize>,

    /// Stop after this many frames (0 = unlimited)
    pub max_frames: Option<u64>,
}

impl TomlConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }
}

/// Generates a default configuration file with comments.
#[must_use]
pub fn default_config_template() -> String {
    r#"# tap-bridge Configuration File

[adapter]
# TAP driver family to match (default: the persisted setting, else tapoas)
# Accepted values: "tapoas"/"oas", "tap0901"/"v9"/"tap-windows"
# driver = "tapoas"

# Connection name of the preferred adapter (default: Lanemu)
# Other adapters of the same family are tried if this one is missing or busy.
name = "Lanemu"

# Registry key under HKEY_LOCAL_MACHINE holding the persisted TapDriver flag
# settings_key = 'SOFTWARE\Lanemu'

[watch]
# Read buffer size in bytes (default: 2048, range 64-65536)
buffer_size = 2048

# Stop after this many frames (default: 0 = unlimited)
# max_frames = 0
"#
    .to_string()
}
