//! Validated configuration after merging CLI, TOML and persisted settings.
//!
//! This module contains the final, validated configuration that is used
//! by the application. All validation is performed during construction.

use std::fmt;
use std::path::Path;

use crate::discovery::DriverFamily;

use super::cli::Cli;
use super::defaults;
use super::error::ConfigError;
use super::toml::TomlConfig;

/// Where the active driver family came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverSource {
    /// `--driver` on the command line
    Cli,
    /// `adapter.driver` in the config file
    ConfigFile,
    /// The persisted `TapDriver` registry flag
    Persisted,
    /// Built-in default
    Default,
}

impl fmt::Display for DriverSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cli => "cli",
            Self::ConfigFile => "config file",
            Self::Persisted => "persisted setting",
            Self::Default => "default",
        })
    }
}

/// Fully validated configuration ready for use by the application.
///
/// # Construction
///
/// Use [`ValidatedConfig::from_raw`] to create from CLI args, an optional
/// TOML config and the persisted driver flag.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    /// Driver family the locator matches
    pub driver: DriverFamily,

    /// Origin of [`driver`](Self::driver)
    pub driver_source: DriverSource,

    /// Connection name tried first when opening
    pub adapter_name: String,

    /// Registry key holding the persisted driver flag
    pub settings_key: String,

    /// Read buffer size in bytes
    pub buffer_size: usize,

    /// Frame limit for watch mode; `None` means unlimited
    pub max_frames: Option<u64>,

    /// Verbose logging enabled
    pub verbose: bool,
}

impl fmt::Display for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let max_frames = self
            .max_frames
            .map_or_else(|| "unlimited".to_string(), |n| n.to_string());

        write!(
            f,
            "Config {{ driver: {} ({}), adapter_name: {}, buffer_size: {}, max_frames: {} }}",
            self.driver, self.driver_source, self.adapter_name, self.buffer_size, max_frames,
        )
    }
}

impl ValidatedConfig {
    /// Creates a validated configuration.
    ///
    /// `persisted_flag` is the `TapDriver` value read from the settings key,
    /// consulted only when neither CLI nor TOML selects a driver.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The TOML driver name is unknown
    /// - The adapter name is empty
    /// - The buffer size is out of range
    pub fn from_raw(
        cli: &Cli,
        toml: Option<&TomlConfig>,
        persisted_flag: Option<u32>,
    ) -> Result<Self, ConfigError> {
        let (driver, driver_source) = Self::resolve_driver(cli, toml, persisted_flag)?;
        let adapter_name = Self::resolve_adapter_name(cli, toml)?;
        let buffer_size = Self::resolve_buffer_size(cli, toml)?;

        let max_frames = cli
            .max_frames
            .or_else(|| toml.and_then(|t| t.watch.max_frames))
            .filter(|&n| n > 0);

        Ok(Self {
            driver,
            driver_source,
            adapter_name,
            settings_key: Self::resolve_settings_key(toml),
            buffer_size,
            max_frames,
            verbose: cli.verbose,
        })
    }

    /// Loads and merges configuration from CLI, config file and registry.
    ///
    /// If `cli.config` is set, loads the TOML file from that path. The
    /// persisted driver flag is only read when no driver was given.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The config file cannot be read or parsed
    /// - The merged configuration is invalid
    pub fn load(cli: &Cli) -> Result<Self, ConfigError> {
        let toml = if let Some(ref path) = cli.config {
            Some(TomlConfig::load(path)?)
        } else {
            None
        };

        let explicit = cli.driver.is_some()
            || toml.as_ref().is_some_and(|t| t.adapter.driver.is_some());

        let persisted_flag = if explicit {
            None
        } else {
            read_persisted_flag(&Self::resolve_settings_key(toml.as_ref()))
        };

        Self::from_raw(cli, toml.as_ref(), persisted_flag)
    }

    fn resolve_driver(
        cli: &Cli,
        toml: Option<&TomlConfig>,
        persisted_flag: Option<u32>,
    ) -> Result<(DriverFamily, DriverSource), ConfigError> {
        // CLI takes precedence
        if let Some(driver) = cli.driver {
            return Ok((driver.into(), DriverSource::Cli));
        }

        if let Some(value) = toml.and_then(|t| t.adapter.driver.as_deref()) {
            return Ok((parse_driver(value)?, DriverSource::ConfigFile));
        }

        Ok(persisted_flag.map_or(
            (DriverFamily::default(), DriverSource::Default),
            |flag| (DriverFamily::from_setting(flag), DriverSource::Persisted),
        ))
    }

    fn resolve_adapter_name(cli: &Cli, toml: Option<&TomlConfig>) -> Result<String, ConfigError> {
        let name = cli
            .adapter_name
            .as_deref()
            .or_else(|| toml.and_then(|t| t.adapter.name.as_deref()))
            .unwrap_or(defaults::ADAPTER_NAME);

        if name.trim().is_empty() {
            return Err(ConfigError::InvalidAdapterName);
        }

        Ok(name.to_string())
    }

    fn resolve_buffer_size(cli: &Cli, toml: Option<&TomlConfig>) -> Result<usize, ConfigError> {
        // Priority: CLI explicit > TOML > default
        let size = cli
            .buffer_size
            .or_else(|| toml.and_then(|t| t.watch.buffer_size))
            .unwrap_or(defaults::BUFFER_SIZE);

        if !(defaults::MIN_BUFFER_SIZE..=defaults::MAX_BUFFER_SIZE).contains(&size) {
            return Err(ConfigError::InvalidBufferSize {
                value: size,
                reason: format!(
                    "must be between {} and {} bytes",
                    defaults::MIN_BUFFER_SIZE,
                    defaults::MAX_BUFFER_SIZE
                ),
            });
        }

        Ok(size)
    }

    fn resolve_settings_key(toml: Option<&TomlConfig>) -> String {
        toml.and_then(|t| t.adapter.settings_key.clone())
            .unwrap_or_else(|| defaults::SETTINGS_KEY.to_string())
    }
}

/// Writes the default configuration template to a file.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let template = super::toml::default_config_template();
    std::fs::write(path, template).map_err(|e| ConfigError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    })
}

// Helper functions

fn parse_driver(s: &str) -> Result<DriverFamily, ConfigError> {
    match s.to_lowercase().as_str() {
        "tapoas" | "oas" => Ok(DriverFamily::TapOas),
        "tap0901" | "v9" | "tap-windows" => Ok(DriverFamily::TapV9),
        _ => Err(ConfigError::InvalidDriver {
            value: s.to_string(),
        }),
    }
}

#[cfg(windows)]
fn read_persisted_flag(settings_key: &str) -> Option<u32> {
    let flag = crate::discovery::platform::persisted_driver_flag(settings_key);
    tracing::debug!("Persisted driver flag under '{settings_key}': {flag:?}");
    flag
}

#[cfg(not(windows))]
const fn read_persisted_flag(_settings_key: &str) -> Option<u32> {
    None
}
