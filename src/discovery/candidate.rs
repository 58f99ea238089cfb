//! Core discovery types: driver families and adapter candidates.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Virtual adapter driver family, identified by its registry `ComponentId`.
///
/// Exactly one family is active per process. It is resolved once during
/// configuration loading and handed to [`AdapterLocator`](super::AdapterLocator)
/// explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverFamily {
    /// The `tapoas` driver (OpenVPN "TAP-Win32 Adapter OAS").
    #[default]
    #[serde(rename = "tapoas")]
    TapOas,
    /// The `tap0901` driver (TAP-Windows V9).
    #[serde(rename = "tap0901")]
    TapV9,
}

impl DriverFamily {
    /// Returns the `ComponentId` registry value that identifies this family.
    #[must_use]
    pub const fn component_id(self) -> &'static str {
        match self {
            Self::TapOas => "tapoas",
            Self::TapV9 => "tap0901",
        }
    }

    /// Maps the persisted `TapDriver` flag onto a family.
    ///
    /// Any nonzero value selects [`DriverFamily::TapV9`].
    #[must_use]
    pub const fn from_setting(flag: u32) -> Self {
        if flag == 0 { Self::TapOas } else { Self::TapV9 }
    }
}

impl fmt::Display for DriverFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.component_id())
    }
}

/// A virtual adapter instance that matched the active driver family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterCandidate {
    /// Driver family identifier (`ComponentId`).
    pub component_id: String,
    /// Device identity (`NetCfgInstanceId`), e.g. `{3F6B...}`.
    pub instance_id: String,
    /// Connection name shown in the network settings, e.g. "Lanemu".
    pub friendly_name: String,
}

impl AdapterCandidate {
    /// Creates a new candidate.
    #[must_use]
    pub fn new(
        component_id: impl Into<String>,
        instance_id: impl Into<String>,
        friendly_name: impl Into<String>,
    ) -> Self {
        Self {
            component_id: component_id.into(),
            instance_id: instance_id.into(),
            friendly_name: friendly_name.into(),
        }
    }
}

impl fmt::Display for AdapterCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' ({} {})",
            self.friendly_name, self.component_id, self.instance_id
        )
    }
}

/// A candidate together with the skip value that selects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListedAdapter {
    /// Ordinal among family-matching entries.
    pub ordinal: usize,
    /// The resolved candidate.
    #[serde(flatten)]
    pub candidate: AdapterCandidate,
}
