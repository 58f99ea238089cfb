//! Configuration-store abstraction behind adapter discovery.

use thiserror::Error;

use super::DriverFamily;

/// Error type for discovery operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// No adapter of the active driver family satisfied the request.
    #[error("No {family} adapter found")]
    NotFound {
        /// The family that was searched for.
        family: DriverFamily,
    },

    /// Registry access failed.
    #[cfg(windows)]
    #[error("Registry error: {0}")]
    Registry(#[from] windows::core::Error),

    /// Source-specific failure with a generic message.
    #[error("Adapter source error: {message}")]
    Source {
        /// Description of the failure.
        message: String,
    },
}

impl DiscoveryError {
    /// Returns true if this error means "nothing matched" rather than a failure.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// One entry under the adapter class namespace, in enumeration order.
///
/// Values that could not be read are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassEntry {
    /// Subkey name, e.g. `0007`.
    pub key_name: String,
    /// The `ComponentId` value.
    pub component_id: Option<String>,
    /// The `NetCfgInstanceId` value.
    pub instance_id: Option<String>,
}

impl ClassEntry {
    /// Creates an entry with both values present.
    #[must_use]
    pub fn new(
        key_name: impl Into<String>,
        component_id: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            key_name: key_name.into(),
            component_id: Some(component_id.into()),
            instance_id: Some(instance_id.into()),
        }
    }
}

/// Read-only view of the configuration store that describes adapters.
///
/// # Design
///
/// - The registry implementation lives in [`platform`](super::platform)
/// - Tests inject an ordered in-memory list instead
pub trait AdapterSource: Send + Sync {
    /// Lists every entry of the adapter class namespace in enumeration order,
    /// including non-device entries.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError`] when the namespace itself cannot be read.
    fn class_entries(&self) -> Result<Vec<ClassEntry>, DiscoveryError>;

    /// Resolves the connection name for an instance id, if one is recorded.
    fn connection_name(&self, instance_id: &str) -> Option<String>;
}

impl<T: AdapterSource + ?Sized> AdapterSource for &T {
    fn class_entries(&self) -> Result<Vec<ClassEntry>, DiscoveryError> {
        (**self).class_entries()
    }

    fn connection_name(&self, instance_id: &str) -> Option<String> {
        (**self).connection_name(instance_id)
    }
}
