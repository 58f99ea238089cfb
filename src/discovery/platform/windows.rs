//! Registry-backed adapter source.

use windows_registry::{Key, LOCAL_MACHINE};

use crate::discovery::{AdapterSource, ClassEntry, DiscoveryError};

/// Device class namespace for network adapters.
const ADAPTER_CLASS_KEY: &str =
    r"SYSTEM\CurrentControlSet\Control\Class\{4D36E972-E325-11CE-BFC1-08002BE10318}";

/// Network connections namespace, keyed by instance id.
const NETWORK_CONNECTIONS_KEY: &str =
    r"SYSTEM\CurrentControlSet\Control\Network\{4D36E972-E325-11CE-BFC1-08002BE10318}";

/// Windows implementation of [`AdapterSource`] reading `HKEY_LOCAL_MACHINE`.
///
/// # Example
///
/// ```no_run
/// use tap_bridge::discovery::{AdapterLocator, DriverFamily, platform::RegistrySource};
///
/// let locator = AdapterLocator::new(RegistrySource::new(), DriverFamily::TapV9);
/// for listed in locator.candidates().expect("registry unavailable") {
///     println!("{}: {}", listed.ordinal, listed.candidate);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegistrySource {
    _private: (),
}

impl RegistrySource {
    /// Creates a new registry source.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl AdapterSource for RegistrySource {
    fn class_entries(&self) -> Result<Vec<ClassEntry>, DiscoveryError> {
        let class_key = LOCAL_MACHINE.open(ADAPTER_CLASS_KEY)?;

        let entries = class_key
            .keys()?
            .map(|key_name| read_entry(&class_key, key_name))
            .collect();

        Ok(entries)
    }

    fn connection_name(&self, instance_id: &str) -> Option<String> {
        let path = format!(r"{NETWORK_CONNECTIONS_KEY}\{instance_id}\Connection");

        LOCAL_MACHINE
            .open(path)
            .and_then(|key| key.get_string("Name"))
            .ok()
    }
}

/// Reads one class subkey. Unreadable subkeys yield an entry with no values.
fn read_entry(class_key: &Key, key_name: String) -> ClassEntry {
    match class_key.open(&key_name) {
        Ok(key) => ClassEntry {
            component_id: key.get_string("ComponentId").ok(),
            instance_id: key.get_string("NetCfgInstanceId").ok(),
            key_name,
        },
        Err(e) => {
            tracing::debug!("Could not open adapter class entry '{key_name}': {e}");
            ClassEntry {
                key_name,
                ..ClassEntry::default()
            }
        }
    }
}

/// Reads the persisted `TapDriver` flag from `HKLM\<settings_key>`.
///
/// Returns `None` when the key or value is absent.
#[must_use]
pub fn persisted_driver_flag(settings_key: &str) -> Option<u32> {
    LOCAL_MACHINE
        .open(settings_key)
        .and_then(|key| key.get_u32("TapDriver"))
        .ok()
}
