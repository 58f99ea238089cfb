//! Shared test fixtures for discovery tests.

use std::collections::HashMap;

use super::{AdapterSource, ClassEntry, DiscoveryError};

/// In-memory adapter source with a fixed enumeration order.
#[derive(Debug, Default)]
pub struct StaticSource {
    entries: Vec<ClassEntry>,
    names: HashMap<String, String>,
    fail: bool,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose namespace cannot be read.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Adds a device entry with a connection name.
    pub fn with_adapter(
        mut self,
        key: &str,
        component_id: &str,
        instance_id: &str,
        name: &str,
    ) -> Self {
        self.entries
            .push(ClassEntry::new(key, component_id, instance_id));
        self.names.insert(instance_id.to_string(), name.to_string());
        self
    }

    /// Adds a device entry without a recorded connection name.
    pub fn with_unnamed(mut self, key: &str, component_id: &str, instance_id: &str) -> Self {
        self.entries
            .push(ClassEntry::new(key, component_id, instance_id));
        self
    }

    /// Adds a raw entry as-is.
    pub fn with_entry(mut self, entry: ClassEntry) -> Self {
        self.entries.push(entry);
        self
    }
}

impl AdapterSource for StaticSource {
    fn class_entries(&self) -> Result<Vec<ClassEntry>, DiscoveryError> {
        if self.fail {
            return Err(DiscoveryError::Source {
                message: "class namespace unavailable".to_string(),
            });
        }
        Ok(self.entries.clone())
    }

    fn connection_name(&self, instance_id: &str) -> Option<String> {
        self.names.get(instance_id).cloned()
    }
}
