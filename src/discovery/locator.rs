//! Selection of adapter candidates by skip-count and name.

use super::{AdapterCandidate, AdapterSource, ClassEntry, DiscoveryError, DriverFamily, ListedAdapter};

/// Subkeys of the adapter class namespace that are not device instances.
const RESERVED_KEYS: [&str; 2] = ["Configuration", "Properties"];

/// Finds virtual adapter instances of one driver family.
///
/// The family is fixed at construction; the locator never consults
/// process-wide settings on its own.
///
/// # Example
///
/// ```ignore
/// let locator = AdapterLocator::new(source, DriverFamily::TapV9);
///
/// // Prefer the adapter named "Lanemu", fall back to the first usable one.
/// let candidate = locator
///     .locate(0, Some("Lanemu"))
///     .or_else(|_| locator.locate(0, None))?;
/// ```
#[derive(Debug, Clone)]
pub struct AdapterLocator<S> {
    source: S,
    family: DriverFamily,
}

impl<S: AdapterSource> AdapterLocator<S> {
    /// Creates a locator over `source` that matches `family` only.
    #[must_use]
    pub const fn new(source: S, family: DriverFamily) -> Self {
        Self { source, family }
    }

    /// Returns the driver family this locator matches.
    #[must_use]
    pub const fn family(&self) -> DriverFamily {
        self.family
    }

    /// Selects a candidate.
    ///
    /// The first `skip` family-matching entries are passed over regardless of
    /// their names. Among the remaining entries, the first one with a
    /// resolvable connection name equal to `exact_name` (or any name when
    /// `exact_name` is `None`) is returned.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::NotFound`] if enumeration ends without a
    /// selection, or the source's error if the namespace cannot be read.
    pub fn locate(
        &self,
        skip: usize,
        exact_name: Option<&str>,
    ) -> Result<AdapterCandidate, DiscoveryError> {
        let mut remaining = skip;

        for entry in self.family_entries()? {
            if remaining > 0 {
                remaining -= 1;
                tracing::debug!("Skipping {} entry '{}'", self.family, entry.key_name);
                continue;
            }

            let Some(candidate) = self.resolve(&entry) else {
                continue;
            };

            if let Some(wanted) = exact_name {
                if candidate.friendly_name != wanted {
                    tracing::debug!(
                        "Adapter '{}' does not match expected name '{wanted}'",
                        candidate.friendly_name
                    );
                    continue;
                }
            }

            tracing::debug!("Selected adapter {candidate}");
            return Ok(candidate);
        }

        Err(DiscoveryError::NotFound {
            family: self.family,
        })
    }

    /// Lists every family-matching adapter with a resolvable name.
    ///
    /// Each entry carries the skip value under which
    /// [`locate`](Self::locate) would select it with no name filter.
    ///
    /// # Errors
    ///
    /// Returns the source's error if the namespace cannot be read.
    pub fn candidates(&self) -> Result<Vec<ListedAdapter>, DiscoveryError> {
        let listed = self
            .family_entries()?
            .iter()
            .enumerate()
            .filter_map(|(ordinal, entry)| {
                self.resolve(entry)
                    .map(|candidate| ListedAdapter { ordinal, candidate })
            })
            .collect();

        Ok(listed)
    }

    /// Device entries whose `ComponentId` equals the active family, in order.
    fn family_entries(&self) -> Result<Vec<ClassEntry>, DiscoveryError> {
        let component_id = self.family.component_id();

        let entries = self
            .source
            .class_entries()?
            .into_iter()
            .filter(|entry| !RESERVED_KEYS.contains(&entry.key_name.as_str()))
            .filter(|entry| entry.component_id.as_deref() == Some(component_id))
            .collect();

        Ok(entries)
    }

    /// Builds a candidate from an entry, or `None` if its identity or
    /// connection name is missing.
    fn resolve(&self, entry: &ClassEntry) -> Option<AdapterCandidate> {
        let instance_id = entry.instance_id.as_deref().filter(|id| !id.is_empty())?;

        let Some(friendly_name) = self.source.connection_name(instance_id) else {
            tracing::debug!("No connection name recorded for {instance_id}");
            return None;
        };

        Some(AdapterCandidate::new(
            self.family.component_id(),
            instance_id,
            friendly_name,
        ))
    }
}
