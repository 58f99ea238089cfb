//! Virtual adapter discovery.
//!
//! This module provides:
//! - Driver family selection ([`DriverFamily`])
//! - Adapter candidates ([`AdapterCandidate`], [`ListedAdapter`])
//! - The configuration-store abstraction ([`AdapterSource`])
//! - Candidate selection by skip-count and name ([`AdapterLocator`])
//! - Platform-specific sources ([`platform`])

mod candidate;
mod locator;
pub mod platform;
mod source;

#[cfg(test)]
mod locator_tests;
#[cfg(test)]
pub(crate) mod test_fixtures;

pub use candidate::{AdapterCandidate, DriverFamily, ListedAdapter};
pub use locator::AdapterLocator;
pub use source::{AdapterSource, ClassEntry, DiscoveryError};
