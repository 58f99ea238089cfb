//! Platform-specific adapter source implementations.
//!
//! # Platform Support
//!
//! - **Windows**: Reads the adapter class and network connection namespaces
//!   of the registry via the `windows-registry` crate.
//! - Other platforms have no TAP driver families to discover.

#[cfg(windows)]
mod windows;

#[cfg(windows)]
pub use windows::{RegistrySource, persisted_driver_flag};

// Re-export platform-specific source as PlatformSource for convenience
#[cfg(windows)]
pub use windows::RegistrySource as PlatformSource;
