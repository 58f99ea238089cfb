//! Platform-specific device implementations.
//!
//! # Platform Support
//!
//! - **Windows**: Opens `\\.\Global\<id>.tap` with `CreateFileW` and drives
//!   it with overlapped `ReadFile` / `WriteFile` / `DeviceIoControl`.
//! - Other platforms have no TAP-Windows devices.

#[cfg(windows)]
mod windows;

#[cfg(windows)]
pub use windows::{TapCompletion, TapDevice, TapOpener};

// Re-export platform-specific opener as PlatformOpener for convenience
#[cfg(windows)]
pub use windows::TapOpener as PlatformOpener;
