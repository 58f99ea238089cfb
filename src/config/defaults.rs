//! Default values for configuration options.
//!
//! Centralized constants to avoid magic numbers scattered across the codebase.

/// Connection name of the adapter preferred by the open policy.
pub const ADAPTER_NAME: &str = "Lanemu";

/// Registry key under `HKEY_LOCAL_MACHINE` holding the persisted
/// driver-family flag.
pub const SETTINGS_KEY: &str = r"SOFTWARE\Lanemu";

/// Default read buffer size in bytes.
pub const BUFFER_SIZE: usize = 2048;

/// Smallest accepted read buffer (a minimal Ethernet frame is 60 bytes).
pub const MIN_BUFFER_SIZE: usize = 64;

/// Largest accepted read buffer.
pub const MAX_BUFFER_SIZE: usize = 65536;
