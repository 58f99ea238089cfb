//! tap-bridge: TAP virtual Ethernet adapter bridge
//!
//! A library for locating a TAP-Windows virtual adapter, opening it,
//! and exchanging raw Ethernet frames with it through a synchronous
//! read/write interface.

pub mod bridge;
pub mod config;
pub mod device;
pub mod discovery;
pub mod frame;
