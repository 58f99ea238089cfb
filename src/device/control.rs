//! TAP driver control requests.

use super::DeviceError;
use super::info::{DriverVersion, MacAddress};

/// `FILE_DEVICE_UNKNOWN` from `winioctl.h`.
const FILE_DEVICE_UNKNOWN: u32 = 0x0000_0022;
/// `METHOD_BUFFERED` from `winioctl.h`.
const METHOD_BUFFERED: u32 = 0;
/// `FILE_ANY_ACCESS` from `winioctl.h`.
const FILE_ANY_ACCESS: u32 = 0;

/// Equivalent of the `CTL_CODE` macro.
#[must_use]
pub const fn ctl_code(device_type: u32, function: u32, method: u32, access: u32) -> u32 {
    (device_type << 16) | (access << 14) | (function << 2) | method
}

/// Control requests understood by both TAP driver families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TapControl {
    /// Read the adapter's MAC address (6 bytes).
    GetMac,
    /// Read the driver version (three `u32`: major, minor, debug).
    GetVersion,
    /// Read the adapter MTU (one `u32`).
    GetMtu,
    /// Set the link state (one `u32`, nonzero = connected).
    SetMediaStatus,
}

impl TapControl {
    /// Request number passed to `CTL_CODE`.
    const fn function(self) -> u32 {
        match self {
            Self::GetMac => 1,
            Self::GetVersion => 2,
            Self::GetMtu => 3,
            Self::SetMediaStatus => 6,
        }
    }

    /// Returns the device I/O control code for this request.
    #[must_use]
    pub const fn code(self) -> u32 {
        ctl_code(
            FILE_DEVICE_UNKNOWN,
            self.function(),
            METHOD_BUFFERED,
            FILE_ANY_ACCESS,
        )
    }

    /// Short request name for diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GetMac => "GET_MAC",
            Self::GetVersion => "GET_VERSION",
            Self::GetMtu => "GET_MTU",
            Self::SetMediaStatus => "SET_MEDIA_STATUS",
        }
    }
}

/// Input payload for [`TapControl::SetMediaStatus`].
#[must_use]
pub fn media_status_payload(connected: bool) -> [u8; 4] {
    u32::from(connected).to_le_bytes()
}

fn require(request: TapControl, reply: &[u8], expected: usize) -> Result<(), DeviceError> {
    if reply.len() < expected {
        return Err(DeviceError::ShortReply {
            request: request.name(),
            expected,
            actual: reply.len(),
        });
    }
    Ok(())
}

fn le_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(word)
}

/// Parses a [`TapControl::GetMac`] reply.
///
/// # Errors
///
/// Returns [`DeviceError::ShortReply`] if fewer than 6 bytes were returned.
pub fn parse_mac(reply: &[u8]) -> Result<MacAddress, DeviceError> {
    require(TapControl::GetMac, reply, 6)?;
    let mut octets = [0u8; 6];
    octets.copy_from_slice(&reply[..6]);
    Ok(MacAddress::new(octets))
}

/// Parses a [`TapControl::GetVersion`] reply.
///
/// # Errors
///
/// Returns [`DeviceError::ShortReply`] if fewer than 12 bytes were returned.
pub fn parse_version(reply: &[u8]) -> Result<DriverVersion, DeviceError> {
    require(TapControl::GetVersion, reply, 12)?;
    Ok(DriverVersion {
        major: le_u32(&reply[0..4]),
        minor: le_u32(&reply[4..8]),
        debug: le_u32(&reply[8..12]) != 0,
    })
}

/// Parses a [`TapControl::GetMtu`] reply.
///
/// # Errors
///
/// Returns [`DeviceError::ShortReply`] if fewer than 4 bytes were returned.
pub fn parse_mtu(reply: &[u8]) -> Result<u32, DeviceError> {
    require(TapControl::GetMtu, reply, 4)?;
    Ok(le_u32(reply))
}
