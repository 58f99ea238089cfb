//! Return codes and session tokens handed across the boundary.

use std::fmt;

use serde::Serialize;

use super::BridgeError;

/// Outcome code of an open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i32)]
pub enum OpenStatus {
    /// A session was opened.
    Ok = 0,
    /// No adapter of the active driver family exists.
    NotFound = 1,
    /// Adapters exist but none could be opened.
    OpenError = 2,
}

impl OpenStatus {
    /// Returns the numeric code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Returns the code describing `result`.
    #[must_use]
    pub fn of<T>(result: &Result<T, BridgeError>) -> Self {
        match result {
            Ok(_) => Self::Ok,
            Err(e) => e.status(),
        }
    }
}

impl fmt::Display for OpenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "Ok",
            Self::NotFound => "NotFound",
            Self::OpenError => "OpenError",
        };
        write!(f, "{name} ({})", self.code())
    }
}

/// Opaque identifier of an open session.
///
/// Minted by [`TapBridge::open`](super::TapBridge::open); never reused
/// within one bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl SessionToken {
    /// Wraps a raw value received back from the embedding caller.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value to hand to the embedding caller.
    #[must_use]
    pub const fn into_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Result of a successful open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    /// Token for later read, write and close calls.
    pub token: SessionToken,
    /// Connection name of the adapter that was opened.
    pub adapter_name: String,
}
