//! Error types for device access and session I/O.

use thiserror::Error;

/// Error type for a single device operation.
///
/// Describes what went wrong without dictating recovery strategy.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Windows API call failed.
    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    WindowsApi(#[from] windows::core::Error),

    /// Operating system I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame or buffer exceeds what a single request can carry.
    #[error("Buffer of {len} bytes is too large for a single request")]
    FrameTooLarge {
        /// Length of the rejected buffer.
        len: usize,
    },

    /// A control request returned fewer bytes than its reply requires.
    #[error("Control request {request} returned {actual} bytes, expected {expected}")]
    ShortReply {
        /// Name of the control request.
        request: &'static str,
        /// Minimum reply length.
        expected: usize,
        /// Bytes actually returned.
        actual: usize,
    },
}

/// Error type for frame reads and writes on an armed session.
///
/// Any I/O failure leaves the session's pending-operation state
/// untrustworthy, so the session refuses further I/O afterwards.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A read or write failed; the session is no longer usable.
    #[error("Device I/O failed, session is no longer usable: {0}")]
    Io(#[source] DeviceError),

    /// An earlier I/O failure made the session unusable.
    #[error("Session is unusable after an earlier I/O failure")]
    Poisoned,
}
