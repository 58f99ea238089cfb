//! Device sessions over a TAP adapter and the synchronous I/O bridge.
//!
//! This module provides:
//! - The overlapped I/O model ([`OverlappedDevice`], [`Submission`])
//! - Device opening ([`DeviceOpener`], [`device_path`])
//! - The armed session with blocking `read` / fire-and-forget `write`
//!   ([`DeviceSession`])
//! - TAP control requests and the adapter properties they report
//! - Platform-specific implementations ([`platform`])
//!
//! # Read/Write Asymmetry
//!
//! `read` blocks until a frame has been delivered. `write` only blocks while
//! the *previous* write is still in flight, then submits the new frame and
//! returns without waiting for it.

mod control;
mod error;
mod info;
pub mod platform;
mod session;

#[cfg(test)]
pub(crate) mod test_fixtures;

pub use control::{TapControl, ctl_code};
pub use error::{DeviceError, SessionError};
pub use info::{DriverVersion, MacAddress};
pub use session::DeviceSession;

/// Prefix of the user-mode device path of a TAP adapter.
pub const DEVICE_PATH_PREFIX: &str = r"\\.\Global\";

/// Suffix of the user-mode device path of a TAP adapter.
pub const DEVICE_PATH_SUFFIX: &str = ".tap";

/// Returns the device path for an adapter instance id.
///
/// # Example
///
/// ```
/// use tap_bridge::device::device_path;
///
/// assert_eq!(device_path("{ABC}"), r"\\.\Global\{ABC}.tap");
/// ```
#[must_use]
pub fn device_path(instance_id: &str) -> String {
    format!("{DEVICE_PATH_PREFIX}{instance_id}{DEVICE_PATH_SUFFIX}")
}

/// Immediate outcome of submitting an overlapped request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The request finished synchronously, transferring this many bytes.
    Completed(usize),
    /// The request is in flight; its completion object will be signaled.
    Pending,
}

/// An opened device that supports overlapped (asynchronous) I/O.
///
/// Each direction owns one [`Completion`](Self::Completion): the OS
/// synchronization object plus the pending-operation descriptor bound to it.
/// A completion carries at most one request at a time.
///
/// # Design
///
/// - The Windows implementation wraps a device handle, events and `OVERLAPPED`
/// - Tests use a scripted in-memory device
pub trait OverlappedDevice: Send + Sync {
    /// Per-direction completion object and operation descriptor.
    type Completion: Send;

    /// Allocates a completion object, with its descriptor offset fixed at zero.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the OS object cannot be created.
    fn completion(&self) -> Result<Self::Completion, DeviceError>;

    /// Issues a control request and waits for its reply.
    ///
    /// Returns the number of bytes written into `output`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the driver rejects the request.
    fn control(
        &self,
        request: TapControl,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, DeviceError>;

    /// Submits a read into `buffer` bound to `completion`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the request could not be submitted.
    ///
    /// # Safety
    ///
    /// When [`Submission::Pending`] is returned, `buffer` and `completion`
    /// must stay alive, unmoved and untouched until [`poll`](Self::poll)
    /// reports the request finished or [`cancel`](Self::cancel) returns `Ok`.
    unsafe fn start_read(
        &self,
        completion: &mut Self::Completion,
        buffer: &mut [u8],
    ) -> Result<Submission, DeviceError>;

    /// Submits a write of `frame` bound to `completion`.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the request could not be submitted.
    ///
    /// # Safety
    ///
    /// Same contract as [`start_read`](Self::start_read), applied to `frame`.
    unsafe fn start_write(
        &self,
        completion: &mut Self::Completion,
        frame: &[u8],
    ) -> Result<Submission, DeviceError>;

    /// Non-blocking check of the request bound to `completion`.
    ///
    /// Returns `Some(bytes)` once finished and `None` while still incomplete.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the request finished with a failure.
    fn poll(&self, completion: &mut Self::Completion) -> Result<Option<usize>, DeviceError>;

    /// Blocks the calling thread until `completion` is signaled. No timeout.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the wait itself fails.
    fn wait(&self, completion: &Self::Completion) -> Result<(), DeviceError>;

    /// Cancels the request bound to `completion` and waits until the OS no
    /// longer references its buffer.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if cancellation could not be confirmed.
    fn cancel(&self, completion: &mut Self::Completion) -> Result<(), DeviceError>;
}

/// Opens devices by path.
pub trait DeviceOpener: Send + Sync {
    /// The device type produced by this opener.
    type Device: OverlappedDevice;

    /// Opens `path` exclusively for overlapped reading and writing.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the device is missing, in use, or access is
    /// denied.
    fn open(&self, path: &str) -> Result<Self::Device, DeviceError>;
}
