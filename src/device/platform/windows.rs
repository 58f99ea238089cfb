//! Windows TAP device access using overlapped file I/O.

use std::ffi::c_void;

use windows::Win32::Foundation::{
    CloseHandle, ERROR_IO_INCOMPLETE, ERROR_IO_PENDING, ERROR_NOT_FOUND, GENERIC_READ,
    GENERIC_WRITE, HANDLE, WAIT_OBJECT_0,
};
use windows::Win32::Storage::FileSystem::{
    CreateFileW, FILE_ATTRIBUTE_SYSTEM, FILE_FLAG_OVERLAPPED, FILE_SHARE_MODE, OPEN_EXISTING,
    ReadFile, WriteFile,
};
use windows::Win32::System::IO::{CancelIoEx, DeviceIoControl, GetOverlappedResult, OVERLAPPED};
use windows::Win32::System::Threading::{CreateEventW, INFINITE, WaitForSingleObject};
use windows::core::{HSTRING, PCWSTR};

use crate::device::{DeviceError, DeviceOpener, OverlappedDevice, Submission, TapControl};

/// RAII wrapper closing a kernel handle on drop.
#[derive(Debug)]
struct OwnedHandle(HANDLE);

// SAFETY: Kernel handles are process-wide and usable from any thread.
unsafe impl Send for OwnedHandle {}
// SAFETY: See above; all operations on the handle are thread-safe syscalls.
unsafe impl Sync for OwnedHandle {}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        // SAFETY: We own the handle and close it exactly once.
        let _ = unsafe { CloseHandle(self.0) };
    }
}

impl OwnedHandle {
    /// Creates a manual-reset, initially non-signaled event.
    fn event() -> Result<Self, DeviceError> {
        // SAFETY: No security attributes and no name; the returned handle is owned.
        let handle = unsafe { CreateEventW(None, true, false, PCWSTR::null())? };
        Ok(Self(handle))
    }
}

/// Opens TAP devices with `CreateFileW`.
#[derive(Debug, Clone, Default)]
pub struct TapOpener {
    _private: (),
}

impl TapOpener {
    /// Creates a new opener.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl DeviceOpener for TapOpener {
    type Device = TapDevice;

    fn open(&self, path: &str) -> Result<TapDevice, DeviceError> {
        let wide = HSTRING::from(path);

        // SAFETY: `wide` outlives the call; the returned handle is owned.
        let handle = unsafe {
            CreateFileW(
                &wide,
                (GENERIC_READ | GENERIC_WRITE).0,
                FILE_SHARE_MODE(0),
                None,
                OPEN_EXISTING,
                FILE_ATTRIBUTE_SYSTEM | FILE_FLAG_OVERLAPPED,
                None,
            )?
        };

        Ok(TapDevice {
            handle: OwnedHandle(handle),
        })
    }
}

/// An open TAP device handle.
#[derive(Debug)]
pub struct TapDevice {
    handle: OwnedHandle,
}

/// Overlapped descriptor bound to its own event.
///
/// The descriptor is boxed so its address stays fixed while a request is
/// in flight, even if the completion itself is moved.
pub struct TapCompletion {
    overlapped: Box<OVERLAPPED>,
    event: OwnedHandle,
}

// SAFETY: The descriptor is only accessed through `&mut` or by the kernel.
unsafe impl Send for TapCompletion {}

impl TapCompletion {
    fn new() -> Result<Self, DeviceError> {
        let event = OwnedHandle::event()?;
        let overlapped = Box::new(OVERLAPPED {
            hEvent: event.0,
            ..OVERLAPPED::default()
        });
        Ok(Self { overlapped, event })
    }

    /// Rebinds the descriptor for a new request at offset zero.
    fn rearm(&mut self) -> *mut OVERLAPPED {
        *self.overlapped = OVERLAPPED {
            hEvent: self.event.0,
            ..OVERLAPPED::default()
        };
        &raw mut *self.overlapped
    }
}

/// Converts a buffer length to the width the I/O calls accept.
fn request_len(len: usize) -> Result<u32, DeviceError> {
    u32::try_from(len).map_err(|_| DeviceError::FrameTooLarge { len })
}

impl TapDevice {
    fn raw(&self) -> HANDLE {
        self.handle.0
    }

    /// Maps the immediate result of `ReadFile` / `WriteFile`.
    fn submitted(
        &self,
        result: windows::core::Result<()>,
        completion: &mut TapCompletion,
    ) -> Result<Submission, DeviceError> {
        match result {
            Ok(()) => Ok(Submission::Completed(
                self.poll(completion)?.unwrap_or_default(),
            )),
            Err(e) if e.code() == ERROR_IO_PENDING.to_hresult() => Ok(Submission::Pending),
            Err(e) => Err(e.into()),
        }
    }
}

impl OverlappedDevice for TapDevice {
    type Completion = TapCompletion;

    fn completion(&self) -> Result<TapCompletion, DeviceError> {
        TapCompletion::new()
    }

    fn control(
        &self,
        request: TapControl,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, DeviceError> {
        let input_len = request_len(input.len())?;
        let output_len = request_len(output.len())?;

        let mut completion = TapCompletion::new()?;
        let overlapped = completion.rearm();
        let mut returned = 0u32;

        // SAFETY: Both buffers and the descriptor outlive the request: pending
        // requests are awaited below before returning.
        let result = unsafe {
            DeviceIoControl(
                self.raw(),
                request.code(),
                Some(input.as_ptr().cast::<c_void>()),
                input_len,
                Some(output.as_mut_ptr().cast::<c_void>()),
                output_len,
                Some(&raw mut returned),
                Some(overlapped),
            )
        };

        match result {
            Ok(()) => {}
            Err(e) if e.code() == ERROR_IO_PENDING.to_hresult() => {
                // SAFETY: The descriptor belongs to the request just issued.
                unsafe { GetOverlappedResult(self.raw(), overlapped, &raw mut returned, true)? };
            }
            Err(e) => return Err(e.into()),
        }

        tracing::trace!("{} returned {returned} bytes", request.name());
        Ok(returned as usize)
    }

    unsafe fn start_read(
        &self,
        completion: &mut TapCompletion,
        buffer: &mut [u8],
    ) -> Result<Submission, DeviceError> {
        request_len(buffer.len())?;
        let overlapped = completion.rearm();

        // SAFETY: The caller keeps `buffer` and `completion` alive until the
        // request is observed finished or cancelled.
        let result = unsafe { ReadFile(self.raw(), Some(buffer), None, Some(overlapped)) };
        self.submitted(result, completion)
    }

    unsafe fn start_write(
        &self,
        completion: &mut TapCompletion,
        frame: &[u8],
    ) -> Result<Submission, DeviceError> {
        request_len(frame.len())?;
        let overlapped = completion.rearm();

        // SAFETY: As for `start_read`.
        let result = unsafe { WriteFile(self.raw(), Some(frame), None, Some(overlapped)) };
        self.submitted(result, completion)
    }

    fn poll(&self, completion: &mut TapCompletion) -> Result<Option<usize>, DeviceError> {
        let mut transferred = 0u32;

        // SAFETY: The descriptor is owned by `completion` and stays valid.
        let result = unsafe {
            GetOverlappedResult(
                self.raw(),
                &raw const *completion.overlapped,
                &raw mut transferred,
                false,
            )
        };

        match result {
            Ok(()) => Ok(Some(transferred as usize)),
            Err(e) if e.code() == ERROR_IO_INCOMPLETE.to_hresult() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn wait(&self, completion: &TapCompletion) -> Result<(), DeviceError> {
        // SAFETY: The event handle is owned by `completion`.
        let outcome = unsafe { WaitForSingleObject(completion.event.0, INFINITE) };

        if outcome == WAIT_OBJECT_0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error().into())
        }
    }

    fn cancel(&self, completion: &mut TapCompletion) -> Result<(), DeviceError> {
        let overlapped = &raw const *completion.overlapped;

        // SAFETY: Cancels only the request bound to this descriptor.
        if let Err(e) = unsafe { CancelIoEx(self.raw(), Some(overlapped)) } {
            // Nothing to cancel: the request already finished.
            if e.code() != ERROR_NOT_FOUND.to_hresult() {
                return Err(e.into());
            }
        }

        // Blocks until the kernel has released the buffer. The request's own
        // outcome (usually "aborted") is irrelevant here.
        let mut transferred = 0u32;
        // SAFETY: As for `poll`.
        let _ = unsafe { GetOverlappedResult(self.raw(), overlapped, &raw mut transferred, true) };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opener_default_creates_instance() {
        let _opener = TapOpener::default();
    }

    #[test]
    fn missing_device_fails_to_open() {
        let opener = TapOpener::new();
        let result = opener.open(r"\\.\Global\{00000000-0000-0000-0000-000000000000}.tap");

        assert!(result.is_err());
    }

    #[test]
    fn completion_binds_its_event() {
        let mut completion = TapCompletion::new().unwrap();
        let overlapped = completion.rearm();

        // SAFETY: `overlapped` points into the live completion.
        assert_eq!(unsafe { (*overlapped).hEvent }, completion.event.0);
    }

    #[test]
    fn oversized_requests_are_rejected() {
        if let Ok(len) = usize::try_from(u64::from(u32::MAX) + 1) {
            assert!(matches!(
                request_len(len),
                Err(DeviceError::FrameTooLarge { .. })
            ));
        }
    }
}
