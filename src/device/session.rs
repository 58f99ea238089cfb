//! Armed device session and the synchronous-over-overlapped I/O bridge.

use std::mem::ManuallyDrop;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::discovery::AdapterCandidate;

use super::control::{self, TapControl};
use super::{
    DeviceError, DeviceOpener, DriverVersion, MacAddress, OverlappedDevice, SessionError,
    Submission, device_path,
};

/// One I/O direction: its completion object, the buffer the OS reads from or
/// writes into, and whether a request is still in flight.
///
/// The completion and buffer are only touched while no request is in flight.
struct Lane<C> {
    completion: ManuallyDrop<C>,
    buffer: ManuallyDrop<Vec<u8>>,
    in_flight: bool,
    /// Set when an in-flight request could not be settled; the completion
    /// and buffer are then never freed.
    leaked: bool,
}

impl<C> Lane<C> {
    fn new(completion: C) -> Self {
        Self {
            completion: ManuallyDrop::new(completion),
            buffer: ManuallyDrop::new(Vec::new()),
            in_flight: false,
            leaked: false,
        }
    }
}

impl<C> Drop for Lane<C> {
    fn drop(&mut self) {
        if self.leaked {
            return;
        }
        // SAFETY: Both fields are dropped exactly once, here, and only when
        // no request references them.
        unsafe {
            ManuallyDrop::drop(&mut self.completion);
            ManuallyDrop::drop(&mut self.buffer);
        }
    }
}

/// An open, armed TAP device.
///
/// Created by a successful [`open`](Self::open); destroyed by
/// [`close`](Self::close) or drop. There is no way to reopen a session.
///
/// # Concurrency
///
/// One reader thread and one writer thread may use a session at the same
/// time: each direction has its own completion object and buffer. Concurrent
/// calls in the *same* direction are serialized.
///
/// # Failure
///
/// Any read or write failure poisons the session. Every later read or write
/// returns [`SessionError::Poisoned`].
pub struct DeviceSession<D: OverlappedDevice> {
    device: D,
    adapter: AdapterCandidate,
    reader: Mutex<Lane<D::Completion>>,
    writer: Mutex<Lane<D::Completion>>,
    poisoned: AtomicBool,
}

impl<D: OverlappedDevice> std::fmt::Debug for DeviceSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("adapter", &self.adapter)
            .field("poisoned", &self.poisoned.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl<D: OverlappedDevice> DeviceSession<D> {
    /// Opens the device of `adapter` and arms it.
    ///
    /// Does not retry; the caller picks the next candidate on failure.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the device cannot be opened or its
    /// completion objects cannot be allocated.
    pub fn open<O>(opener: &O, adapter: AdapterCandidate) -> Result<Self, DeviceError>
    where
        O: DeviceOpener<Device = D>,
    {
        let path = device_path(&adapter.instance_id);
        tracing::debug!("Opening {path}");

        let device = opener.open(&path).inspect_err(|e| {
            tracing::warn!("Could not open '{path}': {e}");
        })?;

        Self::arm(device, adapter)
    }

    /// Arms an already opened device.
    ///
    /// Marks the link as connected (best-effort) and allocates one completion
    /// object per direction.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if a completion object cannot be allocated.
    pub fn arm(device: D, adapter: AdapterCandidate) -> Result<Self, DeviceError> {
        if let Err(e) = set_media_status(&device, true) {
            tracing::warn!("Could not mark {adapter} as connected: {e}");
        }

        let reader = Lane::new(device.completion()?);
        let writer = Lane::new(device.completion()?);

        tracing::info!("Session armed on {adapter}");

        Ok(Self {
            device,
            adapter,
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            poisoned: AtomicBool::new(false),
        })
    }

    /// Returns the adapter this session is bound to.
    #[must_use]
    pub const fn adapter(&self) -> &AdapterCandidate {
        &self.adapter
    }

    /// Returns the adapter's connection name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.adapter.friendly_name
    }

    /// Returns false once an I/O failure has poisoned the session.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.poisoned.load(Ordering::SeqCst)
    }

    /// Reads one frame into `buf`, blocking until the device delivers it.
    ///
    /// Returns the byte count reported by the completed request, at most
    /// `buf.len()`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the request fails, or
    /// [`SessionError::Poisoned`] if an earlier request failed.
    pub fn read(&self, buf: &mut [u8]) -> Result<usize, SessionError> {
        self.ensure_usable()?;
        let mut guard = self.reader.lock().map_err(|_| SessionError::Poisoned)?;
        let lane = &mut *guard;

        if lane.in_flight {
            return Err(SessionError::Poisoned);
        }

        lane.buffer.resize(buf.len(), 0);

        // SAFETY: If the request stays pending, `lane` is only touched again by
        // `block_on` (which keeps it in flight until the OS reports completion)
        // or by `settle` on drop.
        let submitted = unsafe { self.device.start_read(&mut lane.completion, &mut lane.buffer) };

        let bytes = match submitted {
            Ok(Submission::Completed(bytes)) => bytes,
            Ok(Submission::Pending) => {
                lane.in_flight = true;
                self.block_on(lane)?
            }
            Err(e) => return Err(self.fail(e)),
        };

        let bytes = bytes.min(buf.len());
        buf[..bytes].copy_from_slice(&lane.buffer[..bytes]);
        tracing::trace!("Read {bytes} bytes from {}", self.adapter.friendly_name);

        Ok(bytes)
    }

    /// Submits `frame` for writing without waiting for it to complete.
    ///
    /// If the previous write is still in flight, blocks until it finishes
    /// before reusing its completion object.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] if the previous write failed or the new
    /// one cannot be submitted, or [`SessionError::Poisoned`] if an earlier
    /// request failed.
    pub fn write(&self, frame: &[u8]) -> Result<(), SessionError> {
        self.ensure_usable()?;
        let mut guard = self.writer.lock().map_err(|_| SessionError::Poisoned)?;
        let lane = &mut *guard;

        if lane.in_flight {
            match self.device.poll(&mut lane.completion) {
                Ok(Some(_)) => lane.in_flight = false,
                Ok(None) => {
                    tracing::trace!("Previous write still in flight, waiting");
                    self.block_on(lane)?;
                }
                Err(e) => {
                    lane.in_flight = false;
                    return Err(self.fail(e));
                }
            }
        }

        lane.buffer.clear();
        lane.buffer.extend_from_slice(frame);

        // SAFETY: The buffer is owned by the lane and not modified until the
        // next `write` has observed this request's completion.
        let submitted = unsafe { self.device.start_write(&mut lane.completion, &lane.buffer) };

        match submitted {
            Ok(Submission::Pending) => lane.in_flight = true,
            Ok(Submission::Completed(_)) => {}
            Err(e) => return Err(self.fail(e)),
        }

        tracing::trace!(
            "Submitted {} byte write to {}",
            frame.len(),
            self.adapter.friendly_name
        );
        Ok(())
    }

    /// Sets the adapter's link state.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the driver rejects the request.
    pub fn set_media_status(&self, connected: bool) -> Result<(), DeviceError> {
        set_media_status(&self.device, connected)
    }

    /// Queries the adapter's MAC address.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the request fails or the reply is short.
    pub fn mac_address(&self) -> Result<MacAddress, DeviceError> {
        let mut reply = [0u8; 6];
        let len = self.device.control(TapControl::GetMac, &[], &mut reply)?;
        control::parse_mac(&reply[..len.min(reply.len())])
    }

    /// Queries the driver version.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the request fails or the reply is short.
    pub fn driver_version(&self) -> Result<DriverVersion, DeviceError> {
        let mut reply = [0u8; 12];
        let len = self
            .device
            .control(TapControl::GetVersion, &[], &mut reply)?;
        control::parse_version(&reply[..len.min(reply.len())])
    }

    /// Queries the adapter MTU.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] if the request fails or the reply is short.
    pub fn mtu(&self) -> Result<u32, DeviceError> {
        let mut reply = [0u8; 4];
        let len = self.device.control(TapControl::GetMtu, &[], &mut reply)?;
        control::parse_mtu(&reply[..len.min(reply.len())])
    }

    /// Closes the session.
    ///
    /// An outstanding write is waited for before the device is released;
    /// both completion objects are released with it.
    pub fn close(self) {
        tracing::info!("Closing session on {}", self.adapter);
        drop(self);
    }

    fn ensure_usable(&self) -> Result<(), SessionError> {
        if self.is_usable() {
            Ok(())
        } else {
            Err(SessionError::Poisoned)
        }
    }

    /// Blocks on the lane's completion object, then fetches the byte count.
    fn block_on(&self, lane: &mut Lane<D::Completion>) -> Result<usize, SessionError> {
        self.device
            .wait(&lane.completion)
            .map_err(|e| self.fail(e))?;

        match self.device.poll(&mut lane.completion) {
            Ok(Some(bytes)) => {
                lane.in_flight = false;
                Ok(bytes)
            }
            Ok(None) => Err(self.fail(DeviceError::Io(std::io::Error::other(
                "completion signaled but request still incomplete",
            )))),
            Err(e) => {
                lane.in_flight = false;
                Err(self.fail(e))
            }
        }
    }

    fn fail(&self, error: DeviceError) -> SessionError {
        self.poisoned.store(true, Ordering::SeqCst);
        tracing::warn!(
            "I/O failure on {}, session disabled: {error}",
            self.adapter.friendly_name
        );
        SessionError::Io(error)
    }
}

impl<D: OverlappedDevice> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        let writer = self.writer.get_mut().unwrap_or_else(PoisonError::into_inner);
        settle(&self.device, writer, true);

        let reader = self.reader.get_mut().unwrap_or_else(PoisonError::into_inner);
        settle(&self.device, reader, false);

        tracing::debug!("Released device of {}", self.adapter);
    }
}

/// Resolves an in-flight request before its lane is freed.
///
/// With `drain`, waits for the request to finish; otherwise, or if waiting
/// fails, cancels it. If neither works the lane is leaked.
fn settle<D: OverlappedDevice>(device: &D, lane: &mut Lane<D::Completion>, drain: bool) {
    if !lane.in_flight {
        return;
    }

    let finished = drain
        && device.wait(&lane.completion).is_ok()
        && match device.poll(&mut lane.completion) {
            Ok(Some(bytes)) => {
                tracing::debug!("Flushed outstanding write of {bytes} bytes");
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Outstanding write failed during close: {e}");
                true
            }
        };

    if !finished {
        if let Err(e) = device.cancel(&mut lane.completion) {
            tracing::warn!("Could not cancel outstanding request, leaking its buffer: {e}");
            lane.leaked = true;
            return;
        }
    }

    lane.in_flight = false;
}

fn set_media_status<D: OverlappedDevice>(device: &D, connected: bool) -> Result<(), DeviceError> {
    let mut status = control::media_status_payload(connected);
    let input = status;
    device.control(TapControl::SetMediaStatus, &input, &mut status)?;
    Ok(())
}
