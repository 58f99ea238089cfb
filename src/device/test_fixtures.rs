//! Shared test fixtures: a scripted overlapped device and opener.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use super::{DeviceError, DeviceOpener, OverlappedDevice, Submission, TapControl};

/// Observable state shared by a fake device, its completions and the test.
#[derive(Debug, Default)]
pub struct FakeState {
    inbound: Mutex<VecDeque<Vec<u8>>>,
    inbound_ready: Condvar,
    written: Mutex<Vec<Vec<u8>>>,
    media_connected: Mutex<Option<bool>>,

    /// A read finishes at submission if a frame is already queued.
    pub reads_complete_inline: AtomicBool,
    /// A write finishes at submission.
    pub writes_complete_inline: AtomicBool,
    /// A pending write is reported finished by the next poll, as if the
    /// device drained it in the background.
    pub writes_settle_in_background: AtomicBool,
    /// Submissions fail.
    pub fail_submissions: AtomicBool,
    /// Pending requests finish with an error.
    pub fail_completions: AtomicBool,
    /// Control requests fail.
    pub fail_control: AtomicBool,
    /// Waiting on a completion object fails.
    pub fail_waits: AtomicBool,
    /// Cancellation cannot be confirmed.
    pub fail_cancels: AtomicBool,

    /// Set by a wait on a pending write; the next poll of that write
    /// reports it finished.
    write_drained: AtomicBool,

    read_waits: AtomicUsize,
    write_waits: AtomicUsize,
    cancels: AtomicUsize,
    completions_created: AtomicUsize,
    completions_dropped: AtomicUsize,
}

impl FakeState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a frame for the next read and wakes a blocked reader.
    pub fn push_frame(&self, frame: &[u8]) {
        self.inbound.lock().unwrap().push_back(frame.to_vec());
        self.inbound_ready.notify_all();
    }

    /// Frames whose write has completed, in completion order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.written.lock().unwrap().clone()
    }

    pub fn media_connected(&self) -> Option<bool> {
        *self.media_connected.lock().unwrap()
    }

    pub fn read_waits(&self) -> usize {
        self.read_waits.load(Ordering::SeqCst)
    }

    pub fn write_waits(&self) -> usize {
        self.write_waits.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    pub fn completions_alive(&self) -> usize {
        self.completions_created.load(Ordering::SeqCst)
            - self.completions_dropped.load(Ordering::SeqCst)
    }

    fn try_pop(&self) -> Option<Vec<u8>> {
        self.inbound.lock().unwrap().pop_front()
    }

    fn wait_for_frame(&self) {
        let queue = self.inbound.lock().unwrap();
        let _queue = self
            .inbound_ready
            .wait_while(queue, |queue| queue.is_empty())
            .unwrap();
    }
}

enum FakeOp {
    Idle,
    Reading { target: *mut u8, capacity: usize },
    Writing { data: Vec<u8> },
    Finished(usize),
}

/// Completion object of the fake device.
pub struct FakeCompletion {
    state: Arc<FakeState>,
    op: FakeOp,
}

// SAFETY: The raw read target is only dereferenced while the session keeps
// the buffer alive, per the `OverlappedDevice::start_read` contract.
unsafe impl Send for FakeCompletion {}

impl Drop for FakeCompletion {
    fn drop(&mut self) {
        self.state.completions_dropped.fetch_add(1, Ordering::SeqCst);
    }
}

impl FakeCompletion {
    /// Delivers `frame` into the pending read target.
    fn deliver(&mut self, frame: &[u8]) -> usize {
        let FakeOp::Reading { target, capacity } = self.op else {
            return 0;
        };
        let len = frame.len().min(capacity);
        // SAFETY: `target` points to a live buffer of `capacity` bytes.
        unsafe { std::ptr::copy_nonoverlapping(frame.as_ptr(), target, len) };
        self.op = FakeOp::Finished(len);
        len
    }

    fn finish_write(&mut self) -> usize {
        let FakeOp::Writing { data } = std::mem::replace(&mut self.op, FakeOp::Idle) else {
            return 0;
        };
        let len = data.len();
        self.state.written.lock().unwrap().push(data);
        self.op = FakeOp::Finished(len);
        len
    }
}

/// A scripted overlapped device.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    state: Arc<FakeState>,
    mac: [u8; 6],
}

impl FakeDevice {
    pub fn new(state: Arc<FakeState>) -> Self {
        Self {
            state,
            mac: [0x00, 0xff, 0x10, 0x20, 0x30, 0x40],
        }
    }

    fn io_failure() -> DeviceError {
        DeviceError::Io(std::io::Error::other("device removed"))
    }
}

impl OverlappedDevice for FakeDevice {
    type Completion = FakeCompletion;

    fn completion(&self) -> Result<FakeCompletion, DeviceError> {
        self.state.completions_created.fetch_add(1, Ordering::SeqCst);
        Ok(FakeCompletion {
            state: Arc::clone(&self.state),
            op: FakeOp::Idle,
        })
    }

    fn control(
        &self,
        request: TapControl,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize, DeviceError> {
        if self.state.fail_control.load(Ordering::SeqCst) {
            return Err(DeviceError::Io(std::io::Error::other("control rejected")));
        }

        let reply: Vec<u8> = match request {
            TapControl::GetMac => self.mac.to_vec(),
            TapControl::GetMtu => 1500u32.to_le_bytes().to_vec(),
            TapControl::GetVersion => [9u32, 24, 0].iter().flat_map(|w| w.to_le_bytes()).collect(),
            TapControl::SetMediaStatus => {
                *self.state.media_connected.lock().unwrap() = Some(input.first() != Some(&0));
                input.to_vec()
            }
        };

        let len = reply.len().min(output.len());
        output[..len].copy_from_slice(&reply[..len]);
        Ok(len)
    }

    unsafe fn start_read(
        &self,
        completion: &mut FakeCompletion,
        buffer: &mut [u8],
    ) -> Result<Submission, DeviceError> {
        if self.state.fail_submissions.load(Ordering::SeqCst) {
            return Err(Self::io_failure());
        }

        completion.op = FakeOp::Reading {
            target: buffer.as_mut_ptr(),
            capacity: buffer.len(),
        };

        if self.state.reads_complete_inline.load(Ordering::SeqCst) {
            if let Some(frame) = self.state.try_pop() {
                return Ok(Submission::Completed(completion.deliver(&frame)));
            }
        }

        Ok(Submission::Pending)
    }

    unsafe fn start_write(
        &self,
        completion: &mut FakeCompletion,
        frame: &[u8],
    ) -> Result<Submission, DeviceError> {
        if self.state.fail_submissions.load(Ordering::SeqCst) {
            return Err(Self::io_failure());
        }

        completion.op = FakeOp::Writing {
            data: frame.to_vec(),
        };

        if self.state.writes_complete_inline.load(Ordering::SeqCst) {
            return Ok(Submission::Completed(completion.finish_write()));
        }

        Ok(Submission::Pending)
    }

    fn poll(&self, completion: &mut FakeCompletion) -> Result<Option<usize>, DeviceError> {
        let in_progress = matches!(
            completion.op,
            FakeOp::Reading { .. } | FakeOp::Writing { .. }
        );
        if in_progress && self.state.fail_completions.load(Ordering::SeqCst) {
            completion.op = FakeOp::Idle;
            return Err(Self::io_failure());
        }

        match completion.op {
            FakeOp::Idle => Ok(Some(0)),
            FakeOp::Finished(len) => Ok(Some(len)),
            FakeOp::Reading { .. } => Ok(self.state.try_pop().map(|frame| completion.deliver(&frame))),
            FakeOp::Writing { .. } => {
                let drained = self.state.write_drained.swap(false, Ordering::SeqCst);
                if drained || self.state.writes_settle_in_background.load(Ordering::SeqCst) {
                    Ok(Some(completion.finish_write()))
                } else {
                    Ok(None)
                }
            }
        }
    }

    fn wait(&self, completion: &FakeCompletion) -> Result<(), DeviceError> {
        let reading = match completion.op {
            FakeOp::Reading { .. } => true,
            FakeOp::Writing { .. } => false,
            FakeOp::Idle | FakeOp::Finished(_) => return Ok(()),
        };

        let waits = if reading {
            &self.state.read_waits
        } else {
            &self.state.write_waits
        };
        waits.fetch_add(1, Ordering::SeqCst);

        if self.state.fail_waits.load(Ordering::SeqCst) {
            return Err(DeviceError::Io(std::io::Error::other("wait failed")));
        }

        if reading {
            if !self.state.fail_completions.load(Ordering::SeqCst) {
                self.state.wait_for_frame();
            }
        } else {
            // The device drains this one write while the caller is blocked.
            self.state.write_drained.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn cancel(&self, completion: &mut FakeCompletion) -> Result<(), DeviceError> {
        self.state.cancels.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_cancels.load(Ordering::SeqCst) {
            return Err(DeviceError::Io(std::io::Error::other("cancel not confirmed")));
        }
        completion.op = FakeOp::Idle;
        Ok(())
    }
}

/// Opener that fails for a configured set of paths.
#[derive(Debug, Default)]
pub struct FakeOpener {
    pub state: Arc<FakeState>,
    failing: HashSet<String>,
    attempts: Mutex<Vec<String>>,
}

impl FakeOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes opening the device of `instance_id` fail.
    pub fn failing_for(mut self, instance_id: &str) -> Self {
        self.failing.insert(super::device_path(instance_id));
        self
    }

    /// Device paths passed to `open`, in order.
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

impl DeviceOpener for FakeOpener {
    type Device = FakeDevice;

    fn open(&self, path: &str) -> Result<FakeDevice, DeviceError> {
        self.attempts.lock().unwrap().push(path.to_string());

        if self.failing.contains(path) {
            return Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "device in use",
            )));
        }

        Ok(FakeDevice::new(Arc::clone(&self.state)))
    }
}
