//! Open policy and the token-keyed session registry.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use super::{BridgeError, Opened, SessionToken};
use crate::device::{DeviceOpener, DeviceSession};
use crate::discovery::{AdapterCandidate, AdapterLocator, AdapterSource, DiscoveryError};

type Session<O> = DeviceSession<<O as DeviceOpener>::Device>;

/// Owns every open session and hands out tokens for them.
///
/// # Open policy
///
/// 1. The adapter named `expected_name` is tried first.
/// 2. Then every family-matching adapter in enumeration order, by skip
///    count. Adapters that already failed to open are passed over.
///
/// # Example
///
/// ```ignore
/// let bridge = TapBridge::new(locator, opener, "Lanemu");
/// let opened = bridge.open()?;
///
/// let mut frame = [0u8; 2048];
/// let len = bridge.read(opened.token, &mut frame)?;
/// bridge.write(opened.token, &frame[..len])?;
/// bridge.close(opened.token)?;
/// ```
pub struct TapBridge<S, O: DeviceOpener> {
    locator: AdapterLocator<S>,
    opener: O,
    expected_name: String,
    sessions: Mutex<HashMap<SessionToken, Arc<Session<O>>>>,
    next_token: AtomicU64,
}

impl<S: AdapterSource, O: DeviceOpener> TapBridge<S, O> {
    /// Creates a bridge that prefers the adapter named `expected_name`.
    pub fn new(locator: AdapterLocator<S>, opener: O, expected_name: impl Into<String>) -> Self {
        Self {
            locator,
            opener,
            expected_name: expected_name.into(),
            sessions: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    /// Returns the device opener.
    #[must_use]
    pub const fn opener(&self) -> &O {
        &self.opener
    }

    /// Locates and opens an adapter, returning the armed session directly.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::NotFound`] if no open was attempted because nothing
    ///   was located
    /// - [`BridgeError::OpenFailed`] if every located adapter failed to open
    /// - [`BridgeError::Discovery`] if the adapter namespace cannot be read
    pub fn open_session(&self) -> Result<Session<O>, BridgeError> {
        let mut failed: HashSet<String> = HashSet::new();

        match self.locator.locate(0, Some(self.expected_name.as_str())) {
            Ok(candidate) => match self.try_open(candidate, &mut failed) {
                Some(session) => return Ok(session),
                None => tracing::debug!(
                    "Adapter '{}' unavailable, trying other adapters",
                    self.expected_name
                ),
            },
            Err(DiscoveryError::NotFound { .. }) => tracing::debug!(
                "No adapter named '{}', trying other adapters",
                self.expected_name
            ),
            Err(e) => return Err(e.into()),
        }

        for skip in 0.. {
            let candidate = match self.locator.locate(skip, None) {
                Ok(candidate) => candidate,
                Err(DiscoveryError::NotFound { .. }) => break,
                Err(e) => return Err(e.into()),
            };

            if failed.contains(&candidate.instance_id) {
                continue;
            }

            if let Some(session) = self.try_open(candidate, &mut failed) {
                return Ok(session);
            }
        }

        if failed.is_empty() {
            Err(BridgeError::NotFound {
                family: self.locator.family(),
            })
        } else {
            Err(BridgeError::OpenFailed {
                attempts: failed.len(),
            })
        }
    }

    /// Opens an adapter and registers its session under a new token.
    ///
    /// # Errors
    ///
    /// Same as [`open_session`](Self::open_session).
    pub fn open(&self) -> Result<Opened, BridgeError> {
        let session = self.open_session()?;
        let adapter_name = session.name().to_string();
        let token = SessionToken::from_raw(self.next_token.fetch_add(1, Ordering::Relaxed));

        self.registry().insert(token, Arc::new(session));
        tracing::info!("Opened '{adapter_name}' as session {token}");

        Ok(Opened {
            token,
            adapter_name,
        })
    }

    /// Closes the session named by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownSession`] if the token is not open.
    pub fn close(&self, token: SessionToken) -> Result<(), BridgeError> {
        let session = self
            .registry()
            .remove(&token)
            .ok_or(BridgeError::UnknownSession(token))?;

        match Arc::try_unwrap(session) {
            Ok(session) => session.close(),
            Err(_) => tracing::warn!(
                "Session {token} closed while an I/O call is in progress; \
                 it is released when that call returns"
            ),
        }
        Ok(())
    }

    /// Reads one frame from the session named by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownSession`] if the token is not open, or
    /// [`BridgeError::Session`] if the read fails.
    pub fn read(&self, token: SessionToken, buf: &mut [u8]) -> Result<usize, BridgeError> {
        self.session(token)?.read(buf).map_err(BridgeError::from)
    }

    /// Submits one frame to the session named by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownSession`] if the token is not open, or
    /// [`BridgeError::Session`] if the write fails.
    pub fn write(&self, token: SessionToken, frame: &[u8]) -> Result<(), BridgeError> {
        self.session(token)?.write(frame).map_err(BridgeError::from)
    }

    /// Returns the session named by `token`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::UnknownSession`] if the token is not open.
    pub fn session(&self, token: SessionToken) -> Result<Arc<Session<O>>, BridgeError> {
        self.registry()
            .get(&token)
            .cloned()
            .ok_or(BridgeError::UnknownSession(token))
    }

    /// Returns the number of open sessions.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.registry().len()
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HashMap<SessionToken, Arc<Session<O>>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens `candidate`, recording its instance id on failure.
    fn try_open(
        &self,
        candidate: AdapterCandidate,
        failed: &mut HashSet<String>,
    ) -> Option<Session<O>> {
        let instance_id = candidate.instance_id.clone();

        match DeviceSession::open(&self.opener, candidate) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::debug!("Passing over {instance_id} from now on: {e}");
                failed.insert(instance_id);
                None
            }
        }
    }
}

impl<S, O: DeviceOpener> std::fmt::Debug for TapBridge<S, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TapBridge")
            .field("expected_name", &self.expected_name)
            .field("next_token", &self.next_token.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
