//! Error type for boundary operations.

use thiserror::Error;

use super::{OpenStatus, SessionToken};
use crate::device::SessionError;
use crate::discovery::{DiscoveryError, DriverFamily};

/// Error type for [`TapBridge`](super::TapBridge) operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No adapter of the active driver family could be located.
    #[error("No {family} adapter found")]
    NotFound {
        /// The family that was searched for.
        family: DriverFamily,
    },

    /// Adapters were located but none of them could be opened.
    #[error("Could not open any adapter ({attempts} attempts)")]
    OpenFailed {
        /// Number of open attempts made.
        attempts: usize,
    },

    /// The adapter namespace could not be read.
    #[error("Adapter discovery failed: {0}")]
    Discovery(#[source] DiscoveryError),

    /// The token does not name an open session.
    #[error("Unknown or closed session {0}")]
    UnknownSession(SessionToken),

    /// Read or write on an open session failed.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl BridgeError {
    /// Maps this error onto the open return codes.
    ///
    /// Anything other than "nothing located" reports [`OpenStatus::OpenError`].
    #[must_use]
    pub const fn status(&self) -> OpenStatus {
        match self {
            Self::NotFound { .. } => OpenStatus::NotFound,
            _ => OpenStatus::OpenError,
        }
    }
}

impl From<DiscoveryError> for BridgeError {
    fn from(error: DiscoveryError) -> Self {
        match error {
            DiscoveryError::NotFound { family } => Self::NotFound { family },
            other => Self::Discovery(other),
        }
    }
}
