//! Embedding boundary: open, close, read and write keyed by an opaque token.
//!
//! This module provides:
//! - The open policy with named-adapter preference and skip-count fallback
//!   ([`TapBridge::open_session`])
//! - Token-based session registry ([`TapBridge`], [`SessionToken`])
//! - Return codes for the open operation ([`OpenStatus`])

mod error;
mod status;
mod tap;


pub use error::BridgeError;
pub use status::{OpenStatus, Opened, SessionToken};
pub use tap::TapBridge;
