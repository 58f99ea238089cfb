//! Application execution logic.
//!
//! This module contains the adapter listing and the watch loop that
//! reads frames through the bridge API and logs a summary of each one.

use std::fmt;
use std::future::Future;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::{Stream, StreamExt};

use tap_bridge::bridge::{BridgeError, SessionToken, TapBridge};
use tap_bridge::config::ValidatedConfig;
use tap_bridge::device::DeviceOpener;
use tap_bridge::discovery::{AdapterSource, DiscoveryError, DriverFamily, ListedAdapter};
use tap_bridge::frame::FrameSummary;

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;

/// Error type for runtime execution failures.
#[derive(Debug, Error)]
pub enum RunError {
    /// No session could be opened.
    #[error("Failed to open adapter: {0}")]
    Open(#[source] BridgeError),

    /// The adapter namespace could not be enumerated.
    #[error("Failed to enumerate adapters: {0}")]
    Discovery(#[source] DiscoveryError),

    /// The adapter list could not be encoded.
    #[error("Failed to encode adapter list: {0}")]
    Json(#[source] serde_json::Error),

    /// A read on the open session failed.
    #[error("Frame read failed: {0}")]
    Read(#[source] BridgeError),

    /// The reader thread exited without reporting an error.
    #[error("Reader thread stopped unexpectedly")]
    ReaderStopped,

    /// TAP-Windows adapters do not exist on this platform.
    #[error("Unsupported platform: TAP-Windows adapters require Windows")]
    Unsupported,
}

/// What the reader thread saw in one completed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Observed {
    /// A frame with a complete Ethernet header.
    Frame(FrameSummary),
    /// A read shorter than an Ethernet header.
    Runt { len: usize },
}

impl Observed {
    fn from_frame(frame: &[u8]) -> Self {
        FrameSummary::parse(frame).map_or(Self::Runt { len: frame.len() }, Self::Frame)
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(summary) => write!(f, "{summary}"),
            Self::Runt { len } => write!(f, "runt frame, {len} bytes"),
        }
    }
}

type Reading = Result<Observed, BridgeError>;

/// Prints every adapter of the configured driver family.
///
/// # Errors
///
/// Returns an error if the registry cannot be read or the JSON encoding fails.
///
/// Excluded from coverage - requires the Windows registry.
#[cfg(not(tarpaulin_include))]
#[cfg(windows)]
pub fn list(config: &ValidatedConfig, json: bool) -> Result<(), RunError> {
    use tap_bridge::discovery::AdapterLocator;
    use tap_bridge::discovery::platform::PlatformSource;

    let locator = AdapterLocator::new(PlatformSource::new(), config.driver);
    let adapters = locator.candidates().map_err(RunError::Discovery)?;
    tracing::debug!("Found {} {} adapter(s)", adapters.len(), config.driver);

    println!("{}", render_listing(config.driver, &adapters, json)?);
    Ok(())
}

/// Non-Windows stub for adapter listing.
#[cfg(not(windows))]
pub fn list(_config: &ValidatedConfig, _json: bool) -> Result<(), RunError> {
    Err(RunError::Unsupported)
}

/// Formats the adapter list as text lines or as pretty JSON.
fn render_listing(
    family: DriverFamily,
    adapters: &[ListedAdapter],
    json: bool,
) -> Result<String, RunError> {
    if json {
        return serde_json::to_string_pretty(adapters).map_err(RunError::Json);
    }

    if adapters.is_empty() {
        return Ok(format!("No {family} adapters found"));
    }

    let lines: Vec<String> = adapters
        .iter()
        .map(|listed| format!("[{}] {}", listed.ordinal, listed.candidate))
        .collect();
    Ok(lines.join("\n"))
}

/// Opens the adapter and logs frames until Ctrl+C or the frame limit.
///
/// This function:
/// 1. Opens a session through the token-based bridge API
/// 2. Logs the adapter's MAC address, MTU and driver version
/// 3. Starts a reader thread that blocks in `read`
/// 4. Logs each frame summary it forwards
/// 5. Closes the session on the way out
///
/// # Errors
///
/// Returns an error if no adapter can be opened or a read fails.
///
/// # Coverage Note
///
/// This function is excluded from coverage because it requires:
/// - A TAP-Windows adapter
/// - Real async runtime with signal handling
#[cfg(not(tarpaulin_include))]
#[cfg(windows)]
pub async fn watch(config: ValidatedConfig) -> Result<(), RunError> {
    use std::sync::Arc;
    use tap_bridge::device::platform::PlatformOpener;
    use tap_bridge::discovery::AdapterLocator;
    use tap_bridge::discovery::platform::PlatformSource;
    use tokio_stream::wrappers::UnboundedReceiverStream;

    let locator = AdapterLocator::new(PlatformSource::new(), config.driver);
    let bridge = Arc::new(TapBridge::new(
        locator,
        PlatformOpener::new(),
        config.adapter_name.clone(),
    ));

    let opened = bridge.open().map_err(RunError::Open)?;
    let token = opened.token;
    log_adapter_properties(&bridge, token);

    let (tx, rx) = mpsc::unbounded_channel();
    let reader_bridge = Arc::clone(&bridge);
    let buffer_size = config.buffer_size;
    std::thread::spawn(move || pump_frames(&reader_bridge, token, buffer_size, &tx));

    let result = forward_frames(
        UnboundedReceiverStream::new(rx),
        config.max_frames,
        shutdown_signal(),
    )
    .await;

    if let Err(e) = bridge.close(token) {
        tracing::warn!("Failed to close session {token}: {e}");
    }

    result.map(|count| tracing::info!("Watched {count} frame(s)"))
}

/// Non-Windows stub for watch mode.
///
/// # Errors
///
/// Always returns [`RunError::Unsupported`].
#[cfg(not(windows))]
#[allow(clippy::unused_async)]
pub async fn watch(_config: ValidatedConfig) -> Result<(), RunError> {
    Err(RunError::Unsupported)
}

/// Logs the adapter properties reported by the driver.
///
/// Failures are logged and otherwise ignored.
fn log_adapter_properties<S, O>(bridge: &TapBridge<S, O>, token: SessionToken)
where
    S: AdapterSource,
    O: DeviceOpener,
{
    let Ok(session) = bridge.session(token) else {
        return;
    };
    let name = session.name();
    tracing::debug!("Session {token} is bound to {}", session.adapter());

    match session.mac_address() {
        Ok(mac) => tracing::info!("Adapter '{name}' MAC address: {mac}"),
        Err(e) => tracing::warn!("Could not query MAC address: {e}"),
    }
    match session.mtu() {
        Ok(mtu) => tracing::info!("Adapter '{name}' MTU: {mtu}"),
        Err(e) => tracing::warn!("Could not query MTU: {e}"),
    }
    match session.driver_version() {
        Ok(version) => tracing::info!("Adapter '{name}' driver version: {version}"),
        Err(e) => tracing::warn!("Could not query driver version: {e}"),
    }
}

/// Blocking read loop run on the reader thread.
///
/// Stops after the first failed read, or once the receiver is gone.
fn pump_frames<S, O>(
    bridge: &TapBridge<S, O>,
    token: SessionToken,
    buffer_size: usize,
    tx: &mpsc::UnboundedSender<Reading>,
) where
    S: AdapterSource,
    O: DeviceOpener,
{
    let mut buf = vec![0u8; buffer_size];

    loop {
        let reading = bridge
            .read(token, &mut buf)
            .map(|len| Observed::from_frame(&buf[..len]));
        let failed = reading.is_err();

        if tx.send(reading).is_err() || failed {
            tracing::debug!("Reader for session {token} exiting");
            return;
        }
    }
}

/// Logs readings until `shutdown` resolves or `max_frames` frames were seen.
///
/// Returns the number of readings logged.
async fn forward_frames<St, F>(
    mut readings: St,
    max_frames: Option<u64>,
    shutdown: F,
) -> Result<u64, RunError>
where
    St: Stream<Item = Reading> + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut seen = 0u64;

    loop {
        if max_frames.is_some_and(|max| seen >= max) {
            tracing::info!("Frame limit of {seen} reached, stopping...");
            return Ok(seen);
        }

        tokio::select! {
            biased;

            () = &mut shutdown => {
                tracing::info!("Shutdown signal received, stopping...");
                return Ok(seen);
            }

            reading = readings.next() => {
                match reading {
                    Some(Ok(observed)) => {
                        seen += 1;
                        tracing::info!("#{seen} {observed}");
                    }
                    Some(Err(e)) => return Err(RunError::Read(e)),
                    None => return Err(RunError::ReaderStopped),
                }
            }
        }
    }
}

/// Returns a future that completes when a shutdown signal is received.
///
/// Excluded from coverage - requires OS signal handling.
#[cfg(not(tarpaulin_include))]
#[cfg(windows)]
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
