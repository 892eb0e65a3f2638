//! Structured logging setup.

use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a JSON subscriber filtered by `RUST_LOG`.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// A second call, or a subscriber installed by the host process, leaves the
/// existing one in place and logs a warning.
pub fn init() {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }
}
