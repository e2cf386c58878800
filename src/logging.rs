//! Logging setup.
//!
//! Standard output belongs to the driver protocol — the only thing ever
//! printed there is the final JSON result. All progress and diagnostic
//! messages go through tracing to stderr.

use tracing::Level;

/// Install the stderr subscriber.
///
/// Safe to call more than once; later calls are no-ops, which keeps
/// tests that exercise the command layer from fighting over the global
/// subscriber.
pub fn init(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
