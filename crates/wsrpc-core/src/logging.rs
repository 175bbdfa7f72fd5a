//! Structured logging with `tracing`.
//!
//! Raw frames are traced on the [`FRAMES_TARGET`] target (`>>` outbound,
//! `<<` inbound). They stay off unless the filter names the target, e.g.
//! `RUST_LOG=wsrpc::frames=trace`.

use tracing_subscriber::EnvFilter;

/// Tracing target for raw wire frames.
pub const FRAMES_TARGET: &str = "wsrpc::frames";

/// Build the filter for `level`, or for `RUST_LOG` when it is set.
///
/// An unparsable `level` falls back to `warn`.
pub fn filter_for(level: &str) -> EnvFilter {
    let spec = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| level.to_string());
    let spec = if spec.contains(FRAMES_TARGET) {
        spec
    } else {
        format!("{spec},{FRAMES_TARGET}=off")
    };
    EnvFilter::try_new(&spec).unwrap_or_else(|_| EnvFilter::new(format!("warn,{FRAMES_TARGET}=off")))
}

/// Install a compact stderr subscriber filtered by [`filter_for`].
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_subscriber(level: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(filter_for(level))
        .with_writer(std::io::stderr)
        .compact()
        .try_init()
        .is_ok()
}
