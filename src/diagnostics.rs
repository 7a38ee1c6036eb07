//! Logging setup for host applications.
//!
//! The library only emits `tracing` events. A host that has no subscriber of
//! its own can call [`init_tracing`] once at startup.

use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber.
///
/// The filter comes from `RUST_LOG` when set, otherwise `default_filter`
/// (for example `"tracklog=info"`). Returns `false` if a global subscriber
/// was already installed, which makes repeated calls harmless.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
