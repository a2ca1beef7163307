//! Tracing setup for the `lift` binary and unit tests.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directives used when RUST_LOG is unset
///
/// Only the engine's own crates log at `level`; dependencies stay at warn.
fn default_directives(level: &str) -> String {
    format!("warn,lift_core={level},lift={level}")
}

/// Install the global subscriber
///
/// `verbose` raises the engine crates to `debug`, which shows every
/// prescription and progression decision. RUST_LOG always wins. Logs go to
/// stderr so JSON on stdout stays parseable.
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .try_init();
    if installed.is_err() {
        tracing::debug!("Subscriber already installed");
    }
}

/// Route logs through the test harness so they show for failing tests only
#[cfg(test)]
pub(crate) fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(EnvFilter::new(default_directives("debug")))
        .try_init();
}
