//! Tracing subscriber setup.
//!
//! The library itself only emits `tracing` events; binaries and tests
//! decide where they go.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a formatted subscriber filtered by `RUST_LOG`.
///
/// Defaults to `info` when `RUST_LOG` is unset or invalid, e.g.
/// `RUST_LOG=u_curriculum=debug` shows engine statistics.
///
/// # Panics
/// If a global subscriber is already installed.
///
/// # Example
/// ```no_run
/// use u_curriculum::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_line_number(true)
        .init();
}

/// Installs a debug-level subscriber writing to the test harness.
///
/// Safe to call from every test; only the first call takes effect.
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
