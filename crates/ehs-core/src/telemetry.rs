//! Tracing setup for binaries and integration tests

use tracing_subscriber::{fmt, EnvFilter};

fn filter() -> EnvFilter {
    // EHS_LOG wins, then RUST_LOG, then info
    std::env::var("EHS_LOG")
        .ok()
        .and_then(|v| v.parse::<EnvFilter>().ok())
        .unwrap_or_else(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
}

/// Install a global human-readable subscriber
///
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let _ = fmt().with_env_filter(filter()).with_target(true).try_init();
}

/// Same as [`init`] but emitting JSON lines, for log shipping
pub fn init_json() {
    let _ = fmt().json().with_env_filter(filter()).try_init();
}
