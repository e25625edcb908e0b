//! Tracing setup
//!
//! Components log with bracketed prefixes (`[TRANSPORT]`, `[QUEUE]`,
//! `[SYNC]`, `[CHAT]`, `[API]`, `[STORE]`, `[AUTH]`), so one subsystem can
//! be followed with a plain grep.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "shoot_client=info";

/// Install the fmt subscriber, filtered by `RUST_LOG`
///
/// Calling it again (or after another subscriber was installed) is a no-op.
pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

pub fn init_with_default(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
