//! Logging setup
//!
//! streamux emits `tracing` events; this module installs a `tracing-subscriber`
//! formatter for binaries and tests that want to see them.
//!
//! # Environment Variables
//!
//! - `STREAMUX_LOG=<filter>` - `EnvFilter` directive, e.g. `debug` or
//!   `streamux_runtime::reactor=trace` (default: `info`)
//! - `STREAMUX_LOG_ANSI=1` - colorize output
//!
//! Both initializers are idempotent: the first call wins, later calls are
//! no-ops, and an already-installed global subscriber is left alone.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::env::{env_get_bool, env_get_str};

static INIT: Once = Once::new();
static INIT_TESTS: Once = Once::new();

/// Default filter when `STREAMUX_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

fn filter_from_env() -> EnvFilter {
    let directive = env_get_str("STREAMUX_LOG", DEFAULT_FILTER);
    EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a stderr formatter configured from the environment.
pub fn init() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter_from_env())
            .with_ansi(env_get_bool("STREAMUX_LOG_ANSI", false))
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init();
        tracing::debug!(filter = %env_get_str("STREAMUX_LOG", DEFAULT_FILTER), "logging initialized");
    });
}

/// Install a formatter that writes through the libtest capture.
///
/// Same filter as [`init`]; output only shows up for failing tests.
pub fn init_for_tests() {
    INIT_TESTS.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter_from_env())
            .with_test_writer()
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .try_init();
    });
}
