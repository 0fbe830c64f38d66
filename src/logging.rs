//! logging
//!
//! Single initialization point for diagnostics.
//!
//! Library code only emits `tracing` events; the binary installs one
//! subscriber writing to stderr. `RUST_LOG` overrides the level derived from
//! `--quiet` / `--debug`. User-facing warnings are printed by `ui::output`,
//! so by default only errors are logged.

use std::sync::Once;

use tracing_subscriber::EnvFilter;

use crate::ui::output::Verbosity;

static INIT_ONCE: Once = Once::new();

/// Default filter for a verbosity level.
pub fn default_filter(verbosity: Verbosity) -> &'static str {
    match verbosity {
        Verbosity::Quiet => "off",
        Verbosity::Normal => "metashift=error",
        Verbosity::Debug => "metashift=debug",
    }
}

/// Install the stderr subscriber. Later calls are no-ops.
pub fn init(verbosity: Verbosity) {
    INIT_ONCE.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

        // Another subscriber may already be installed (tests, embedding).
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    });
}
