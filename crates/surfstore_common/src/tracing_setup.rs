//! Process-wide tracing configuration, one subscriber for every thread.

use tracing::metadata::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LEVEL: LevelFilter = LevelFilter::INFO;

/// Installs a compact, env-filterable `tracing` subscriber as the global
/// default. Safe to call once per process, early in `main`.
pub fn configure_tracing() {
    let fmt_layer = fmt::layer().compact().with_target(false);
    let level_filter_layer =
        EnvFilter::builder().with_default_directive(DEFAULT_LEVEL.into()).from_env_lossy();
    tracing_subscriber::registry().with(fmt_layer).with(level_filter_layer).init();
}
