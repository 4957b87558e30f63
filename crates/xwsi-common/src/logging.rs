use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable consulted before the configured filter.
pub const LOG_ENV: &str = "XWSI_LOG";

/// Initialize structured logging with environment filter.
/// Set XWSI_LOG=trace (or debug, info, warn, error) for verbosity control;
/// `default_filter` applies when the variable is unset or unparsable.
/// A global subscriber installed earlier by the host process is kept.
pub fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .try_init();
}
