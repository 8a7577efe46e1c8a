//! Structured logging with environment variable configuration.
//!
//! Logs are written to stderr; stdout carries the JSON-RPC stream.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::ServerConfig;

fn filter_from_config(config: &ServerConfig) -> EnvFilter {
    EnvFilter::new(config.log_level.as_filter_str())
}

/// Initialise the logging subsystem based on configuration.
///
/// Log level precedence (highest to lowest):
///
/// 1. CLI `--log-level` (parsed into `config.log_level`)
/// 2. `STEPSCOPE_LOG_LEVEL` (parsed into `config.log_level`)
/// 3. Default configuration value
///
/// If a global subscriber is already set, the call is a no-op.
pub fn init_logging(config: &ServerConfig) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter_from_config(config))
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    // First subscriber wins.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
