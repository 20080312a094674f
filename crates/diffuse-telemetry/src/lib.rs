//! Log output for diffuse
//!
//! Installs the global `tracing` subscriber. Call once per process, after any
//! stdio redirection (daemon mode) so log lines reach the right descriptor.
//! Lines go to stderr: stdout carries the MCP stdio transport.

use diffuse_config::{LogFormat, LoggingConfig};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging from configuration
///
/// `log_filter` is an `EnvFilter` directive string such as `info` or
/// `diffuse_imagegen=debug,info`; an invalid directive falls back to `info`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(config: &LoggingConfig, log_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(log_filter).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true)
                .with_file(false)
                .with_line_number(false);

            registry.with(fmt_layer).try_init()
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true)
                .with_current_span(false);

            registry.with(fmt_layer).try_init()
        }
    };

    result.map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    tracing::debug!(format = ?config.format, filter = log_filter, "tracing subscriber installed");

    Ok(())
}
