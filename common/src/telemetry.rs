// Telemetry module for structured logging

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize structured logging with JSON formatting
///
/// This function sets up the tracing subscriber with:
/// - JSON formatting for structured logs
/// - Span context (task id, payload) in all log entries
/// - Log level from `RUST_LOG`, falling back to the configured level
#[tracing::instrument(skip_all)]
pub fn init_logging(log_level: &str) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(log_level)?,
    };

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        // stdout carries the task status line
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {}", e))?;

    tracing::info!(
        log_level = log_level,
        "Structured logging initialized with JSON formatting"
    );

    Ok(())
}

/// Build the filter for the configured level when `RUST_LOG` is unset
fn level_filter(log_level: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(log_level)
        .map_err(|e| anyhow::anyhow!("Failed to create env filter: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice_reports_error() {
        // Only one global subscriber can be installed per process
        let _ = init_logging("info");
        assert!(init_logging("debug").is_err());
    }

    #[test]
    fn test_level_filter_rejects_invalid_directive() {
        let err = level_filter("sqlcsv=verbose").unwrap_err();
        assert!(err.to_string().contains("Failed to create env filter"));
    }

    #[test]
    fn test_level_filter_accepts_per_target_directives() {
        assert!(level_filter("info").is_ok());
        assert!(level_filter("warn,common=debug").is_ok());
    }
}
