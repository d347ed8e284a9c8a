//! Structured logging with JSON output.
//!
//! 12-factor style: structured JSON to stdout in production, pretty output
//! for development.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Initialize the logging subsystem.
///
/// Respects RUST_LOG when set, otherwise falls back to the configured level.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    match config.log_format {
        LogFormat::Json => init_json_logging(filter),
        LogFormat::Pretty => init_pretty_logging(filter),
    }
}

fn init_json_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let json_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_file(false)
        .with_line_number(false)
        .flatten_event(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(json_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

fn init_pretty_logging(filter: EnvFilter) -> Result<(), TelemetryError> {
    let pretty_layer = fmt::layer()
        .pretty()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(pretty_layer)
        .try_init()
        .map_err(|e: tracing_subscriber::util::TryInitError| {
            TelemetryError::LoggingInit(e.to_string())
        })
}

/// Standard log event names, used as the `event` field on tracing calls.
pub mod events {
    /// A spec document was fetched and parsed.
    pub const SPEC_FETCHED: &str = "spec_fetched";

    /// Every fetch attempt for an endpoint failed.
    pub const SPEC_FETCH_FAILED: &str = "spec_fetch_failed";

    /// A service was skipped because of a non-analyzable route.
    pub const SERVICE_SKIPPED: &str = "service_skipped";

    /// Two documents disagreed during a merge; first occurrence won.
    pub const MERGE_CONFLICT: &str = "merge_conflict";

    /// An aggregate document was built and cached.
    pub const AGGREGATE_BUILT: &str = "aggregate_built";

    /// Cache entries were removed by tag.
    pub const CACHE_INVALIDATED: &str = "cache_invalidated";
}
