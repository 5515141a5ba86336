//! Structured logging initialization.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format (for development).
    Pretty,
    /// JSON format (for production log aggregation).
    Json,
}

impl LogFormat {
    /// Parse log format from string.
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

/// Initialize the logging system.
///
/// `RUST_LOG` overrides the level when set; otherwise `berth` crates log at
/// `level` and tower-http request traces at debug.
pub fn init_logging(level: &str, format: LogFormat) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("berth={level},tower_http=debug,axum::rejection=trace").into()
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(true),
            )
            .init(),
        LogFormat::Pretty => registry.with(fmt::layer().pretty()).init(),
    }

    tracing::info!(level = %level, format = ?format, "logging initialized");
}
