use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines on stderr
    #[default]
    Pretty,
    /// One JSON object per event, with the current span attached
    Json,
}

/// Initialize tracing with structured logging.
///
/// `RUST_LOG` takes precedence; otherwise `default_level` applies to this
/// crate and warnings to everything else.
pub fn init_telemetry(format: LogFormat, default_level: tracing::Level) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,branch_publish={}",
            default_level.as_str().to_lowercase()
        ))
    });
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?,
    }

    tracing::debug!("telemetry initialized");
    Ok(())
}

/// Generate a correlation ID for linking the events of one publish run
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
