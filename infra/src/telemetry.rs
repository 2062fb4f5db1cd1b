//! Tracing subscriber setup

use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use sg_shared::config::{LogFormat, LoggingConfig};

use crate::InfrastructureError;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence over `config.level`. Auth events are logged under the
/// `auth_audit` target and can be routed with a directive such as `auth_audit=info`.
///
/// # Errors
/// Fails on an unparsable filter or when a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), InfrastructureError> {
    let filter = build_filter(config)?;
    let source = config.source_location;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_file(source)
            .with_line_number(source)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(source)
            .with_line_number(source)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_file(source)
            .with_line_number(source)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .map_err(|e| InfrastructureError::Telemetry(e.to_string()))
}

/// Filter from `RUST_LOG`, falling back to the configured level
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, InfrastructureError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| {
        InfrastructureError::Telemetry(format!("invalid log filter '{}': {}", config.level, e))
    })
}
