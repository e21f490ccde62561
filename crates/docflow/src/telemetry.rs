//! Process-wide logging setup.
//!
//! Library code logs through the `log` macros and opens `tracing` spans
//! around pipeline stages. [`init`] installs a `tracing-subscriber` registry
//! and bridges `log` records into it so both end up in one stream.

use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::TelemetryError;

/// Third-party targets that are too chatty at `info`.
const QUIET_TARGETS: &[(&str, &str)] = &[("lopdf", "warn"), ("rusqlite", "warn")];

/// Builds the filter from `RUST_LOG` when set, otherwise from `level`.
pub fn build_filter(level: &str) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![level.to_string()];
    for (target, target_level) in QUIET_TARGETS {
        directives.push(format!("{}={}", target, target_level));
    }
    let filter = directives.join(",");

    EnvFilter::try_new(&filter).map_err(|e| TelemetryError::Filter {
        filter: level.to_string(),
        reason: e.to_string(),
    })
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init(logging: &LoggingConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(&logging.level)?;

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(true)
            .with_thread_names(true)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    Ok(())
}
