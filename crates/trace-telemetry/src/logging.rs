//! Subscriber installation.
//!
//! Records go to stderr so a child's stdout stays free for the target
//! function. JSON output carries the fields attached at each call site
//! (`correlation_id`, `method`, `pid`, ...) as top-level keys.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Outcome of [`init_telemetry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Installed {
    /// This call installed the global subscriber.
    Now,
    /// A global subscriber was already in place and was left alone.
    Already,
}

/// Install the global subscriber. Safe to call more than once; only the
/// first call in a process takes effect.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<Installed, TelemetryError> {
    let env_filter = EnvFilter::try_new(&config.log_level)
        .map_err(|e| TelemetryError::Filter(e.to_string()))?;

    let installed = if config.json_logs {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(config.thread_names)
            .with_current_span(true);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(config.thread_names)
            .with_ansi(false);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
    };

    match installed {
        Ok(()) => {
            tracing::info!(
                service = %config.service_name,
                level = %config.log_level,
                json = config.json_logs,
                "telemetry initialized"
            );
            Ok(Installed::Now)
        }
        Err(_) => Ok(Installed::Already),
    }
}
