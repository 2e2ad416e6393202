//! # Trace Telemetry
//!
//! Logging bootstrap shared by the `isolated-runner` binary and tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trace_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_telemetry(&TelemetryConfig::from_env())?;
//!     // ...
//!     Ok(())
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `isolated-trace-runtime` | Service name on every record |
//! | `TRACE_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `TRACE_JSON_LOGS` | `false` | JSON lines instead of human-readable output |

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::{init_telemetry, Installed};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),
}
