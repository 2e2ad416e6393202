//! Runtime configuration from environment variables.

use std::env;
use std::time::Duration;

use trace_ipc::IpcConfig;

/// Placeholder entity used when the backend has no entity concept.
pub const DEFAULT_SERVER_ENTITY: &str = "__server__";

/// Settings for RunAsUser invocations.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeConfig {
    /// Timeout applied by RunModel when the caller gives none. `None` waits
    /// for the child indefinitely.
    pub default_timeout: Option<Duration>,

    /// Entity prefix of external project ids (`{entity}/{project}`).
    pub server_entity: String,

    /// Timing of the channel between child and parent.
    pub ipc: IpcConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_timeout: None,
            server_entity: DEFAULT_SERVER_ENTITY.to_string(),
            ipc: IpcConfig::default(),
        }
    }
}

impl RuntimeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TRACE_RUN_TIMEOUT_SECS`: default child timeout, fractional seconds (default: none)
    /// - `TRACE_SERVER_ENTITY`: placeholder entity (default: "__server__")
    /// - `TRACE_IPC_*`: see [`IpcConfig::from_env`]
    pub fn from_env() -> Self {
        Self {
            default_timeout: env::var("TRACE_RUN_TIMEOUT_SECS")
                .ok()
                .and_then(|v| timeout_secs(&v)),
            server_entity: env::var("TRACE_SERVER_ENTITY")
                .ok()
                .filter(|v| !v.is_empty() && !v.contains('/'))
                .unwrap_or_else(|| DEFAULT_SERVER_ENTITY.to_string()),
            ipc: IpcConfig::from_env(),
        }
    }

    /// External form of an internal project id.
    pub fn external_project_id(&self, internal: &str) -> String {
        format!("{}/{}", self.server_entity, internal)
    }
}

/// Positive fractional seconds that fit in a `Duration`.
fn timeout_secs(value: &str) -> Option<Duration> {
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
