//! IPC timing configuration from environment variables.

use std::env;
use std::time::Duration;

/// Timeouts and poll cadence shared by the Receiver and Sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpcConfig {
    /// How long a Sender waits for the response to a unary call.
    pub call_timeout: Duration,

    /// How long a Sender waits for each item of a streaming call.
    pub stream_timeout: Duration,

    /// Receive timeout of a single poll. Bounds how long a stop flag or a
    /// cached response can go unnoticed.
    pub poll_interval: Duration,

    /// Upper bound on joining the worker thread during `Receiver::stop`.
    pub stop_join_timeout: Duration,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(60),
            stream_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(100),
            stop_join_timeout: Duration::from_secs(5),
        }
    }
}

impl IpcConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `TRACE_IPC_CALL_TIMEOUT_SECS`: unary response timeout (default: 60)
    /// - `TRACE_IPC_STREAM_TIMEOUT_SECS`: per-item stream timeout (default: 10)
    /// - `TRACE_IPC_POLL_INTERVAL_MS`: receive poll slice (default: 100)
    /// - `TRACE_IPC_STOP_JOIN_TIMEOUT_SECS`: worker join bound (default: 5)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            call_timeout: env_secs("TRACE_IPC_CALL_TIMEOUT_SECS").unwrap_or(defaults.call_timeout),
            stream_timeout: env_secs("TRACE_IPC_STREAM_TIMEOUT_SECS")
                .unwrap_or(defaults.stream_timeout),
            poll_interval: env::var("TRACE_IPC_POLL_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            stop_join_timeout: env_secs("TRACE_IPC_STOP_JOIN_TIMEOUT_SECS")
                .unwrap_or(defaults.stop_join_timeout),
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env::var(key).ok().and_then(|v| parse_secs(&v))
}

/// Positive seconds that fit in a `Duration`.
fn parse_secs(value: &str) -> Option<Duration> {
    value
        .parse::<f64>()
        .ok()
        .filter(|secs| *secs > 0.0)
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}
