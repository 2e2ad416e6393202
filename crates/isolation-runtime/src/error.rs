//! # RunAsUser Errors
//!
//! Every failure of a RunAsUser invocation surfaces as one `RunAsUserError`.
//! Messages keep fixed shapes callers may match on:
//!
//! | Variant | Message |
//! |---------|---------|
//! | `Identity` | `... does not match ...` |
//! | `Timeout` | `child process {pid} timed out after {N} seconds` |
//! | `Exit` | `child process {pid} exited with exit code: {N}` |

use thiserror::Error;
use trace_ipc::ChannelError;
use trace_types::TraceServerError;

#[derive(Debug, Error)]
pub enum RunAsUserError {
    /// The request failed validation before any child was spawned.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request's identity differs from the expected identity, or the
    /// identity could not be bound.
    #[error("identity check failed: {0}")]
    Identity(#[source] TraceServerError),

    /// The child was still running when the timeout elapsed. It has been
    /// killed and reaped.
    #[error("child process {pid} timed out after {seconds} seconds")]
    Timeout { pid: i32, seconds: f64 },

    /// The child ended with a non-zero status. Signal deaths carry the
    /// negated signal number.
    #[error("child process {pid} exited with exit code: {code}")]
    Exit { pid: i32, code: i32 },

    /// The child exited cleanly without producing a result.
    #[error("child process {pid} exited without producing a result")]
    MissingResult { pid: i32 },

    /// The child could not be created or supervised.
    #[error("process control failed: {0}")]
    Process(#[from] nix::Error),

    /// A channel between parent and child failed.
    #[error("channel failed: {0}")]
    Channel(#[from] ChannelError),
}

impl From<TraceServerError> for RunAsUserError {
    fn from(e: TraceServerError) -> Self {
        Self::Identity(e)
    }
}
