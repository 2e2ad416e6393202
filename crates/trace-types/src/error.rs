//! # Error Types
//!
//! The single error type shared by the backend, the identity adapter and the
//! IPC proxy. Every `TraceServer` method returns it, which is what lets the
//! child-side proxy stand in for the real backend.

use thiserror::Error;

/// Result alias used by every `TraceServer` operation.
pub type TraceResult<T> = Result<T, TraceServerError>;

/// Errors raised by trace server operations.
///
/// Variants are grouped by origin:
///
/// - backend: `NotFound`, `InvalidRequest`, `Internal`
/// - identity adapter: `IdentityRequired`, `IdentityMismatch`, `InvalidId`
/// - RPC layer: `Rpc`, `Timeout`, `Channel`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceServerError {
    /// The requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request payload is malformed or inconsistent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A tenant identifier was required but absent.
    #[error("{field} is required")]
    IdentityRequired { field: String },

    /// A caller-supplied identity differs from the bound identity.
    #[error("{field} '{actual}' does not match the bound {field} '{expected}'")]
    IdentityMismatch {
        field: String,
        expected: String,
        actual: String,
    },

    /// An identifier could not be translated between its external and
    /// internal representations.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The remote side reported an error. The original error type does not
    /// survive the process boundary, only its message.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// No matching response arrived within the per-call window.
    #[error("timed out after {timeout_ms}ms waiting for a response to {method}")]
    Timeout { method: String, timeout_ms: u64 },

    /// The transport between sender and receiver failed.
    #[error("channel error: {0}")]
    Channel(String),

    /// Unexpected backend failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TraceServerError {
    /// Shorthand for an identity mismatch on `field`.
    pub fn mismatch(field: &str, expected: &str, actual: &str) -> Self {
        Self::IdentityMismatch {
            field: field.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Shorthand for a missing identity on `field`.
    pub fn required(field: &str) -> Self {
        Self::IdentityRequired {
            field: field.to_string(),
        }
    }

    /// Whether this error was produced by the identity checks rather than the
    /// backend or the transport.
    #[must_use]
    pub fn is_identity_violation(&self) -> bool {
        matches!(
            self,
            Self::IdentityRequired { .. } | Self::IdentityMismatch { .. } | Self::InvalidId(_)
        )
    }
}

impl From<serde_json::Error> for TraceServerError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}
