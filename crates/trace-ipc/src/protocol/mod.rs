//! # Protocol Messages
//!
//! Two envelopes cross the process boundary:
//!
//! - [`RpcRequest`] `{correlation_id, method, payload}`, built by the Sender
//!   and consumed exactly once by the Receiver
//! - [`RpcResponse`] `{correlation_id, error, payload}`, one per unary request,
//!   or zero or more data responses plus one terminal response per stream
//!
//! The envelopes keep `method` as a string and `payload` as raw JSON so a
//! request naming an unknown method, or carrying a malformed payload, can still
//! be answered under its own correlation id. The typed [`RpcMethod`] is decoded
//! from them afterwards.
//!
//! ## Reserved Values
//!
//! | Value | Field | Meaning |
//! |-------|-------|---------|
//! | [`STOP_METHOD`] | request `method` | shut the worker loop down; never dispatched |
//! | [`STREAM_END`] | response `error` | the stream finished; not an error |

mod method;

pub use method::RpcMethod;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request method asking the worker loop to exit.
pub const STOP_METHOD: &str = "__stop__";

/// Response error value terminating a stream.
pub const STREAM_END: &str = "__stream_end__";

// =============================================================================
// REQUEST
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub correlation_id: String,
    pub method: String,
    #[serde(default)]
    pub payload: Value,
}

impl RpcRequest {
    /// Envelope a typed call.
    pub fn new(correlation_id: String, call: &RpcMethod) -> Result<Self, serde_json::Error> {
        Ok(Self {
            correlation_id,
            method: call.name().to_string(),
            payload: call.payload()?,
        })
    }

    pub fn stop(correlation_id: String) -> Self {
        Self {
            correlation_id,
            method: STOP_METHOD.to_string(),
            payload: Value::Null,
        }
    }

    pub fn is_stop(&self) -> bool {
        self.method == STOP_METHOD
    }

    /// Decode the typed call this request carries.
    pub fn decode(&self) -> Result<RpcMethod, serde_json::Error> {
        RpcMethod::decode(&self.method, self.payload.clone())
    }
}

// =============================================================================
// RESPONSE
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub correlation_id: String,
    pub error: Option<String>,
    pub payload: Option<Value>,
}

impl RpcResponse {
    pub fn ok(correlation_id: &str, payload: Value) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            error: None,
            payload: Some(payload),
        }
    }

    pub fn err(correlation_id: &str, error: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.to_string(),
            error: Some(error.into()),
            payload: None,
        }
    }

    pub fn stream_end(correlation_id: &str) -> Self {
        Self::err(correlation_id, STREAM_END)
    }

    pub fn is_stream_end(&self) -> bool {
        self.error.as_deref() == Some(STREAM_END)
    }

    /// A real error, as opposed to the stream-end marker.
    pub fn failure(&self) -> Option<&str> {
        self.error.as_deref().filter(|e| *e != STREAM_END)
    }
}
