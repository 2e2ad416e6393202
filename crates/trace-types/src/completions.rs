//! # Completion Payloads
//!
//! Server-side LLM completions, optionally recorded as a call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionsInputs {
    pub model: String,
    pub messages: Vec<CompletionMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Shared by `completions_create` and `completions_create_stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionsCreateReq {
    pub project_id: String,
    pub inputs: CompletionsInputs,
    pub user_id: Option<String>,
    /// Record the completion as a call. Defaults to true.
    pub track_llm_call: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionsCreateRes {
    pub response: Value,
    pub call_id: Option<String>,
}

/// One increment of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionChunk {
    pub index: usize,
    pub delta: String,
    pub finish_reason: Option<String>,
}
