//! Echo completions and thread aggregation.
//!
//! Completions are deterministic: the reply echoes the last user message.
//! That is enough to exercise recording, streaming and identity handling
//! without a model provider.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use trace_types::*;

use super::InMemoryTraceServer;

const COMPLETION_OP_NAME: &str = "completions_create";

fn echo_reply(inputs: &CompletionsInputs) -> TraceResult<String> {
    if inputs.model.is_empty() {
        return Err(TraceServerError::InvalidRequest("model is required".into()));
    }
    let last_user = inputs
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .ok_or_else(|| TraceServerError::InvalidRequest("no user message".into()))?;
    Ok(format!("echo: {}", last_user.content))
}

impl InMemoryTraceServer {
    pub(crate) fn complete(&self, req: CompletionsCreateReq) -> TraceResult<CompletionsCreateRes> {
        let reply = echo_reply(&req.inputs)?;
        let prompt_tokens: usize = req
            .inputs
            .messages
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .sum();
        let response = json!({
            "model": req.inputs.model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": reply},
                "finish_reason": "stop",
            }],
            "usage": {
                "prompt_tokens": prompt_tokens,
                "completion_tokens": reply.split_whitespace().count(),
            },
        });

        let call_id = if req.track_llm_call.unwrap_or(true) {
            Some(self.record_completion(&req, &response)?)
        } else {
            None
        };
        Ok(CompletionsCreateRes { response, call_id })
    }

    /// The reply split into one chunk per word. The last chunk carries the
    /// finish reason.
    pub(crate) fn complete_chunks(&self, req: CompletionsCreateReq) -> TraceResult<Vec<CompletionChunk>> {
        let reply = echo_reply(&req.inputs)?;
        let words: Vec<&str> = reply.split_whitespace().collect();
        let last = words.len().saturating_sub(1);
        Ok(words
            .iter()
            .enumerate()
            .map(|(index, word)| CompletionChunk {
                index,
                delta: if index == last {
                    (*word).to_string()
                } else {
                    format!("{} ", word)
                },
                finish_reason: (index == last).then(|| "stop".to_string()),
            })
            .collect())
    }

    fn record_completion(&self, req: &CompletionsCreateReq, response: &Value) -> TraceResult<String> {
        let started = self.start_call(CallStartReq {
            start: StartedCall {
                project_id: req.project_id.clone(),
                id: None,
                trace_id: None,
                parent_id: None,
                thread_id: None,
                op_name: COMPLETION_OP_NAME.to_string(),
                display_name: None,
                started_at: Utc::now(),
                attributes: Value::Null,
                inputs: serde_json::to_value(&req.inputs)?,
                user_id: req.user_id.clone(),
            },
        })?;
        self.end_call(CallEndReq {
            end: EndedCall {
                project_id: req.project_id.clone(),
                id: started.id.clone(),
                ended_at: Utc::now(),
                output: Some(response.clone()),
                exception: None,
                summary: Value::Null,
            },
        })?;
        Ok(started.id)
    }

    /// Threads built from root calls that carry a `thread_id`, most recently
    /// updated first.
    pub(crate) fn query_threads(&self, req: ThreadsQueryReq) -> Vec<ThreadSchema> {
        let state = self.state.read();
        let Some(project) = state.project(&req.project_id) else {
            return Vec::new();
        };

        let mut threads: BTreeMap<&str, (usize, DateTime<Utc>, DateTime<Utc>)> = BTreeMap::new();
        for call in project.calls.iter().filter(|c| c.parent_id.is_none()) {
            let Some(thread_id) = call.thread_id.as_deref() else {
                continue;
            };
            let touched = call.ended_at.unwrap_or(call.started_at);
            threads
                .entry(thread_id)
                .and_modify(|(turns, start, last)| {
                    *turns += 1;
                    *start = (*start).min(call.started_at);
                    *last = (*last).max(touched);
                })
                .or_insert((1, call.started_at, touched));
        }

        let mut out: Vec<ThreadSchema> = threads
            .into_iter()
            .map(|(thread_id, (turn_count, start_time, last_updated))| ThreadSchema {
                thread_id: thread_id.to_string(),
                turn_count,
                start_time,
                last_updated,
            })
            .collect();
        out.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        out.truncate(req.limit.unwrap_or(usize::MAX));
        out
    }
}
