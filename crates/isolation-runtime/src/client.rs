//! # Scoped Client
//!
//! The minimal client handed to target functions. It is bound to one project
//! and user, and only ever talks to a `TraceServer` it was given (inside the
//! child, the IPC Sender).

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use trace_types::{
    CallEndReq, CallSchema, CallStartReq, CallsFilter, CallsQueryReq, EndedCall, ObjCreateReq,
    ObjSchemaForInsert, RefsReadBatchReq, StartedCall, TraceRef, TraceResult, TraceServer,
    TraceServerError,
};

/// Project-scoped convenience layer over a `TraceServer`.
#[derive(Clone)]
pub struct ScopedClient {
    server: Arc<dyn TraceServer>,
    project_id: String,
    user_id: String,
}

impl ScopedClient {
    /// `project_id` is in external form.
    pub fn new(
        server: Arc<dyn TraceServer>,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            server,
            project_id: project_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The underlying server, for operations the client does not wrap.
    pub fn server(&self) -> &Arc<dyn TraceServer> {
        &self.server
    }

    /// Resolve one external ref to its stored value.
    pub fn get(&self, uri: &str) -> TraceResult<Value> {
        let res = self.server.refs_read_batch(RefsReadBatchReq {
            refs: vec![uri.to_string()],
        })?;
        res.vals
            .into_iter()
            .next()
            .ok_or_else(|| TraceServerError::NotFound(uri.to_string()))
    }

    /// Publish `val` as a new version of object `name`; returns its external ref.
    pub fn save(&self, name: &str, val: Value) -> TraceResult<String> {
        let res = self.server.obj_create(ObjCreateReq {
            obj: ObjSchemaForInsert {
                project_id: self.project_id.clone(),
                object_id: name.to_string(),
                val,
                user_id: Some(self.user_id.clone()),
            },
        })?;
        Ok(TraceRef::object(&self.project_id, name, &res.digest).to_external_uri())
    }

    /// Open a root call; returns its id.
    pub fn start_call(&self, op_name: &str, inputs: Value) -> TraceResult<String> {
        let res = self.server.call_start(CallStartReq {
            start: StartedCall {
                project_id: self.project_id.clone(),
                id: None,
                trace_id: None,
                parent_id: None,
                thread_id: None,
                op_name: op_name.to_string(),
                display_name: None,
                started_at: Utc::now(),
                attributes: Value::Null,
                inputs,
                user_id: Some(self.user_id.clone()),
            },
        })?;
        Ok(res.id)
    }

    /// Close a call opened with [`start_call`](Self::start_call).
    pub fn finish_call(
        &self,
        call_id: &str,
        output: Option<Value>,
        exception: Option<String>,
    ) -> TraceResult<()> {
        self.server.call_end(CallEndReq {
            end: EndedCall {
                project_id: self.project_id.clone(),
                id: call_id.to_string(),
                ended_at: Utc::now(),
                output,
                exception,
                summary: Value::Null,
            },
        })?;
        Ok(())
    }

    pub fn query_calls(&self, filter: CallsFilter) -> TraceResult<Vec<CallSchema>> {
        let res = self.server.calls_query(CallsQueryReq {
            project_id: self.project_id.clone(),
            filter,
            limit: None,
            offset: None,
        })?;
        Ok(res.calls)
    }
}

impl std::fmt::Debug for ScopedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedClient")
            .field("project_id", &self.project_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}
