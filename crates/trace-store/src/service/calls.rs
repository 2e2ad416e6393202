//! Call lifecycle.

use std::collections::HashSet;

use serde_json::Value;
use trace_types::*;
use uuid::Uuid;

use super::{page, InMemoryTraceServer};

impl InMemoryTraceServer {
    pub(crate) fn start_call(&self, req: CallStartReq) -> TraceResult<CallStartRes> {
        let start = req.start;
        let id = start.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let trace_id = start.trace_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut state = self.state.write();
        let project = state.project_mut(&start.project_id);
        if project.call(&id).is_some() {
            return Err(TraceServerError::InvalidRequest(format!(
                "call {} already started",
                id
            )));
        }
        project.calls.push(CallSchema {
            id: id.clone(),
            project_id: start.project_id,
            op_name: start.op_name,
            display_name: start.display_name,
            trace_id: trace_id.clone(),
            parent_id: start.parent_id,
            thread_id: start.thread_id,
            started_at: start.started_at,
            ended_at: None,
            attributes: start.attributes,
            inputs: start.inputs,
            output: None,
            exception: None,
            summary: Value::Null,
            user_id: start.user_id,
        });
        Ok(CallStartRes { id, trace_id })
    }

    pub(crate) fn end_call(&self, req: CallEndReq) -> TraceResult<CallEndRes> {
        let end = req.end;
        let mut state = self.state.write();
        let call = state
            .project_mut(&end.project_id)
            .call_mut(&end.id)
            .ok_or_else(|| TraceServerError::NotFound(format!("call {}", end.id)))?;
        if call.ended_at.is_some() {
            return Err(TraceServerError::InvalidRequest(format!(
                "call {} already ended",
                end.id
            )));
        }
        call.ended_at = Some(end.ended_at);
        call.output = end.output;
        call.exception = end.exception;
        call.summary = end.summary;
        Ok(CallEndRes {})
    }

    pub(crate) fn read_call(&self, req: CallReadReq) -> TraceResult<CallReadRes> {
        let state = self.state.read();
        let call = state
            .project(&req.project_id)
            .and_then(|p| p.call(&req.id))
            .cloned();
        Ok(CallReadRes { call })
    }

    /// Matching calls ordered by start time, then paged.
    pub(crate) fn query_calls(&self, req: &CallsQueryReq) -> Vec<CallSchema> {
        let state = self.state.read();
        let Some(project) = state.project(&req.project_id) else {
            return Vec::new();
        };
        let mut matching: Vec<&CallSchema> = project
            .calls
            .iter()
            .filter(|c| req.filter.matches(c))
            .collect();
        matching.sort_by_key(|c| c.started_at);
        page(matching.into_iter().cloned(), req.offset, req.limit)
    }

    pub(crate) fn count_calls(&self, req: CallsQueryStatsReq) -> CallsQueryStatsRes {
        let state = self.state.read();
        let count = state.project(&req.project_id).map_or(0, |p| {
            p.calls.iter().filter(|c| req.filter.matches(c)).count()
        });
        CallsQueryStatsRes { count }
    }

    /// Deletes the listed calls together with all of their descendants.
    pub(crate) fn delete_calls(&self, req: CallsDeleteReq) -> TraceResult<CallsDeleteRes> {
        let mut state = self.state.write();
        let project = state.project_mut(&req.project_id);

        let mut doomed: HashSet<String> = req
            .call_ids
            .iter()
            .filter(|id| project.call(id).is_some())
            .cloned()
            .collect();
        loop {
            let children: Vec<String> = project
                .calls
                .iter()
                .filter(|c| !doomed.contains(&c.id))
                .filter(|c| c.parent_id.as_ref().is_some_and(|p| doomed.contains(p)))
                .map(|c| c.id.clone())
                .collect();
            if children.is_empty() {
                break;
            }
            doomed.extend(children);
        }

        let before = project.calls.len();
        project.calls.retain(|c| !doomed.contains(&c.id));
        let num_deleted = before - project.calls.len();
        tracing::debug!(project_id = %req.project_id, num_deleted, "calls deleted");
        Ok(CallsDeleteRes { num_deleted })
    }

    pub(crate) fn update_call(&self, req: CallUpdateReq) -> TraceResult<CallUpdateRes> {
        let mut state = self.state.write();
        let call = state
            .project_mut(&req.project_id)
            .call_mut(&req.call_id)
            .ok_or_else(|| TraceServerError::NotFound(format!("call {}", req.call_id)))?;
        if let Some(name) = req.display_name {
            call.display_name = Some(name);
        }
        Ok(CallUpdateRes {})
    }
}
