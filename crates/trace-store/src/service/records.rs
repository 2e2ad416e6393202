//! Refs, files, feedback and cost records.

use chrono::Utc;
use serde_json::Value;
use trace_types::*;
use uuid::Uuid;

use super::InMemoryTraceServer;
use crate::digest::digest_bytes;
use crate::state::ProjectState;

impl InMemoryTraceServer {
    // =========================================================================
    // REFS
    // =========================================================================

    /// Resolve internal refs to values, preserving request order. One missing
    /// ref fails the whole batch.
    pub(crate) fn read_refs(&self, req: RefsReadBatchReq) -> TraceResult<RefsReadBatchRes> {
        let state = self.state.read();
        let vals = req
            .refs
            .iter()
            .map(|uri| {
                let r = TraceRef::parse_internal(uri)?;
                let project = state
                    .project(&r.project_id)
                    .ok_or_else(|| TraceServerError::NotFound(uri.clone()))?;
                resolve(project, &r).ok_or_else(|| TraceServerError::NotFound(uri.clone()))?
            })
            .collect::<TraceResult<Vec<_>>>()?;
        Ok(RefsReadBatchRes { vals })
    }

    // =========================================================================
    // FILES
    // =========================================================================

    pub(crate) fn create_file(&self, req: FileCreateReq) -> FileCreateRes {
        let digest = digest_bytes(&req.content);
        tracing::debug!(name = %req.name, %digest, bytes = req.content.len(), "file stored");
        self.state
            .write()
            .project_mut(&req.project_id)
            .files
            .insert(digest.clone(), req.content);
        FileCreateRes { digest }
    }

    pub(crate) fn read_file(&self, req: FileContentReadReq) -> TraceResult<FileContentReadRes> {
        let state = self.state.read();
        state
            .project(&req.project_id)
            .and_then(|p| p.files.get(&req.digest))
            .map(|content| FileContentReadRes {
                content: content.clone(),
            })
            .ok_or_else(|| TraceServerError::NotFound(format!("file {}", req.digest)))
    }

    // =========================================================================
    // FEEDBACK
    // =========================================================================

    pub(crate) fn create_feedback(&self, req: FeedbackCreateReq) -> TraceResult<FeedbackCreateRes> {
        let user_id = req.user_id.ok_or_else(|| TraceServerError::required("user_id"))?;
        let target = TraceRef::parse_internal(&req.object_ref)?;
        if target.project_id != req.project_id {
            return Err(TraceServerError::InvalidRequest(format!(
                "feedback ref {} points outside project {}",
                req.object_ref, req.project_id
            )));
        }

        let entry = Feedback {
            id: Uuid::new_v4().to_string(),
            project_id: req.project_id,
            object_ref: req.object_ref,
            feedback_type: req.feedback_type,
            payload: req.payload,
            created_at: Utc::now(),
            user_id,
        };
        let res = FeedbackCreateRes {
            id: entry.id.clone(),
            created_at: entry.created_at,
            user_id: entry.user_id.clone(),
        };
        let mut state = self.state.write();
        state.project_mut(&entry.project_id).feedback.push(entry.clone());
        Ok(res)
    }

    pub(crate) fn query_feedback(&self, req: FeedbackQueryReq) -> FeedbackQueryRes {
        let state = self.state.read();
        let result = state
            .project(&req.project_id)
            .map(|p| {
                p.feedback
                    .iter()
                    .filter(|f| {
                        req.feedback_type
                            .as_ref()
                            .map_or(true, |t| &f.feedback_type == t)
                    })
                    .filter(|f| {
                        req.object_refs
                            .as_ref()
                            .map_or(true, |refs| refs.contains(&f.object_ref))
                    })
                    .take(req.limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        FeedbackQueryRes { result }
    }

    pub(crate) fn purge_feedback(&self, req: FeedbackPurgeReq) -> FeedbackPurgeRes {
        let mut state = self.state.write();
        let feedback = &mut state.project_mut(&req.project_id).feedback;
        let before = feedback.len();
        feedback.retain(|f| !req.ids.contains(&f.id));
        FeedbackPurgeRes {
            num_deleted: before - feedback.len(),
        }
    }

    // =========================================================================
    // COST
    // =========================================================================

    pub(crate) fn create_costs(&self, req: CostCreateReq) -> TraceResult<CostCreateRes> {
        let created_by = req.user_id.ok_or_else(|| TraceServerError::required("user_id"))?;
        let mut state = self.state.write();
        let costs = &mut state.project_mut(&req.project_id).costs;

        let mut ids = Vec::with_capacity(req.costs.len());
        for (llm_id, input) in req.costs {
            let id = Uuid::new_v4().to_string();
            costs.push(CostQueryOutput {
                id: id.clone(),
                llm_id: llm_id.clone(),
                prompt_token_cost: input.prompt_token_cost,
                completion_token_cost: input.completion_token_cost,
                provider_id: input.provider_id,
                created_by: created_by.clone(),
            });
            ids.push(CostCreateId { llm_id, id });
        }
        Ok(CostCreateRes { ids })
    }

    pub(crate) fn query_costs(&self, req: CostQueryReq) -> CostQueryRes {
        let state = self.state.read();
        let results = state
            .project(&req.project_id)
            .map(|p| {
                p.costs
                    .iter()
                    .filter(|c| {
                        req.llm_ids
                            .as_ref()
                            .map_or(true, |ids| ids.contains(&c.llm_id))
                    })
                    .take(req.limit.unwrap_or(usize::MAX))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        CostQueryRes { results }
    }

    pub(crate) fn purge_costs(&self, req: CostPurgeReq) -> CostPurgeRes {
        self.state
            .write()
            .project_mut(&req.project_id)
            .costs
            .retain(|c| !req.ids.contains(&c.id));
        CostPurgeRes {}
    }
}

fn resolve(project: &ProjectState, r: &TraceRef) -> Option<TraceResult<Value>> {
    match r.kind {
        RefKind::Object => {
            let digest = r.digest.as_deref()?;
            project
                .object_version(&r.name, digest)
                .map(|o| Ok(o.val.clone()))
        }
        RefKind::Table => project.tables.get(&r.name).map(|rows| {
            Ok(Value::Array(rows.iter().map(|row| row.val.clone()).collect()))
        }),
        RefKind::Call => project
            .call(&r.name)
            .map(|c| serde_json::to_value(c).map_err(|e| TraceServerError::Internal(e.to_string()))),
    }
}
