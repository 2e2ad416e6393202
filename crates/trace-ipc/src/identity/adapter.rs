//! The identity-enforcing `TraceServer` wrapper.

use std::sync::Arc;

use serde_json::Value;
use trace_types::*;

use super::{IdConverter, IdentityContext};

/// Wraps the real backend and enforces the bound identity on every call.
///
/// Requests arrive with external project ids and external refs; they are
/// checked, translated to internal form and forwarded. Records coming back are
/// translated to external form again.
pub struct IdentityEnforcingServer {
    inner: Arc<dyn TraceServer>,
    context: IdentityContext,
    converter: Arc<dyn IdConverter>,
    /// `context.project_id` in internal form.
    internal_project_id: String,
}

impl IdentityEnforcingServer {
    /// Fails if the bound project id itself cannot be translated.
    pub fn new(
        inner: Arc<dyn TraceServer>,
        context: IdentityContext,
        converter: Arc<dyn IdConverter>,
    ) -> TraceResult<Self> {
        let internal_project_id = converter.ext_to_int_project_id(context.project_id())?;
        Ok(Self {
            inner,
            context,
            converter,
            internal_project_id,
        })
    }

    pub fn context(&self) -> &IdentityContext {
        &self.context
    }

    // =========================================================================
    // CHECKS
    // =========================================================================

    /// Check a claimed external project id and return its internal form.
    fn project(&self, claimed: &str) -> TraceResult<String> {
        // 1. Presence
        if claimed.is_empty() {
            tracing::warn!(field = "project_id", "refusing call without project id");
            return Err(TraceServerError::required("project_id"));
        }

        // 2. Translation
        let internal = self.converter.ext_to_int_project_id(claimed)?;

        // 3. Equality with the bound project
        if internal != self.internal_project_id {
            tracing::warn!(
                field = "project_id",
                expected = %self.context.project_id(),
                actual = %claimed,
                "refusing call for foreign project"
            );
            return Err(TraceServerError::mismatch(
                "project_id",
                self.context.project_id(),
                claimed,
            ));
        }
        Ok(internal)
    }

    /// Inject the bound user when absent, refuse any other user.
    fn user(&self, claimed: Option<String>) -> TraceResult<String> {
        match claimed {
            None => Ok(self.context.user_id().to_string()),
            Some(user) if user == self.context.user_id() => Ok(user),
            Some(user) => {
                tracing::warn!(
                    field = "user_id",
                    expected = %self.context.user_id(),
                    actual = %user,
                    "refusing call for foreign user"
                );
                Err(TraceServerError::mismatch(
                    "user_id",
                    self.context.user_id(),
                    &user,
                ))
            }
        }
    }

    /// Check an external ref and return it in internal form.
    fn internal_ref(&self, external: &str) -> TraceResult<TraceRef> {
        let parsed = TraceRef::parse_external(external)?;
        let internal = self.project(&parsed.project_id)?;
        Ok(parsed.with_project(&internal))
    }

    // =========================================================================
    // OUTBOUND TRANSLATION
    // =========================================================================

    fn external_project(&self, internal: &str) -> TraceResult<String> {
        self.converter.int_to_ext_project_id(internal)
    }

    fn external_obj(&self, mut obj: ObjSchema) -> TraceResult<ObjSchema> {
        obj.project_id = self.external_project(&obj.project_id)?;
        Ok(obj)
    }

    fn external_feedback(&self, mut feedback: Feedback) -> TraceResult<Feedback> {
        let target = TraceRef::parse_internal(&feedback.object_ref)?;
        let project_id = self.external_project(&feedback.project_id)?;
        feedback.object_ref = target.with_project(&project_id).to_external_uri();
        feedback.project_id = project_id;
        Ok(feedback)
    }
}

fn external_call(converter: &dyn IdConverter, mut call: CallSchema) -> TraceResult<CallSchema> {
    call.project_id = converter.int_to_ext_project_id(&call.project_id)?;
    Ok(call)
}

impl TraceServer for IdentityEnforcingServer {
    fn call_start(&self, mut req: CallStartReq) -> TraceResult<CallStartRes> {
        req.start.project_id = self.project(&req.start.project_id)?;
        req.start.user_id = Some(self.user(req.start.user_id.take())?);
        self.inner.call_start(req)
    }

    fn call_end(&self, mut req: CallEndReq) -> TraceResult<CallEndRes> {
        req.end.project_id = self.project(&req.end.project_id)?;
        self.inner.call_end(req)
    }

    fn call_read(&self, mut req: CallReadReq) -> TraceResult<CallReadRes> {
        req.project_id = self.project(&req.project_id)?;
        let res = self.inner.call_read(req)?;
        Ok(CallReadRes {
            call: res
                .call
                .map(|c| external_call(self.converter.as_ref(), c))
                .transpose()?,
        })
    }

    fn calls_query(&self, mut req: CallsQueryReq) -> TraceResult<CallsQueryRes> {
        req.project_id = self.project(&req.project_id)?;
        let res = self.inner.calls_query(req)?;
        Ok(CallsQueryRes {
            calls: res
                .calls
                .into_iter()
                .map(|c| external_call(self.converter.as_ref(), c))
                .collect::<TraceResult<_>>()?,
        })
    }

    fn calls_query_stream(&self, mut req: CallsQueryReq) -> TraceResult<TraceStream<CallSchema>> {
        req.project_id = self.project(&req.project_id)?;
        let stream = self.inner.calls_query_stream(req)?;
        let converter = Arc::clone(&self.converter);
        Ok(Box::new(stream.map(move |item| {
            item.and_then(|c| external_call(converter.as_ref(), c))
        })))
    }

    fn calls_query_stats(&self, mut req: CallsQueryStatsReq) -> TraceResult<CallsQueryStatsRes> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.calls_query_stats(req)
    }

    fn calls_delete(&self, mut req: CallsDeleteReq) -> TraceResult<CallsDeleteRes> {
        req.project_id = self.project(&req.project_id)?;
        req.user_id = Some(self.user(req.user_id.take())?);
        self.inner.calls_delete(req)
    }

    fn call_update(&self, mut req: CallUpdateReq) -> TraceResult<CallUpdateRes> {
        req.project_id = self.project(&req.project_id)?;
        req.user_id = Some(self.user(req.user_id.take())?);
        self.inner.call_update(req)
    }

    fn obj_create(&self, mut req: ObjCreateReq) -> TraceResult<ObjCreateRes> {
        req.obj.project_id = self.project(&req.obj.project_id)?;
        req.obj.user_id = Some(self.user(req.obj.user_id.take())?);
        self.inner.obj_create(req)
    }

    fn obj_read(&self, mut req: ObjReadReq) -> TraceResult<ObjReadRes> {
        req.project_id = self.project(&req.project_id)?;
        let res = self.inner.obj_read(req)?;
        Ok(ObjReadRes {
            obj: self.external_obj(res.obj)?,
        })
    }

    fn objs_query(&self, mut req: ObjsQueryReq) -> TraceResult<ObjsQueryRes> {
        req.project_id = self.project(&req.project_id)?;
        let res = self.inner.objs_query(req)?;
        Ok(ObjsQueryRes {
            objs: res
                .objs
                .into_iter()
                .map(|o| self.external_obj(o))
                .collect::<TraceResult<_>>()?,
        })
    }

    fn obj_delete(&self, mut req: ObjDeleteReq) -> TraceResult<ObjDeleteRes> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.obj_delete(req)
    }

    fn table_create(&self, mut req: TableCreateReq) -> TraceResult<TableCreateRes> {
        req.table.project_id = self.project(&req.table.project_id)?;
        self.inner.table_create(req)
    }

    fn table_query(&self, mut req: TableQueryReq) -> TraceResult<TableQueryRes> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.table_query(req)
    }

    fn table_query_stream(&self, mut req: TableQueryReq) -> TraceResult<TraceStream<TableRowSchema>> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.table_query_stream(req)
    }

    fn table_query_stats(&self, mut req: TableQueryStatsReq) -> TraceResult<TableQueryStatsRes> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.table_query_stats(req)
    }

    fn refs_read_batch(&self, req: RefsReadBatchReq) -> TraceResult<RefsReadBatchRes> {
        let refs = req
            .refs
            .iter()
            .map(|r| self.internal_ref(r))
            .collect::<TraceResult<Vec<_>>>()?;
        let res = self.inner.refs_read_batch(RefsReadBatchReq {
            refs: refs.iter().map(TraceRef::to_internal_uri).collect(),
        })?;

        // Call records embed their project id.
        let vals = refs
            .iter()
            .zip(res.vals)
            .map(|(r, mut val)| -> TraceResult<Value> {
                if r.kind == RefKind::Call {
                    if let Some(Value::String(project_id)) = val.get_mut("project_id") {
                        *project_id = self.external_project(project_id)?;
                    }
                }
                Ok(val)
            })
            .collect::<TraceResult<_>>()?;
        Ok(RefsReadBatchRes { vals })
    }

    fn file_create(&self, mut req: FileCreateReq) -> TraceResult<FileCreateRes> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.file_create(req)
    }

    fn file_content_read(&self, mut req: FileContentReadReq) -> TraceResult<FileContentReadRes> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.file_content_read(req)
    }

    fn feedback_create(&self, mut req: FeedbackCreateReq) -> TraceResult<FeedbackCreateRes> {
        req.project_id = self.project(&req.project_id)?;
        req.object_ref = self.internal_ref(&req.object_ref)?.to_internal_uri();
        req.user_id = Some(self.user(req.user_id.take())?);
        self.inner.feedback_create(req)
    }

    fn feedback_query(&self, mut req: FeedbackQueryReq) -> TraceResult<FeedbackQueryRes> {
        req.project_id = self.project(&req.project_id)?;
        if let Some(refs) = req.object_refs.take() {
            req.object_refs = Some(
                refs.iter()
                    .map(|r| self.internal_ref(r).map(|r| r.to_internal_uri()))
                    .collect::<TraceResult<_>>()?,
            );
        }
        let res = self.inner.feedback_query(req)?;
        Ok(FeedbackQueryRes {
            result: res
                .result
                .into_iter()
                .map(|f| self.external_feedback(f))
                .collect::<TraceResult<_>>()?,
        })
    }

    fn feedback_purge(&self, mut req: FeedbackPurgeReq) -> TraceResult<FeedbackPurgeRes> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.feedback_purge(req)
    }

    fn cost_create(&self, mut req: CostCreateReq) -> TraceResult<CostCreateRes> {
        req.project_id = self.project(&req.project_id)?;
        req.user_id = Some(self.user(req.user_id.take())?);
        self.inner.cost_create(req)
    }

    fn cost_query(&self, mut req: CostQueryReq) -> TraceResult<CostQueryRes> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.cost_query(req)
    }

    fn cost_purge(&self, mut req: CostPurgeReq) -> TraceResult<CostPurgeRes> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.cost_purge(req)
    }

    fn completions_create(&self, mut req: CompletionsCreateReq) -> TraceResult<CompletionsCreateRes> {
        req.project_id = self.project(&req.project_id)?;
        req.user_id = Some(self.user(req.user_id.take())?);
        self.inner.completions_create(req)
    }

    fn completions_create_stream(
        &self,
        mut req: CompletionsCreateReq,
    ) -> TraceResult<TraceStream<CompletionChunk>> {
        req.project_id = self.project(&req.project_id)?;
        req.user_id = Some(self.user(req.user_id.take())?);
        self.inner.completions_create_stream(req)
    }

    fn threads_query_stream(&self, mut req: ThreadsQueryReq) -> TraceResult<TraceStream<ThreadSchema>> {
        req.project_id = self.project(&req.project_id)?;
        self.inner.threads_query_stream(req)
    }
}
