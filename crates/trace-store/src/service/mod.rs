//! # In-Memory Trace Server
//!
//! The `TraceServer` implementation used as the trusted backend.
//!
//! ## Layout
//!
//! Each operation group lives in its own file as inherent methods; the trait
//! impl below only counts the invocation and delegates.

mod calls;
mod completions;
mod objects;
mod records;
mod tables;
#[cfg(test)]
mod tests;

use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use trace_types::*;

use crate::state::StoreState;

/// In-memory trace server.
#[derive(Default)]
pub struct InMemoryTraceServer {
    pub(crate) state: RwLock<StoreState>,
    invocations: AtomicUsize,
    /// When set, the next stream yields this many items and then fails.
    stream_fault: Mutex<Option<usize>>,
}

impl InMemoryTraceServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations served so far.
    pub fn invocation_count(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }

    /// Make the next streaming operation fail after `after` items.
    pub fn inject_stream_fault(&self, after: usize) {
        *self.stream_fault.lock() = Some(after);
    }

    fn record(&self, method: &'static str) {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(method, "trace store operation");
    }

    /// Turn materialized items into a stream, applying a pending fault.
    pub(crate) fn stream<T: Send + 'static>(&self, items: Vec<T>) -> TraceStream<T> {
        match self.stream_fault.lock().take() {
            None => stream_from_vec(items),
            Some(after) => {
                tracing::debug!(after, "injecting stream fault");
                let failure = TraceServerError::Internal(format!(
                    "injected stream fault after {} items",
                    after
                ));
                Box::new(
                    items
                        .into_iter()
                        .take(after)
                        .map(Ok)
                        .chain(std::iter::once(Err(failure))),
                )
            }
        }
    }
}

/// Apply `offset` then `limit` to an ordered sequence.
pub(crate) fn page<T>(
    items: impl Iterator<Item = T>,
    offset: Option<usize>,
    limit: Option<usize>,
) -> Vec<T> {
    items
        .skip(offset.unwrap_or(0))
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

impl TraceServer for InMemoryTraceServer {
    fn call_start(&self, req: CallStartReq) -> TraceResult<CallStartRes> {
        self.record("call_start");
        self.start_call(req)
    }

    fn call_end(&self, req: CallEndReq) -> TraceResult<CallEndRes> {
        self.record("call_end");
        self.end_call(req)
    }

    fn call_read(&self, req: CallReadReq) -> TraceResult<CallReadRes> {
        self.record("call_read");
        self.read_call(req)
    }

    fn calls_query(&self, req: CallsQueryReq) -> TraceResult<CallsQueryRes> {
        self.record("calls_query");
        Ok(CallsQueryRes {
            calls: self.query_calls(&req),
        })
    }

    fn calls_query_stream(&self, req: CallsQueryReq) -> TraceResult<TraceStream<CallSchema>> {
        self.record("calls_query_stream");
        Ok(self.stream(self.query_calls(&req)))
    }

    fn calls_query_stats(&self, req: CallsQueryStatsReq) -> TraceResult<CallsQueryStatsRes> {
        self.record("calls_query_stats");
        Ok(self.count_calls(req))
    }

    fn calls_delete(&self, req: CallsDeleteReq) -> TraceResult<CallsDeleteRes> {
        self.record("calls_delete");
        self.delete_calls(req)
    }

    fn call_update(&self, req: CallUpdateReq) -> TraceResult<CallUpdateRes> {
        self.record("call_update");
        self.update_call(req)
    }

    fn obj_create(&self, req: ObjCreateReq) -> TraceResult<ObjCreateRes> {
        self.record("obj_create");
        self.create_object(req)
    }

    fn obj_read(&self, req: ObjReadReq) -> TraceResult<ObjReadRes> {
        self.record("obj_read");
        self.read_object(req)
    }

    fn objs_query(&self, req: ObjsQueryReq) -> TraceResult<ObjsQueryRes> {
        self.record("objs_query");
        Ok(self.query_objects(req))
    }

    fn obj_delete(&self, req: ObjDeleteReq) -> TraceResult<ObjDeleteRes> {
        self.record("obj_delete");
        self.delete_object(req)
    }

    fn table_create(&self, req: TableCreateReq) -> TraceResult<TableCreateRes> {
        self.record("table_create");
        Ok(self.create_table(req))
    }

    fn table_query(&self, req: TableQueryReq) -> TraceResult<TableQueryRes> {
        self.record("table_query");
        Ok(TableQueryRes {
            rows: self.query_rows(&req)?,
        })
    }

    fn table_query_stream(&self, req: TableQueryReq) -> TraceResult<TraceStream<TableRowSchema>> {
        self.record("table_query_stream");
        Ok(self.stream(self.query_rows(&req)?))
    }

    fn table_query_stats(&self, req: TableQueryStatsReq) -> TraceResult<TableQueryStatsRes> {
        self.record("table_query_stats");
        self.count_rows(req)
    }

    fn refs_read_batch(&self, req: RefsReadBatchReq) -> TraceResult<RefsReadBatchRes> {
        self.record("refs_read_batch");
        self.read_refs(req)
    }

    fn file_create(&self, req: FileCreateReq) -> TraceResult<FileCreateRes> {
        self.record("file_create");
        Ok(self.create_file(req))
    }

    fn file_content_read(&self, req: FileContentReadReq) -> TraceResult<FileContentReadRes> {
        self.record("file_content_read");
        self.read_file(req)
    }

    fn feedback_create(&self, req: FeedbackCreateReq) -> TraceResult<FeedbackCreateRes> {
        self.record("feedback_create");
        self.create_feedback(req)
    }

    fn feedback_query(&self, req: FeedbackQueryReq) -> TraceResult<FeedbackQueryRes> {
        self.record("feedback_query");
        Ok(self.query_feedback(req))
    }

    fn feedback_purge(&self, req: FeedbackPurgeReq) -> TraceResult<FeedbackPurgeRes> {
        self.record("feedback_purge");
        Ok(self.purge_feedback(req))
    }

    fn cost_create(&self, req: CostCreateReq) -> TraceResult<CostCreateRes> {
        self.record("cost_create");
        self.create_costs(req)
    }

    fn cost_query(&self, req: CostQueryReq) -> TraceResult<CostQueryRes> {
        self.record("cost_query");
        Ok(self.query_costs(req))
    }

    fn cost_purge(&self, req: CostPurgeReq) -> TraceResult<CostPurgeRes> {
        self.record("cost_purge");
        Ok(self.purge_costs(req))
    }

    fn completions_create(&self, req: CompletionsCreateReq) -> TraceResult<CompletionsCreateRes> {
        self.record("completions_create");
        self.complete(req)
    }

    fn completions_create_stream(
        &self,
        req: CompletionsCreateReq,
    ) -> TraceResult<TraceStream<CompletionChunk>> {
        self.record("completions_create_stream");
        Ok(self.stream(self.complete_chunks(req)?))
    }

    fn threads_query_stream(&self, req: ThreadsQueryReq) -> TraceResult<TraceStream<ThreadSchema>> {
        self.record("threads_query_stream");
        Ok(self.stream(self.query_threads(req)))
    }
}
