//! # Trace Server Interface
//!
//! The full backend surface. Three things implement it:
//!
//! - the trusted in-memory store in the parent process
//! - the identity-enforcing adapter that wraps that store
//! - the IPC proxy used inside an isolated child process
//!
//! Because all three share this trait, code running in the child cannot tell
//! whether it talks to the real backend or to the proxy.
//!
//! ## Streaming
//!
//! Streaming operations return a [`TraceStream`]: a lazy, boxed iterator of
//! results. An `Err` item ends the stream; implementations must not yield
//! further items after one.

use crate::calls::*;
use crate::completions::*;
use crate::cost::*;
use crate::error::TraceResult;
use crate::feedback::*;
use crate::files::*;
use crate::objects::*;
use crate::refs::{RefsReadBatchReq, RefsReadBatchRes};
use crate::tables::*;
use crate::threads::*;

/// Lazy sequence returned by streaming operations.
pub type TraceStream<T> = Box<dyn Iterator<Item = TraceResult<T>> + Send>;

/// Wrap already-materialized items as a stream.
pub fn stream_from_vec<T: Send + 'static>(items: Vec<T>) -> TraceStream<T> {
    Box::new(items.into_iter().map(Ok))
}

/// The storage backend interface.
pub trait TraceServer: Send + Sync {
    // =========================================================================
    // CALLS
    // =========================================================================

    fn call_start(&self, req: CallStartReq) -> TraceResult<CallStartRes>;
    fn call_end(&self, req: CallEndReq) -> TraceResult<CallEndRes>;
    fn call_read(&self, req: CallReadReq) -> TraceResult<CallReadRes>;
    fn calls_query(&self, req: CallsQueryReq) -> TraceResult<CallsQueryRes>;
    fn calls_query_stream(&self, req: CallsQueryReq) -> TraceResult<TraceStream<CallSchema>>;
    fn calls_query_stats(&self, req: CallsQueryStatsReq) -> TraceResult<CallsQueryStatsRes>;
    fn calls_delete(&self, req: CallsDeleteReq) -> TraceResult<CallsDeleteRes>;
    fn call_update(&self, req: CallUpdateReq) -> TraceResult<CallUpdateRes>;

    // =========================================================================
    // OBJECTS
    // =========================================================================

    fn obj_create(&self, req: ObjCreateReq) -> TraceResult<ObjCreateRes>;
    fn obj_read(&self, req: ObjReadReq) -> TraceResult<ObjReadRes>;
    fn objs_query(&self, req: ObjsQueryReq) -> TraceResult<ObjsQueryRes>;
    fn obj_delete(&self, req: ObjDeleteReq) -> TraceResult<ObjDeleteRes>;

    // =========================================================================
    // TABLES
    // =========================================================================

    fn table_create(&self, req: TableCreateReq) -> TraceResult<TableCreateRes>;
    fn table_query(&self, req: TableQueryReq) -> TraceResult<TableQueryRes>;
    fn table_query_stream(&self, req: TableQueryReq) -> TraceResult<TraceStream<TableRowSchema>>;
    fn table_query_stats(&self, req: TableQueryStatsReq) -> TraceResult<TableQueryStatsRes>;

    // =========================================================================
    // REFS / FILES
    // =========================================================================

    fn refs_read_batch(&self, req: RefsReadBatchReq) -> TraceResult<RefsReadBatchRes>;
    fn file_create(&self, req: FileCreateReq) -> TraceResult<FileCreateRes>;
    fn file_content_read(&self, req: FileContentReadReq) -> TraceResult<FileContentReadRes>;

    // =========================================================================
    // FEEDBACK / COST
    // =========================================================================

    fn feedback_create(&self, req: FeedbackCreateReq) -> TraceResult<FeedbackCreateRes>;
    fn feedback_query(&self, req: FeedbackQueryReq) -> TraceResult<FeedbackQueryRes>;
    fn feedback_purge(&self, req: FeedbackPurgeReq) -> TraceResult<FeedbackPurgeRes>;
    fn cost_create(&self, req: CostCreateReq) -> TraceResult<CostCreateRes>;
    fn cost_query(&self, req: CostQueryReq) -> TraceResult<CostQueryRes>;
    fn cost_purge(&self, req: CostPurgeReq) -> TraceResult<CostPurgeRes>;

    // =========================================================================
    // COMPLETIONS / THREADS
    // =========================================================================

    fn completions_create(&self, req: CompletionsCreateReq) -> TraceResult<CompletionsCreateRes>;
    fn completions_create_stream(
        &self,
        req: CompletionsCreateReq,
    ) -> TraceResult<TraceStream<CompletionChunk>>;
    fn threads_query_stream(&self, req: ThreadsQueryReq) -> TraceResult<TraceStream<ThreadSchema>>;
}
