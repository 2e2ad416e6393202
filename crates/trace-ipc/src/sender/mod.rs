//! # Sender
//!
//! Child-side proxy. Implements the whole `TraceServer` interface by sending
//! each call as a request and waiting for the response that carries the same
//! correlation id.
//!
//! ## Timeouts
//!
//! | Call kind | Bound |
//! |-----------|-------|
//! | unary | `IpcConfig::call_timeout` for the single response |
//! | streaming | `IpcConfig::stream_timeout` for each item |
//!
//! Errors reported by the remote side come back as `TraceServerError::Rpc`
//! carrying the remote message; the original error type does not cross the
//! process boundary.

mod router;
mod stream;

pub use router::{ResponseRouter, RouterStats};
pub use stream::ResponseStream;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use trace_types::*;

use crate::channel::ChannelSender;
use crate::config::IpcConfig;
use crate::protocol::{RpcMethod, RpcRequest};
use crate::receiver::ChannelHandles;

pub struct Sender {
    requests: Arc<ChannelSender>,
    router: Arc<ResponseRouter>,
    config: IpcConfig,
}

impl Sender {
    /// Build a Sender from channel ends alone, e.g. inside a child process.
    pub fn new(handles: ChannelHandles, config: IpcConfig) -> Self {
        Self {
            requests: handles.requests,
            router: Arc::new(ResponseRouter::new(handles.responses)),
            config,
        }
    }

    pub(crate) fn with_router(
        requests: Arc<ChannelSender>,
        router: Arc<ResponseRouter>,
        config: IpcConfig,
    ) -> Self {
        Self {
            requests,
            router,
            config,
        }
    }

    pub fn router(&self) -> &ResponseRouter {
        &self.router
    }

    /// Ask the Receiver's worker to exit. Best effort: failures are logged.
    pub fn stop(&self) {
        let stop = RpcRequest::stop(self.router.next_id());
        if let Err(e) = self.requests.send(&stop) {
            tracing::warn!(error = %e, "failed to send stop request");
        }
    }

    fn send(&self, call: &RpcMethod) -> TraceResult<String> {
        let correlation_id = self.router.next_id();
        let request = RpcRequest::new(correlation_id.clone(), call)
            .map_err(|e| TraceServerError::InvalidRequest(e.to_string()))?;
        self.requests
            .send(&request)
            .map_err(|e| TraceServerError::Channel(e.to_string()))?;
        tracing::trace!(%correlation_id, method = call.name(), "request sent");
        Ok(correlation_id)
    }

    fn unary<R: DeserializeOwned>(&self, call: RpcMethod) -> TraceResult<R> {
        let method = call.name();
        let correlation_id = self.send(&call)?;
        let response = self.router.wait(
            &correlation_id,
            method,
            self.config.call_timeout,
            self.config.poll_interval,
            false,
        )?;

        if response.is_stream_end() {
            return Err(TraceServerError::Rpc(format!(
                "unexpected end of stream in response to {}",
                method
            )));
        }
        if let Some(error) = response.error {
            return Err(TraceServerError::Rpc(error));
        }
        serde_json::from_value(response.payload.unwrap_or(Value::Null))
            .map_err(|e| TraceServerError::Rpc(format!("malformed {} response: {}", method, e)))
    }

    fn streaming<T>(&self, call: RpcMethod) -> TraceResult<TraceStream<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let method = call.name();
        let correlation_id = self.send(&call)?;
        Ok(Box::new(ResponseStream::<T>::new(
            Arc::clone(&self.router),
            correlation_id,
            method,
            self.config.stream_timeout,
            self.config.poll_interval,
        )))
    }
}

impl TraceServer for Sender {
    fn call_start(&self, req: CallStartReq) -> TraceResult<CallStartRes> {
        self.unary(RpcMethod::CallStart(req))
    }

    fn call_end(&self, req: CallEndReq) -> TraceResult<CallEndRes> {
        self.unary(RpcMethod::CallEnd(req))
    }

    fn call_read(&self, req: CallReadReq) -> TraceResult<CallReadRes> {
        self.unary(RpcMethod::CallRead(req))
    }

    fn calls_query(&self, req: CallsQueryReq) -> TraceResult<CallsQueryRes> {
        self.unary(RpcMethod::CallsQuery(req))
    }

    fn calls_query_stream(&self, req: CallsQueryReq) -> TraceResult<TraceStream<CallSchema>> {
        self.streaming(RpcMethod::CallsQueryStream(req))
    }

    fn calls_query_stats(&self, req: CallsQueryStatsReq) -> TraceResult<CallsQueryStatsRes> {
        self.unary(RpcMethod::CallsQueryStats(req))
    }

    fn calls_delete(&self, req: CallsDeleteReq) -> TraceResult<CallsDeleteRes> {
        self.unary(RpcMethod::CallsDelete(req))
    }

    fn call_update(&self, req: CallUpdateReq) -> TraceResult<CallUpdateRes> {
        self.unary(RpcMethod::CallUpdate(req))
    }

    fn obj_create(&self, req: ObjCreateReq) -> TraceResult<ObjCreateRes> {
        self.unary(RpcMethod::ObjCreate(req))
    }

    fn obj_read(&self, req: ObjReadReq) -> TraceResult<ObjReadRes> {
        self.unary(RpcMethod::ObjRead(req))
    }

    fn objs_query(&self, req: ObjsQueryReq) -> TraceResult<ObjsQueryRes> {
        self.unary(RpcMethod::ObjsQuery(req))
    }

    fn obj_delete(&self, req: ObjDeleteReq) -> TraceResult<ObjDeleteRes> {
        self.unary(RpcMethod::ObjDelete(req))
    }

    fn table_create(&self, req: TableCreateReq) -> TraceResult<TableCreateRes> {
        self.unary(RpcMethod::TableCreate(req))
    }

    fn table_query(&self, req: TableQueryReq) -> TraceResult<TableQueryRes> {
        self.unary(RpcMethod::TableQuery(req))
    }

    fn table_query_stream(&self, req: TableQueryReq) -> TraceResult<TraceStream<TableRowSchema>> {
        self.streaming(RpcMethod::TableQueryStream(req))
    }

    fn table_query_stats(&self, req: TableQueryStatsReq) -> TraceResult<TableQueryStatsRes> {
        self.unary(RpcMethod::TableQueryStats(req))
    }

    fn refs_read_batch(&self, req: RefsReadBatchReq) -> TraceResult<RefsReadBatchRes> {
        self.unary(RpcMethod::RefsReadBatch(req))
    }

    fn file_create(&self, req: FileCreateReq) -> TraceResult<FileCreateRes> {
        self.unary(RpcMethod::FileCreate(req))
    }

    fn file_content_read(&self, req: FileContentReadReq) -> TraceResult<FileContentReadRes> {
        self.unary(RpcMethod::FileContentRead(req))
    }

    fn feedback_create(&self, req: FeedbackCreateReq) -> TraceResult<FeedbackCreateRes> {
        self.unary(RpcMethod::FeedbackCreate(req))
    }

    fn feedback_query(&self, req: FeedbackQueryReq) -> TraceResult<FeedbackQueryRes> {
        self.unary(RpcMethod::FeedbackQuery(req))
    }

    fn feedback_purge(&self, req: FeedbackPurgeReq) -> TraceResult<FeedbackPurgeRes> {
        self.unary(RpcMethod::FeedbackPurge(req))
    }

    fn cost_create(&self, req: CostCreateReq) -> TraceResult<CostCreateRes> {
        self.unary(RpcMethod::CostCreate(req))
    }

    fn cost_query(&self, req: CostQueryReq) -> TraceResult<CostQueryRes> {
        self.unary(RpcMethod::CostQuery(req))
    }

    fn cost_purge(&self, req: CostPurgeReq) -> TraceResult<CostPurgeRes> {
        self.unary(RpcMethod::CostPurge(req))
    }

    fn completions_create(&self, req: CompletionsCreateReq) -> TraceResult<CompletionsCreateRes> {
        self.unary(RpcMethod::CompletionsCreate(req))
    }

    fn completions_create_stream(
        &self,
        req: CompletionsCreateReq,
    ) -> TraceResult<TraceStream<CompletionChunk>> {
        self.streaming(RpcMethod::CompletionsCreateStream(req))
    }

    fn threads_query_stream(&self, req: ThreadsQueryReq) -> TraceResult<TraceStream<ThreadSchema>> {
        self.streaming(RpcMethod::ThreadsQueryStream(req))
    }
}
