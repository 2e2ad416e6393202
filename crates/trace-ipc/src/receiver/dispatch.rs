//! Closed dispatch from a decoded call to the backend.

use serde::Serialize;
use serde_json::Value;
use trace_types::{TraceResult, TraceServer, TraceServerError, TraceStream};

use crate::protocol::RpcMethod;

/// What the backend produced for one request.
pub(crate) enum Reply {
    Unary(Value),
    Stream(Box<dyn Iterator<Item = TraceResult<Value>> + Send>),
}

fn encode<T: Serialize>(value: T) -> TraceResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| TraceServerError::Internal(format!("failed to encode result: {}", e)))
}

fn unary<T: Serialize>(result: TraceResult<T>) -> TraceResult<Reply> {
    Ok(Reply::Unary(encode(result?)?))
}

fn stream<T: Serialize + 'static>(result: TraceResult<TraceStream<T>>) -> TraceResult<Reply> {
    let items = result?;
    Ok(Reply::Stream(Box::new(
        items.map(|item| item.and_then(encode)),
    )))
}

pub(crate) fn dispatch(backend: &dyn TraceServer, call: RpcMethod) -> TraceResult<Reply> {
    match call {
        RpcMethod::CallStart(req) => unary(backend.call_start(req)),
        RpcMethod::CallEnd(req) => unary(backend.call_end(req)),
        RpcMethod::CallRead(req) => unary(backend.call_read(req)),
        RpcMethod::CallsQuery(req) => unary(backend.calls_query(req)),
        RpcMethod::CallsQueryStream(req) => stream(backend.calls_query_stream(req)),
        RpcMethod::CallsQueryStats(req) => unary(backend.calls_query_stats(req)),
        RpcMethod::CallsDelete(req) => unary(backend.calls_delete(req)),
        RpcMethod::CallUpdate(req) => unary(backend.call_update(req)),
        RpcMethod::ObjCreate(req) => unary(backend.obj_create(req)),
        RpcMethod::ObjRead(req) => unary(backend.obj_read(req)),
        RpcMethod::ObjsQuery(req) => unary(backend.objs_query(req)),
        RpcMethod::ObjDelete(req) => unary(backend.obj_delete(req)),
        RpcMethod::TableCreate(req) => unary(backend.table_create(req)),
        RpcMethod::TableQuery(req) => unary(backend.table_query(req)),
        RpcMethod::TableQueryStream(req) => stream(backend.table_query_stream(req)),
        RpcMethod::TableQueryStats(req) => unary(backend.table_query_stats(req)),
        RpcMethod::RefsReadBatch(req) => unary(backend.refs_read_batch(req)),
        RpcMethod::FileCreate(req) => unary(backend.file_create(req)),
        RpcMethod::FileContentRead(req) => unary(backend.file_content_read(req)),
        RpcMethod::FeedbackCreate(req) => unary(backend.feedback_create(req)),
        RpcMethod::FeedbackQuery(req) => unary(backend.feedback_query(req)),
        RpcMethod::FeedbackPurge(req) => unary(backend.feedback_purge(req)),
        RpcMethod::CostCreate(req) => unary(backend.cost_create(req)),
        RpcMethod::CostQuery(req) => unary(backend.cost_query(req)),
        RpcMethod::CostPurge(req) => unary(backend.cost_purge(req)),
        RpcMethod::CompletionsCreate(req) => unary(backend.completions_create(req)),
        RpcMethod::CompletionsCreateStream(req) => stream(backend.completions_create_stream(req)),
        RpcMethod::ThreadsQueryStream(req) => stream(backend.threads_query_stream(req)),
    }
}
