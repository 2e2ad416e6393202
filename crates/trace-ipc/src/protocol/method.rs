//! The closed set of remotely callable operations.
//!
//! One variant per `TraceServer` method; the wire name is the method name.
//! Adding an operation to the trait without adding it here fails to compile
//! in both the Receiver dispatch and the Sender proxy.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use trace_types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "payload", rename_all = "snake_case")]
pub enum RpcMethod {
    // Calls
    CallStart(CallStartReq),
    CallEnd(CallEndReq),
    CallRead(CallReadReq),
    CallsQuery(CallsQueryReq),
    CallsQueryStream(CallsQueryReq),
    CallsQueryStats(CallsQueryStatsReq),
    CallsDelete(CallsDeleteReq),
    CallUpdate(CallUpdateReq),

    // Objects
    ObjCreate(ObjCreateReq),
    ObjRead(ObjReadReq),
    ObjsQuery(ObjsQueryReq),
    ObjDelete(ObjDeleteReq),

    // Tables
    TableCreate(TableCreateReq),
    TableQuery(TableQueryReq),
    TableQueryStream(TableQueryReq),
    TableQueryStats(TableQueryStatsReq),

    // Refs / files
    RefsReadBatch(RefsReadBatchReq),
    FileCreate(FileCreateReq),
    FileContentRead(FileContentReadReq),

    // Feedback / cost
    FeedbackCreate(FeedbackCreateReq),
    FeedbackQuery(FeedbackQueryReq),
    FeedbackPurge(FeedbackPurgeReq),
    CostCreate(CostCreateReq),
    CostQuery(CostQueryReq),
    CostPurge(CostPurgeReq),

    // Completions / threads
    CompletionsCreate(CompletionsCreateReq),
    CompletionsCreateStream(CompletionsCreateReq),
    ThreadsQueryStream(ThreadsQueryReq),
}

impl RpcMethod {
    /// Decode a call from its wire method name and payload.
    pub fn decode(method: &str, payload: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(json!({ "method": method, "payload": payload }))
    }

    /// The payload as it travels on the wire.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match serde_json::to_value(self)? {
            Value::Object(mut fields) => Ok(fields.remove("payload").unwrap_or(Value::Null)),
            other => Ok(other),
        }
    }

    /// Whether the Receiver answers with a stream of responses.
    pub fn is_streaming(&self) -> bool {
        matches!(
            self,
            Self::CallsQueryStream(_)
                | Self::TableQueryStream(_)
                | Self::CompletionsCreateStream(_)
                | Self::ThreadsQueryStream(_)
        )
    }

    /// Wire method name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CallStart(_) => "call_start",
            Self::CallEnd(_) => "call_end",
            Self::CallRead(_) => "call_read",
            Self::CallsQuery(_) => "calls_query",
            Self::CallsQueryStream(_) => "calls_query_stream",
            Self::CallsQueryStats(_) => "calls_query_stats",
            Self::CallsDelete(_) => "calls_delete",
            Self::CallUpdate(_) => "call_update",
            Self::ObjCreate(_) => "obj_create",
            Self::ObjRead(_) => "obj_read",
            Self::ObjsQuery(_) => "objs_query",
            Self::ObjDelete(_) => "obj_delete",
            Self::TableCreate(_) => "table_create",
            Self::TableQuery(_) => "table_query",
            Self::TableQueryStream(_) => "table_query_stream",
            Self::TableQueryStats(_) => "table_query_stats",
            Self::RefsReadBatch(_) => "refs_read_batch",
            Self::FileCreate(_) => "file_create",
            Self::FileContentRead(_) => "file_content_read",
            Self::FeedbackCreate(_) => "feedback_create",
            Self::FeedbackQuery(_) => "feedback_query",
            Self::FeedbackPurge(_) => "feedback_purge",
            Self::CostCreate(_) => "cost_create",
            Self::CostQuery(_) => "cost_query",
            Self::CostPurge(_) => "cost_purge",
            Self::CompletionsCreate(_) => "completions_create",
            Self::CompletionsCreateStream(_) => "completions_create_stream",
            Self::ThreadsQueryStream(_) => "threads_query_stream",
        }
    }
}
