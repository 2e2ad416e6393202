//! # Call Lifecycle Payloads
//!
//! A call is one traced function invocation. It is opened by `call_start`,
//! closed by `call_end`, and can be read, queried, renamed and deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// RECORDS
// =============================================================================

/// A stored call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSchema {
    pub id: String,
    pub project_id: String,
    pub op_name: String,
    pub display_name: Option<String>,
    pub trace_id: String,
    pub parent_id: Option<String>,
    pub thread_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub inputs: Value,
    pub output: Option<Value>,
    pub exception: Option<String>,
    #[serde(default)]
    pub summary: Value,
    pub user_id: Option<String>,
}

/// The opening half of a call, written by `call_start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartedCall {
    pub project_id: String,
    /// Assigned by the server when absent.
    pub id: Option<String>,
    /// Assigned by the server when absent.
    pub trace_id: Option<String>,
    pub parent_id: Option<String>,
    pub thread_id: Option<String>,
    pub op_name: String,
    pub display_name: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub attributes: Value,
    #[serde(default)]
    pub inputs: Value,
    /// Injected by the identity adapter when absent.
    pub user_id: Option<String>,
}

/// The closing half of a call, written by `call_end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndedCall {
    pub project_id: String,
    pub id: String,
    pub ended_at: DateTime<Utc>,
    pub output: Option<Value>,
    pub exception: Option<String>,
    #[serde(default)]
    pub summary: Value,
}

/// Filter applied by `calls_query`, `calls_query_stream` and
/// `calls_query_stats`. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsFilter {
    pub op_names: Option<Vec<String>>,
    pub call_ids: Option<Vec<String>>,
    pub trace_ids: Option<Vec<String>>,
    pub parent_ids: Option<Vec<String>>,
    pub thread_ids: Option<Vec<String>>,
    pub trace_roots_only: Option<bool>,
}

impl CallsFilter {
    /// Whether `call` passes every populated field of the filter.
    pub fn matches(&self, call: &CallSchema) -> bool {
        fn admits(list: &Option<Vec<String>>, value: Option<&str>) -> bool {
            match list {
                None => true,
                Some(list) => value.is_some_and(|v| list.iter().any(|item| item == v)),
            }
        }

        admits(&self.op_names, Some(&call.op_name))
            && admits(&self.call_ids, Some(&call.id))
            && admits(&self.trace_ids, Some(&call.trace_id))
            && admits(&self.parent_ids, call.parent_id.as_deref())
            && admits(&self.thread_ids, call.thread_id.as_deref())
            && (!self.trace_roots_only.unwrap_or(false) || call.parent_id.is_none())
    }
}

// =============================================================================
// REQUESTS / RESPONSES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStartReq {
    pub start: StartedCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallStartRes {
    pub id: String,
    pub trace_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEndReq {
    pub end: EndedCall,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallEndRes {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallReadReq {
    pub project_id: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallReadRes {
    pub call: Option<CallSchema>,
}

/// Shared by `calls_query` and `calls_query_stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsQueryReq {
    pub project_id: String,
    #[serde(default)]
    pub filter: CallsFilter,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallsQueryRes {
    pub calls: Vec<CallSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsQueryStatsReq {
    pub project_id: String,
    #[serde(default)]
    pub filter: CallsFilter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsQueryStatsRes {
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsDeleteReq {
    pub project_id: String,
    pub call_ids: Vec<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallsDeleteRes {
    pub num_deleted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallUpdateReq {
    pub project_id: String,
    pub call_id: String,
    pub display_name: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallUpdateRes {}
