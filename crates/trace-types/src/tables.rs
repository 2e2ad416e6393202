//! # Table Storage Payloads
//!
//! Tables are immutable, content-addressed lists of rows. Each row carries its
//! own digest so a dataset row can be referenced on its own.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchemaForInsert {
    pub project_id: String,
    pub rows: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCreateReq {
    pub table: TableSchemaForInsert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCreateRes {
    pub digest: String,
    pub row_digests: Vec<String>,
}

/// One stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRowSchema {
    pub digest: String,
    pub val: Value,
    pub original_index: usize,
}

/// Shared by `table_query` and `table_query_stream`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQueryReq {
    pub project_id: String,
    pub digest: String,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableQueryRes {
    pub rows: Vec<TableRowSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQueryStatsReq {
    pub project_id: String,
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableQueryStatsRes {
    pub count: usize,
}
