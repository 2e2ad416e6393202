//! # Thread Payloads
//!
//! A thread groups the root calls of one conversation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadsQueryReq {
    pub project_id: String,
    pub limit: Option<usize>,
}

/// Aggregate view of one thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadSchema {
    pub thread_id: String,
    /// Number of root calls in the thread.
    pub turn_count: usize,
    pub start_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
