//! # Feedback Payloads
//!
//! Feedback attaches a typed payload (reaction, note, score) to a ref.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored feedback entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: String,
    pub project_id: String,
    /// External ref on the client side, internal ref inside the backend.
    pub object_ref: String,
    pub feedback_type: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCreateReq {
    pub project_id: String,
    pub object_ref: String,
    pub feedback_type: String,
    pub payload: Value,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackCreateRes {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackQueryReq {
    pub project_id: String,
    pub feedback_type: Option<String>,
    pub object_refs: Option<Vec<String>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackQueryRes {
    pub result: Vec<Feedback>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPurgeReq {
    pub project_id: String,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackPurgeRes {
    pub num_deleted: usize,
}
