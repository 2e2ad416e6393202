//! # Cost Payloads
//!
//! Per-model token prices used to compute call cost summaries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCreateInput {
    pub prompt_token_cost: f64,
    pub completion_token_cost: f64,
    pub provider_id: Option<String>,
}

/// Keyed by LLM id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostCreateReq {
    pub project_id: String,
    pub costs: BTreeMap<String, CostCreateInput>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCreateId {
    pub llm_id: String,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostCreateRes {
    pub ids: Vec<CostCreateId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostQueryReq {
    pub project_id: String,
    pub llm_ids: Option<Vec<String>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostQueryOutput {
    pub id: String,
    pub llm_id: String,
    pub prompt_token_cost: f64,
    pub completion_token_cost: f64,
    pub provider_id: Option<String>,
    pub created_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostQueryRes {
    pub results: Vec<CostQueryOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostPurgeReq {
    pub project_id: String,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostPurgeRes {}
