//! # Trace References
//!
//! URI references to stored entities, plus the batch-read payloads.
//!
//! Two encodings exist for the same reference:
//!
//! ```text
//! external: trace:///{entity}/{project}/{kind}/{name}[:{digest}]
//! internal: trace-internal:///{project_id}/{kind}/{name}[:{digest}]
//! ```
//!
//! Clients only ever see external refs. The backend only ever sees internal
//! refs. Translation between the two is owned by the identity adapter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TraceResult, TraceServerError};

/// Scheme of refs handed to clients.
pub const EXTERNAL_REF_SCHEME: &str = "trace:///";

/// Scheme of refs understood by the backend.
pub const INTERNAL_REF_SCHEME: &str = "trace-internal:///";

/// Kind of entity a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// A versioned object; the ref carries `name:digest`.
    Object,
    /// A call; the ref carries the call id.
    Call,
    /// A table; the ref carries the table digest.
    Table,
}

impl RefKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Call => "call",
            Self::Table => "table",
        }
    }

    fn parse(s: &str) -> TraceResult<Self> {
        match s {
            "object" => Ok(Self::Object),
            "call" => Ok(Self::Call),
            "table" => Ok(Self::Table),
            other => Err(TraceServerError::InvalidId(format!(
                "unknown ref kind: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed reference.
///
/// `project_id` is whatever the encoding carried: `entity/project` for an
/// external ref, the bare internal id for an internal ref.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceRef {
    pub project_id: String,
    pub kind: RefKind,
    pub name: String,
    pub digest: Option<String>,
}

impl TraceRef {
    /// Reference to a specific object version.
    pub fn object(project_id: &str, name: &str, digest: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            kind: RefKind::Object,
            name: name.to_string(),
            digest: Some(digest.to_string()),
        }
    }

    /// Reference to a call.
    pub fn call(project_id: &str, call_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            kind: RefKind::Call,
            name: call_id.to_string(),
            digest: None,
        }
    }

    /// Reference to a table.
    pub fn table(project_id: &str, digest: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            kind: RefKind::Table,
            name: digest.to_string(),
            digest: None,
        }
    }

    /// Parse an external (`trace:///`) reference.
    pub fn parse_external(uri: &str) -> TraceResult<Self> {
        let rest = uri.strip_prefix(EXTERNAL_REF_SCHEME).ok_or_else(|| {
            TraceServerError::InvalidId(format!("not an external ref: {}", uri))
        })?;
        let parts: Vec<&str> = rest.split('/').collect();
        if parts.len() != 4 {
            return Err(TraceServerError::InvalidId(format!(
                "malformed external ref: {}",
                uri
            )));
        }
        let project_id = format!("{}/{}", non_empty(parts[0], uri)?, non_empty(parts[1], uri)?);
        Self::from_tail(project_id, parts[2], parts[3], uri)
    }

    /// Parse an internal (`trace-internal:///`) reference. The project id is
    /// everything before the last two segments and may itself contain `/`.
    pub fn parse_internal(uri: &str) -> TraceResult<Self> {
        let rest = uri.strip_prefix(INTERNAL_REF_SCHEME).ok_or_else(|| {
            TraceServerError::InvalidId(format!("not an internal ref: {}", uri))
        })?;
        let mut parts = rest.rsplitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(tail), Some(kind), Some(project_id)) => {
                let project_id = non_empty(project_id, uri)?.to_string();
                Self::from_tail(project_id, kind, tail, uri)
            }
            _ => Err(TraceServerError::InvalidId(format!(
                "malformed internal ref: {}",
                uri
            ))),
        }
    }

    fn from_tail(project_id: String, kind: &str, tail: &str, uri: &str) -> TraceResult<Self> {
        let kind = RefKind::parse(kind)?;
        let (name, digest) = match kind {
            RefKind::Object => {
                let (name, digest) = tail.rsplit_once(':').ok_or_else(|| {
                    TraceServerError::InvalidId(format!("object ref without digest: {}", uri))
                })?;
                (non_empty(name, uri)?, Some(non_empty(digest, uri)?.to_string()))
            }
            RefKind::Call | RefKind::Table => (non_empty(tail, uri)?, None),
        };
        Ok(Self {
            project_id,
            kind,
            name: name.to_string(),
            digest,
        })
    }

    /// Encode as an external ref. `project_id` must be `entity/project`.
    pub fn to_external_uri(&self) -> String {
        format!("{}{}/{}", EXTERNAL_REF_SCHEME, self.project_id, self.tail())
    }

    /// Encode as an internal ref.
    pub fn to_internal_uri(&self) -> String {
        format!("{}{}/{}", INTERNAL_REF_SCHEME, self.project_id, self.tail())
    }

    /// Same reference, re-homed to another project id.
    #[must_use]
    pub fn with_project(&self, project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            ..self.clone()
        }
    }

    fn tail(&self) -> String {
        match &self.digest {
            Some(digest) => format!("{}/{}:{}", self.kind, self.name, digest),
            None => format!("{}/{}", self.kind, self.name),
        }
    }
}

fn non_empty<'a>(segment: &'a str, uri: &str) -> TraceResult<&'a str> {
    if segment.is_empty() {
        Err(TraceServerError::InvalidId(format!(
            "empty segment in ref: {}",
            uri
        )))
    } else {
        Ok(segment)
    }
}

// =============================================================================
// BATCH READ PAYLOADS
// =============================================================================

/// Resolve a batch of refs to their stored values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefsReadBatchReq {
    pub refs: Vec<String>,
}

/// Values in the same order as the requested refs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefsReadBatchRes {
    pub vals: Vec<serde_json::Value>,
}
