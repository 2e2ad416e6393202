use trace_types::{TraceResult, TraceServerError};

/// The tenant identity an execution is bound to.
///
/// `project_id` is in the external form clients use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityContext {
    project_id: String,
    user_id: String,
}

impl IdentityContext {
    /// Both values are required; empty strings are refused.
    pub fn new(project_id: impl Into<String>, user_id: impl Into<String>) -> TraceResult<Self> {
        let project_id = project_id.into();
        let user_id = user_id.into();
        if project_id.is_empty() {
            return Err(TraceServerError::required("project_id"));
        }
        if user_id.is_empty() {
            return Err(TraceServerError::required("user_id"));
        }
        Ok(Self {
            project_id,
            user_id,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}
