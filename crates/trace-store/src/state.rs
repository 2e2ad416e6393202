//! # Store State
//!
//! Plain record tables, one set per internal project id. Nothing here
//! validates requests; the service layer does that before mutating.

use std::collections::HashMap;

use trace_types::{CallSchema, CostQueryOutput, Feedback, ObjSchema, TableRowSchema};

/// Records belonging to one project.
#[derive(Debug, Default)]
pub struct ProjectState {
    /// Calls in insertion order.
    pub calls: Vec<CallSchema>,
    /// Object versions keyed by object id, oldest first.
    pub objects: HashMap<String, Vec<ObjSchema>>,
    /// Table rows keyed by table digest.
    pub tables: HashMap<String, Vec<TableRowSchema>>,
    /// File contents keyed by digest.
    pub files: HashMap<String, Vec<u8>>,
    pub feedback: Vec<Feedback>,
    pub costs: Vec<CostQueryOutput>,
}

impl ProjectState {
    pub fn call(&self, id: &str) -> Option<&CallSchema> {
        self.calls.iter().find(|c| c.id == id)
    }

    pub fn call_mut(&mut self, id: &str) -> Option<&mut CallSchema> {
        self.calls.iter_mut().find(|c| c.id == id)
    }

    /// Resolve an object version. `"latest"` selects the newest one.
    pub fn object_version(&self, object_id: &str, digest: &str) -> Option<&ObjSchema> {
        let versions = self.objects.get(object_id)?;
        if digest == trace_types::LATEST_DIGEST {
            versions.last()
        } else {
            versions.iter().find(|v| v.digest == digest)
        }
    }
}

/// Every project the store knows about.
#[derive(Debug, Default)]
pub struct StoreState {
    projects: HashMap<String, ProjectState>,
}

impl StoreState {
    pub fn project(&self, project_id: &str) -> Option<&ProjectState> {
        self.projects.get(project_id)
    }

    /// The project's tables, created on first write.
    pub fn project_mut(&mut self, project_id: &str) -> &mut ProjectState {
        self.projects.entry(project_id.to_string()).or_default()
    }
}
