//! # Object Storage Payloads
//!
//! Objects are content-addressed JSON values stored under a name. Writing the
//! same name again creates a new version; `"latest"` is accepted wherever a
//! digest is expected on reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Digest alias resolving to the newest version of an object.
pub const LATEST_DIGEST: &str = "latest";

/// A stored object version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjSchema {
    pub project_id: String,
    pub object_id: String,
    pub digest: String,
    pub version_index: u64,
    pub is_latest: bool,
    pub created_at: DateTime<Utc>,
    /// Taken from the value's `_class_name` field when present.
    pub base_object_class: Option<String>,
    pub val: Value,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjSchemaForInsert {
    pub project_id: String,
    pub object_id: String,
    pub val: Value,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjCreateReq {
    pub obj: ObjSchemaForInsert,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjCreateRes {
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjReadReq {
    pub project_id: String,
    pub object_id: String,
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjReadRes {
    pub obj: ObjSchema,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectVersionFilter {
    pub object_ids: Option<Vec<String>>,
    pub base_object_classes: Option<Vec<String>>,
    pub latest_only: Option<bool>,
}

impl ObjectVersionFilter {
    pub fn matches(&self, obj: &ObjSchema) -> bool {
        let id_ok = self
            .object_ids
            .as_ref()
            .map_or(true, |ids| ids.contains(&obj.object_id));
        let class_ok = self.base_object_classes.as_ref().map_or(true, |classes| {
            obj.base_object_class
                .as_ref()
                .is_some_and(|class| classes.contains(class))
        });
        let latest_ok = !self.latest_only.unwrap_or(false) || obj.is_latest;
        id_ok && class_ok && latest_ok
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjsQueryReq {
    pub project_id: String,
    #[serde(default)]
    pub filter: ObjectVersionFilter,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjsQueryRes {
    pub objs: Vec<ObjSchema>,
}

/// Delete some or all versions of an object. `digests: None` deletes every
/// version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjDeleteReq {
    pub project_id: String,
    pub object_id: String,
    pub digests: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjDeleteRes {
    pub num_deleted: usize,
}
