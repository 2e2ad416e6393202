//! Versioned, content-addressed objects.

use chrono::Utc;
use trace_types::*;

use super::{page, InMemoryTraceServer};
use crate::digest::digest_value;

impl InMemoryTraceServer {
    /// Store a new version. Writing a value identical to an existing version
    /// returns that version's digest without creating another one.
    pub(crate) fn create_object(&self, req: ObjCreateReq) -> TraceResult<ObjCreateRes> {
        let obj = req.obj;
        if obj.object_id.is_empty() || obj.object_id.contains(['/', ':']) {
            return Err(TraceServerError::InvalidRequest(format!(
                "invalid object id: {:?}",
                obj.object_id
            )));
        }
        let digest = digest_value(&obj.val);
        let base_object_class = obj
            .val
            .get("_class_name")
            .and_then(|c| c.as_str())
            .map(str::to_string);

        let mut state = self.state.write();
        let versions = state
            .project_mut(&obj.project_id)
            .objects
            .entry(obj.object_id.clone())
            .or_default();
        if versions.iter().any(|v| v.digest == digest) {
            return Ok(ObjCreateRes { digest });
        }
        for v in versions.iter_mut() {
            v.is_latest = false;
        }
        let version_index = versions.last().map_or(0, |v| v.version_index + 1);
        versions.push(ObjSchema {
            project_id: obj.project_id,
            object_id: obj.object_id,
            digest: digest.clone(),
            version_index,
            is_latest: true,
            created_at: Utc::now(),
            base_object_class,
            val: obj.val,
            user_id: obj.user_id,
        });
        Ok(ObjCreateRes { digest })
    }

    pub(crate) fn read_object(&self, req: ObjReadReq) -> TraceResult<ObjReadRes> {
        let state = self.state.read();
        state
            .project(&req.project_id)
            .and_then(|p| p.object_version(&req.object_id, &req.digest))
            .cloned()
            .map(|obj| ObjReadRes { obj })
            .ok_or_else(|| {
                TraceServerError::NotFound(format!("object {}:{}", req.object_id, req.digest))
            })
    }

    pub(crate) fn query_objects(&self, req: ObjsQueryReq) -> ObjsQueryRes {
        let state = self.state.read();
        let Some(project) = state.project(&req.project_id) else {
            return ObjsQueryRes { objs: Vec::new() };
        };
        let mut matching: Vec<&ObjSchema> = project
            .objects
            .values()
            .flatten()
            .filter(|o| req.filter.matches(o))
            .collect();
        matching.sort_by(|a, b| {
            a.object_id
                .cmp(&b.object_id)
                .then(a.version_index.cmp(&b.version_index))
        });
        ObjsQueryRes {
            objs: page(matching.into_iter().cloned(), req.offset, req.limit),
        }
    }

    /// Removes the selected versions. The newest survivor becomes latest.
    pub(crate) fn delete_object(&self, req: ObjDeleteReq) -> TraceResult<ObjDeleteRes> {
        let mut state = self.state.write();
        let project = state.project_mut(&req.project_id);
        let versions = project
            .objects
            .get_mut(&req.object_id)
            .ok_or_else(|| TraceServerError::NotFound(format!("object {}", req.object_id)))?;

        let before = versions.len();
        match &req.digests {
            None => versions.clear(),
            Some(digests) => {
                let missing = digests
                    .iter()
                    .find(|d| !versions.iter().any(|v| &v.digest == *d));
                if let Some(missing) = missing {
                    return Err(TraceServerError::NotFound(format!(
                        "object {}:{}",
                        req.object_id, missing
                    )));
                }
                versions.retain(|v| !digests.contains(&v.digest));
            }
        }
        let num_deleted = before - versions.len();

        if versions.is_empty() {
            project.objects.remove(&req.object_id);
        } else if let Some(last) = versions.last_mut() {
            last.is_latest = true;
        }
        Ok(ObjDeleteRes { num_deleted })
    }
}
