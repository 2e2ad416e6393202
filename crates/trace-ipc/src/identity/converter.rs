//! External/internal project id translation.

use trace_types::{TraceResult, TraceServerError};

/// Translates project ids between the form clients see and the form the
/// backend stores. Implementations must refuse anything they cannot translate
/// unambiguously.
pub trait IdConverter: Send + Sync {
    fn ext_to_int_project_id(&self, external: &str) -> TraceResult<String>;
    fn int_to_ext_project_id(&self, internal: &str) -> TraceResult<String>;
}

/// Internal and external ids are the same string.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughIdConverter;

impl IdConverter for PassthroughIdConverter {
    fn ext_to_int_project_id(&self, external: &str) -> TraceResult<String> {
        if external.is_empty() {
            return Err(TraceServerError::required("project_id"));
        }
        Ok(external.to_string())
    }

    fn int_to_ext_project_id(&self, internal: &str) -> TraceResult<String> {
        Ok(internal.to_string())
    }
}

/// External ids are `{entity}/{internal_id}` under one fixed placeholder
/// entity.
#[derive(Debug, Clone)]
pub struct PlaceholderEntityIdConverter {
    entity: String,
}

impl PlaceholderEntityIdConverter {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }
}

impl IdConverter for PlaceholderEntityIdConverter {
    fn ext_to_int_project_id(&self, external: &str) -> TraceResult<String> {
        match external.split_once('/') {
            Some((entity, internal))
                if entity == self.entity && !internal.is_empty() && !internal.contains('/') =>
            {
                Ok(internal.to_string())
            }
            _ => Err(TraceServerError::InvalidId(format!(
                "project id {:?} is not of the form {}/<id>",
                external, self.entity
            ))),
        }
    }

    fn int_to_ext_project_id(&self, internal: &str) -> TraceResult<String> {
        if internal.is_empty() || internal.contains('/') {
            return Err(TraceServerError::InvalidId(format!(
                "internal project id {:?} cannot be externalized",
                internal
            )));
        }
        Ok(format!("{}/{}", self.entity, internal))
    }
}
