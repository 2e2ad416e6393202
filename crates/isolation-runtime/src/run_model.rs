//! # RunModel
//!
//! The concrete RunAsUser use case: load a model object by ref, resolve its
//! inputs, run the predictor registered for the model's class, and record the
//! prediction as a call.
//!
//! Predictors are looked up by the model value's `_class_name` field.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::client::ScopedClient;
use crate::error::RunAsUserError;
use crate::run_as_user::{RunAsUser, ScopedRequest};

/// Op name of the call recorded around each prediction.
pub const RUN_MODEL_OP: &str = "run_model";

/// Field of a model value that names its predictor.
pub const CLASS_NAME_FIELD: &str = "_class_name";

// =============================================================================
// REQUEST / RESPONSE
// =============================================================================

/// Model inputs, given inline or as a ref the child resolves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ModelInputs {
    Inline(Value),
    Ref(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunModelReq {
    pub project_id: String,
    /// Required; absence fails before any child is spawned.
    pub user_id: Option<String>,
    pub model_ref: String,
    pub inputs: ModelInputs,
}

impl ScopedRequest for RunModelReq {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunModelRes {
    pub output: Value,
    /// Id of the call recording this prediction.
    pub call_id: String,
}

// =============================================================================
// PREDICTORS
// =============================================================================

/// Computes an output from a model value and resolved inputs.
pub type Predictor = Arc<dyn Fn(&Value, Value) -> anyhow::Result<Value> + Send + Sync>;

/// Predictor registry keyed by model class name.
#[derive(Clone, Default)]
pub struct ModelRunner {
    predictors: HashMap<String, Predictor>,
}

impl ModelRunner {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register<F>(mut self, class_name: impl Into<String>, predictor: F) -> Self
    where
        F: Fn(&Value, Value) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.predictors.insert(class_name.into(), Arc::new(predictor));
        self
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.predictors.keys().map(String::as_str)
    }

    /// Run one prediction through `client`. Records a call that carries the
    /// output, or the error if the predictor fails.
    pub fn run(&self, req: RunModelReq, client: &ScopedClient) -> anyhow::Result<RunModelRes> {
        let model = client
            .get(&req.model_ref)
            .with_context(|| format!("loading model {}", req.model_ref))?;
        let class_name = model
            .get(CLASS_NAME_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("model {} has no {}", req.model_ref, CLASS_NAME_FIELD))?;
        let predictor = self
            .predictors
            .get(class_name)
            .ok_or_else(|| anyhow!("no predictor registered for class {}", class_name))?;

        let inputs = match req.inputs {
            ModelInputs::Inline(value) => value,
            ModelInputs::Ref(uri) => client
                .get(&uri)
                .with_context(|| format!("loading inputs {}", uri))?,
        };

        let call_id = client.start_call(
            RUN_MODEL_OP,
            json!({"model": req.model_ref, "inputs": inputs}),
        )?;
        tracing::debug!(%call_id, class_name, "running prediction");

        match predictor(&model, inputs) {
            Ok(output) => {
                client.finish_call(&call_id, Some(output.clone()), None)?;
                Ok(RunModelRes { output, call_id })
            }
            Err(e) => {
                client.finish_call(&call_id, None, Some(format!("{e:#}")))?;
                Err(e)
            }
        }
    }
}

impl std::fmt::Debug for ModelRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes: Vec<&str> = self.classes().collect();
        classes.sort_unstable();
        f.debug_struct("ModelRunner").field("classes", &classes).finish()
    }
}

/// Run a model for `(project_id, user_id)` in an isolated child.
pub fn run_model(
    runtime: &RunAsUser,
    runner: &ModelRunner,
    req: RunModelReq,
    expected_project_id: &str,
    expected_user_id: &str,
    timeout: Option<Duration>,
) -> Result<RunModelRes, RunAsUserError> {
    let timeout = timeout.or(runtime.config().default_timeout);
    runtime.run(
        |req, client| runner.run(req, &client),
        req,
        expected_project_id,
        expected_user_id,
        timeout,
    )
}
