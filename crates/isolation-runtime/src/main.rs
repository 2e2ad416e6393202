//! # Isolated Runner
//!
//! Demo entry point: seeds a model into an in-memory trace store and runs a
//! prediction for it inside a forked child.
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (from env)
//! 2. Load runtime configuration (from env)
//! 3. Seed the model object under the demo project
//! 4. Run the prediction through RunAsUser
//! 5. Print the result as JSON on stdout
//!
//! Nothing here may start a background thread before step 4: the only
//! thread alive at fork time should be the Receiver worker.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;
use tracing::info;

use isolation_runtime::{
    run_model, ModelInputs, ModelRunner, RunAsUser, RunModelReq, RuntimeConfig, ScopedClient,
};
use trace_ipc::{IdentityContext, IdentityEnforcingServer, PlaceholderEntityIdConverter};
use trace_store::InMemoryTraceServer;
use trace_telemetry::{init_telemetry, TelemetryConfig};

const DEMO_PROJECT: &str = "demo";
const DEMO_USER: &str = "demo-user";

fn main() -> Result<()> {
    init_telemetry(&TelemetryConfig::from_env()).context("Failed to init telemetry")?;

    let config = RuntimeConfig::from_env();
    let project_id = config.external_project_id(DEMO_PROJECT);
    let store = Arc::new(InMemoryTraceServer::new());

    let model_ref = seed_model(&store, &config, &project_id)?;
    info!(%model_ref, "model seeded");

    let runner = ModelRunner::new().register("LinearModel", |model, inputs| {
        let weight = model["weight"].as_f64().unwrap_or(1.0);
        let bias = model["bias"].as_f64().unwrap_or(0.0);
        let x = inputs["x"]
            .as_f64()
            .ok_or_else(|| anyhow::anyhow!("inputs.x must be a number"))?;
        Ok(json!({ "y": weight * x + bias }))
    });

    let runtime = RunAsUser::with_config(store.clone(), config);
    let res = run_model(
        &runtime,
        &runner,
        RunModelReq {
            project_id: project_id.clone(),
            user_id: Some(DEMO_USER.to_string()),
            model_ref,
            inputs: ModelInputs::Inline(json!({ "x": 4.0 })),
        },
        &project_id,
        DEMO_USER,
        None,
    )
    .context("Model run failed")?;

    info!(call_id = %res.call_id, parent_pid = std::process::id(), "prediction recorded");
    println!("{}", serde_json::to_string_pretty(&res)?);
    Ok(())
}

/// Publish the demo model through the same identity checks the child uses.
fn seed_model(
    store: &Arc<InMemoryTraceServer>,
    config: &RuntimeConfig,
    project_id: &str,
) -> Result<String> {
    let guarded = IdentityEnforcingServer::new(
        store.clone(),
        IdentityContext::new(project_id, DEMO_USER)?,
        Arc::new(PlaceholderEntityIdConverter::new(config.server_entity.clone())),
    )?;
    let client = ScopedClient::new(Arc::new(guarded), project_id, DEMO_USER);
    client
        .save(
            "LinearModel",
            json!({ "_class_name": "LinearModel", "weight": 2.5, "bias": 1.0 }),
        )
        .context("Failed to seed model")
}
