//! Shared test fixtures.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use isolation_runtime::{RunAsUser, RuntimeConfig, ScopedRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use trace_ipc::{
    IdentityContext, IdentityEnforcingServer, IpcConfig, PlaceholderEntityIdConverter, Receiver,
};
use trace_store::InMemoryTraceServer;
use trace_types::{CallStartReq, StartedCall};

/// Placeholder entity of every external project id below.
pub const ENTITY: &str = "__server__";
/// Bound project, internal form.
pub const INTERNAL_PROJECT: &str = "p-1";
/// Bound project, external form.
pub const PROJECT: &str = "__server__/p-1";
/// Another tenant's project, external form.
pub const FOREIGN_PROJECT: &str = "__server__/p-2";
pub const USER: &str = "alice";
pub const FOREIGN_USER: &str = "mallory";

/// Short timeouts and a fast poll so failing tests fail quickly.
pub fn fast_ipc_config() -> IpcConfig {
    IpcConfig {
        call_timeout: Duration::from_secs(10),
        stream_timeout: Duration::from_secs(10),
        poll_interval: Duration::from_millis(10),
        stop_join_timeout: Duration::from_secs(2),
    }
}

pub fn runtime(store: Arc<InMemoryTraceServer>) -> RunAsUser {
    RunAsUser::with_config(
        store,
        RuntimeConfig {
            ipc: fast_ipc_config(),
            ..RuntimeConfig::default()
        },
    )
}

/// `store` bound to `(PROJECT, USER)`.
pub fn guarded(store: Arc<InMemoryTraceServer>) -> IdentityEnforcingServer {
    IdentityEnforcingServer::new(
        store,
        IdentityContext::new(PROJECT, USER).expect("test identity is valid"),
        Arc::new(PlaceholderEntityIdConverter::new(ENTITY)),
    )
    .expect("test identity binds")
}

/// A Receiver in this process serving `guarded(store)`.
pub fn guarded_receiver(store: Arc<InMemoryTraceServer>) -> Receiver {
    Receiver::with_config(Arc::new(guarded(store)), fast_ipc_config(), || {})
        .expect("receiver starts")
}

pub fn start_req(project_id: &str, id: &str, thread_id: Option<&str>) -> CallStartReq {
    CallStartReq {
        start: StartedCall {
            project_id: project_id.to_string(),
            id: Some(id.to_string()),
            trace_id: None,
            parent_id: None,
            thread_id: thread_id.map(str::to_string),
            op_name: "predict".to_string(),
            display_name: None,
            started_at: Utc::now(),
            attributes: Value::Null,
            inputs: Value::Null,
            user_id: None,
        },
    }
}

/// Minimal request type for RunAsUser flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReq {
    pub project_id: String,
    pub user_id: Option<String>,
    pub value: String,
}

impl TaskReq {
    pub fn new(value: &str) -> Self {
        Self {
            project_id: PROJECT.to_string(),
            user_id: Some(USER.to_string()),
            value: value.to_string(),
        }
    }
}

impl ScopedRequest for TaskReq {
    fn project_id(&self) -> &str {
        &self.project_id
    }

    fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }
}
