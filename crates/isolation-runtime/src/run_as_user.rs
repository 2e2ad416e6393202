//! # RunAsUser
//!
//! Runs a target function for one `(project, user)` in a forked child. The
//! child gets the two channel endpoints and nothing else of the backend.
//!
//! ## Invocation Steps
//!
//! 1. Check the request's identity against the expected identity (no child
//!    is spawned for a request that fails)
//! 2. Bind the backend to the expected identity
//! 3. Start the Receiver worker
//! 4. Capture the execution context
//! 5. Fork; the child runs the target against a Sender-backed client
//! 6. Supervise the child until it exits or the timeout elapses
//! 7. Stop the Receiver, whatever the outcome

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Serialize;
use trace_ipc::{
    ChannelError, ChannelHandles, ChannelReceiver, ChannelSender, IdConverter, IdentityContext,
    IdentityEnforcingServer, IpcConfig, PlaceholderEntityIdConverter, Receiver, Sender,
};
use trace_types::{TraceServer, TraceServerError};

use crate::client::ScopedClient;
use crate::config::RuntimeConfig;
use crate::context::ExecutionContext;
use crate::error::RunAsUserError;
use crate::process::{self, ChildProcess};

/// Upper bound on one supervision sleep once the result is in hand.
const REAP_POLL: Duration = Duration::from_millis(10);

/// A request that names the tenant it acts for.
pub trait ScopedRequest {
    fn project_id(&self) -> &str;
    fn user_id(&self) -> Option<&str>;
}

// =============================================================================
// SPAWN CONTRACT
// =============================================================================

/// Everything of the parent's trace server a child receives.
#[derive(Clone)]
pub struct ChildProcessArgs {
    pub handles: ChannelHandles,
}

/// Runs in the parent. Only channel endpoints are handed out; the backend
/// behind `receiver` stays where it is.
pub fn generate_child_process_args(receiver: &Receiver) -> ChildProcessArgs {
    ChildProcessArgs {
        handles: receiver.handles(),
    }
}

/// Runs in the child. Rebuilds a full `TraceServer` proxy from the handles.
pub fn build_child_trace_server(args: ChildProcessArgs, config: IpcConfig) -> Sender {
    Sender::new(args.handles, config)
}

// =============================================================================
// ORCHESTRATOR
// =============================================================================

/// Runs target functions in isolated children on behalf of one backend.
pub struct RunAsUser {
    backend: Arc<dyn TraceServer>,
    converter: Arc<dyn IdConverter>,
    config: RuntimeConfig,
}

impl RunAsUser {
    pub fn new(backend: Arc<dyn TraceServer>) -> Self {
        Self::with_config(backend, RuntimeConfig::from_env())
    }

    /// Project ids are translated with a placeholder-entity converter for
    /// `config.server_entity`.
    pub fn with_config(backend: Arc<dyn TraceServer>, config: RuntimeConfig) -> Self {
        let converter = Arc::new(PlaceholderEntityIdConverter::new(config.server_entity.clone()));
        Self {
            backend,
            converter,
            config,
        }
    }

    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn IdConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Run `target(request, client)` in a child bound to
    /// `(expected_project_id, expected_user_id)` and return its result.
    ///
    /// `timeout` of `None` waits for the child indefinitely.
    pub fn run<Req, Res, F>(
        &self,
        target: F,
        request: Req,
        expected_project_id: &str,
        expected_user_id: &str,
        timeout: Option<Duration>,
    ) -> Result<Res, RunAsUserError>
    where
        Req: ScopedRequest,
        Res: Serialize + DeserializeOwned,
        F: FnOnce(Req, ScopedClient) -> anyhow::Result<Res>,
    {
        check_identity(&request, expected_project_id, expected_user_id)?;

        let identity = IdentityContext::new(expected_project_id, expected_user_id)?;
        let guarded = IdentityEnforcingServer::new(
            Arc::clone(&self.backend),
            identity,
            Arc::clone(&self.converter),
        )?;

        let context = ExecutionContext::capture();
        let worker_context = context.clone();
        let receiver = Receiver::with_config(Arc::new(guarded), self.config.ipc.clone(), move || {
            worker_context.install();
        })?;

        let outcome = self.spawn_and_supervise(
            &receiver,
            context,
            target,
            request,
            expected_project_id,
            expected_user_id,
            timeout,
        );
        receiver.stop();
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_and_supervise<Req, Res, F>(
        &self,
        receiver: &Receiver,
        context: ExecutionContext,
        target: F,
        request: Req,
        project_id: &str,
        user_id: &str,
        timeout: Option<Duration>,
    ) -> Result<Res, RunAsUserError>
    where
        Res: Serialize + DeserializeOwned,
        F: FnOnce(Req, ScopedClient) -> anyhow::Result<Res>,
    {
        let args = generate_child_process_args(receiver);
        let (result_tx, result_rx) = trace_ipc::channel()?;
        let ipc = self.config.ipc.clone();
        let project_id = project_id.to_string();
        let user_id = user_id.to_string();

        let mut keep_fds = args.handles.fds();
        keep_fds.extend(result_tx.fds());

        let child = process::spawn(&keep_fds, move || {
            child_main(args, ipc, context, project_id, user_id, target, request, result_tx)
        })?;
        tracing::info!(pid = child.pid(), "running user function in child process");

        supervise(&child, &result_rx, timeout, self.config.ipc.poll_interval)
    }
}

/// One-shot form of [`RunAsUser::run`] with configuration from the
/// environment.
pub fn run_user_scoped_function<Req, Res, F>(
    backend: Arc<dyn TraceServer>,
    target: F,
    request: Req,
    expected_project_id: &str,
    expected_user_id: &str,
    timeout: Option<Duration>,
) -> Result<Res, RunAsUserError>
where
    Req: ScopedRequest,
    Res: Serialize + DeserializeOwned,
    F: FnOnce(Req, ScopedClient) -> anyhow::Result<Res>,
{
    RunAsUser::new(backend).run(target, request, expected_project_id, expected_user_id, timeout)
}

fn check_identity<Req: ScopedRequest>(
    request: &Req,
    expected_project_id: &str,
    expected_user_id: &str,
) -> Result<(), RunAsUserError> {
    let Some(user_id) = request.user_id() else {
        return Err(RunAsUserError::InvalidRequest("user_id is required".to_string()));
    };
    if request.project_id() != expected_project_id {
        return Err(TraceServerError::mismatch(
            "project_id",
            expected_project_id,
            request.project_id(),
        )
        .into());
    }
    if user_id != expected_user_id {
        return Err(TraceServerError::mismatch("user_id", expected_user_id, user_id).into());
    }
    Ok(())
}

// =============================================================================
// CHILD SIDE
// =============================================================================

#[allow(clippy::too_many_arguments)]
fn child_main<Req, Res, F>(
    args: ChildProcessArgs,
    ipc: IpcConfig,
    context: ExecutionContext,
    project_id: String,
    user_id: String,
    target: F,
    request: Req,
    results: ChannelSender,
) -> i32
where
    Res: Serialize,
    F: FnOnce(Req, ScopedClient) -> anyhow::Result<Res>,
{
    context.install();
    let sender = build_child_trace_server(args, ipc);
    let client = ScopedClient::new(Arc::new(sender), project_id, user_id);

    match target(request, client) {
        Ok(result) => match results.send(&result) {
            Ok(()) => 0,
            Err(e) => {
                tracing::error!(error = %e, "failed to hand result to parent");
                1
            }
        },
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "user function failed");
            1
        }
    }
}

// =============================================================================
// SUPERVISION
// =============================================================================

/// Wait for the child while draining its result, so a result larger than the
/// socket buffer cannot block the child's exit.
fn supervise<Res: DeserializeOwned>(
    child: &ChildProcess,
    results: &ChannelReceiver,
    timeout: Option<Duration>,
    poll_interval: Duration,
) -> Result<Res, RunAsUserError> {
    let deadline = timeout.map(|t| Instant::now() + t);
    let mut result: Option<Res> = None;
    let mut closed = false;

    loop {
        if result.is_none() && !closed {
            match results.recv_timeout(poll_interval) {
                Ok(received) => result = received,
                Err(ChannelError::Closed) => closed = true,
                Err(e) => {
                    let _ = child.kill_and_reap();
                    return Err(e.into());
                }
            }
        } else {
            thread::sleep(poll_interval.min(REAP_POLL));
        }

        if let Some(code) = child.try_wait()? {
            tracing::debug!(pid = child.pid(), code, "child process exited");
            if code != 0 {
                return Err(RunAsUserError::Exit {
                    pid: child.pid(),
                    code,
                });
            }
            if result.is_none() && !closed {
                // The frame is already buffered if the child sent one.
                result = match results.recv_timeout(poll_interval) {
                    Ok(received) => received,
                    Err(ChannelError::Closed) => None,
                    Err(e) => return Err(e.into()),
                };
            }
            return result.ok_or(RunAsUserError::MissingResult { pid: child.pid() });
        }

        if let (Some(deadline), Some(timeout)) = (deadline, timeout) {
            if Instant::now() >= deadline {
                tracing::warn!(pid = child.pid(), ?timeout, "child process timed out, killing");
                child.kill_and_reap()?;
                return Err(RunAsUserError::Timeout {
                    pid: child.pid(),
                    seconds: timeout.as_secs_f64(),
                });
            }
        }
    }
}
