//! # Isolation Runtime
//!
//! Executes a user-scoped function inside a forked child process while the
//! trusted trace server stays in the parent.
//!
//! ## Execution Flow
//!
//! ```text
//!  parent                                         child (fork)
//!  ──────                                         ────────────
//!  1. check request identity ──✗──→ IdentityMismatch (no child)
//!  2. IdentityEnforcingServer(backend)
//!  3. Receiver (worker thread starts)
//!  4. ExecutionContext::capture()
//!  5. fork ─────────────────────────────────────→ install context
//!                                                 Sender from channel handles
//!                                                 target(request, ScopedClient)
//!     drain result channel  ←───── result ─────── send result, _exit(0)
//!  6. waitpid until exit or timeout (SIGKILL)
//!  7. Receiver::stop()
//! ```
//!
//! ## Modules
//!
//! - `process` - fork, wait and kill of the child
//! - `run_as_user` - the orchestrator and the child entry point
//! - `client` - the scoped client handed to target functions
//! - `context` - ambient execution context carried across the fork
//! - `run_model` - the RunModel request/response and predictor registry

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod process;
pub mod run_as_user;
pub mod run_model;

pub use client::ScopedClient;
pub use config::RuntimeConfig;
pub use context::ExecutionContext;
pub use error::RunAsUserError;
pub use run_as_user::{
    build_child_trace_server, generate_child_process_args, run_user_scoped_function,
    ChildProcessArgs, RunAsUser, ScopedRequest,
};
pub use run_model::{run_model, ModelInputs, ModelRunner, Predictor, RunModelReq, RunModelRes};
