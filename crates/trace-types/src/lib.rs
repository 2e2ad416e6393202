//! # Trace Types Crate
//!
//! The trace server interface (`TraceServer`) together with the request and
//! response payloads of every operation it exposes.
//!
//! ## Design Principles
//!
//! - **Closed Operation Set**: The trait lists every operation by name. The
//!   IPC layer mirrors this set one variant per operation, so adding an
//!   operation is a compile error until every side handles it.
//! - **Serializable Payloads**: Every request and response derives
//!   `Serialize`/`Deserialize` so it can cross a process boundary.
//! - **Identity In The Payload**: Tenant identity (`project_id`, `user_id`)
//!   travels inside requests. It is never trusted on its own; the identity
//!   adapter in `trace-ipc` checks it against the bound identity.

pub mod calls;
pub mod completions;
pub mod cost;
pub mod error;
pub mod feedback;
pub mod files;
pub mod objects;
pub mod refs;
pub mod server;
pub mod tables;
pub mod threads;

pub use calls::*;
pub use completions::*;
pub use cost::*;
pub use error::{TraceResult, TraceServerError};
pub use feedback::*;
pub use files::*;
pub use objects::*;
pub use refs::{
    RefKind, RefsReadBatchReq, RefsReadBatchRes, TraceRef, EXTERNAL_REF_SCHEME, INTERNAL_REF_SCHEME,
};
pub use server::{stream_from_vec, TraceServer, TraceStream};
pub use tables::*;
pub use threads::*;
