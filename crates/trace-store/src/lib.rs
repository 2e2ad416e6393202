//! # Trace Store
//!
//! An in-memory implementation of [`trace_types::TraceServer`].
//!
//! All records are keyed by the *internal* project id. The store has no notion
//! of tenants or users beyond what each request carries; enforcing who may ask
//! for what is the job of the identity adapter placed in front of it.
//!
//! ## Crate Structure
//!
//! - `digest` - content addressing (SHA-256, hex encoded)
//! - `state` - per-project record tables behind one `RwLock`
//! - `service/` - the `TraceServer` implementation, one file per area
//!
//! ## Test Hooks
//!
//! `InMemoryTraceServer` counts every operation it serves and can be told to
//! fail the next stream part way through. Both exist so the IPC layer can be
//! tested against a backend whose behaviour is observable.

pub mod digest;
pub mod service;
pub mod state;

pub use service::InMemoryTraceServer;
