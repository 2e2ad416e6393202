//! # Identity Enforcement
//!
//! Everything an isolated child sends is untrusted. Before a request reaches
//! the real backend, [`IdentityEnforcingServer`] checks the tenant identity it
//! claims against the identity bound for this execution.
//!
//! ## Security Invariants
//!
//! - **Fail Closed**: a claimed identity that differs from the bound one is
//!   refused; it is never replaced by the bound one
//! - **Injection Only When Absent**: an omitted `user_id` is filled in with the
//!   bound user
//! - **Checked Before Dispatch**: a refused call never reaches the backend
//! - **Unambiguous Translation**: external ids that cannot be translated to an
//!   internal id are refused

mod adapter;
mod context;
mod converter;

pub use adapter::IdentityEnforcingServer;
pub use context::IdentityContext;
pub use converter::{IdConverter, PassthroughIdConverter, PlaceholderEntityIdConverter};
