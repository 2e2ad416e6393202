//! Attempts by code inside the child to act outside its bound tenant.

pub mod tenant_escape;
