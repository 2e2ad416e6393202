//! # Execution Context
//!
//! Ambient values (secrets, for now) that user code reads without having
//! them threaded through every call. The context lives in a thread-local, so
//! it does not follow work onto other threads or into a forked child by
//! itself: the parent captures it explicitly and installs it at the start of
//! the Receiver worker and of the child.

use std::cell::RefCell;
use std::collections::BTreeMap;

thread_local! {
    static CURRENT: RefCell<ExecutionContext> = RefCell::new(ExecutionContext::default());
}

/// Snapshot of the ambient context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    secrets: BTreeMap<String, String>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }

    pub fn secret(&self, name: &str) -> Option<&str> {
        self.secrets.get(name).map(String::as_str)
    }

    pub fn secret_names(&self) -> impl Iterator<Item = &str> {
        self.secrets.keys().map(String::as_str)
    }

    /// Copy of the context installed on the calling thread.
    pub fn capture() -> Self {
        CURRENT.with(|current| current.borrow().clone())
    }

    /// Make this the calling thread's context, returning the previous one.
    pub fn install(self) -> Self {
        CURRENT.with(|current| current.replace(self))
    }

    /// Read one secret from the calling thread's context.
    pub fn current_secret(name: &str) -> Option<String> {
        CURRENT.with(|current| current.borrow().secret(name).map(str::to_string))
    }
}
