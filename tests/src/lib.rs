//! # Isolated Trace Runtime Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Shared identities, configs, payload builders
//! ├── integration/      # Cross-crate flows
//! │   ├── all_operations.rs
//! │   └── isolation_flows.rs
//! └── exploits/         # Tenant-escape attempts
//!     └── tenant_escape.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p trace-tests
//!
//! # By category
//! cargo test -p trace-tests integration::
//! cargo test -p trace-tests exploits::
//!
//! # Benchmarks
//! cargo bench -p trace-tests
//! ```

pub mod exploits;
pub mod fixtures;
pub mod integration;
