//! Cross-crate flows: Sender → Receiver → identity adapter → store, and the
//! full RunAsUser path with a forked child.

pub mod all_operations;
pub mod isolation_flows;
