//! Content addressing.
//!
//! Values are hashed over their compact JSON encoding. `serde_json` keeps
//! object keys sorted, so equal values always produce equal digests.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hex encoded SHA-256 of raw bytes.
pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Digest of a JSON value.
pub fn digest_value(val: &Value) -> String {
    digest_bytes(val.to_string().as_bytes())
}

/// Digest of a table, derived from its row digests in order.
pub fn digest_rows(row_digests: &[String]) -> String {
    let mut hasher = Sha256::new();
    for d in row_digests {
        hasher.update(d.as_bytes());
        hasher.update(b"\n");
    }
    hex::encode(hasher.finalize())
}
