//! Voter fingerprint derivation.
//!
//! Votes are keyed by an opaque fingerprint rather than an account id so
//! anonymous visitors can participate. Authenticated callers use their
//! subject id directly; anonymous callers get a SHA-256 digest of their
//! client token and network address.

use sha2::{Digest, Sha256};

/// Derive a stable fingerprint for an anonymous voter.
///
/// The token originates from a client-side cookie and the address from the
/// connection (or a forwarding proxy). Either part may be empty; the caller
/// is expected to ensure at least one is present.
#[must_use]
pub fn anonymous_fingerprint(token: &str, address: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.update(b":");
    hasher.update(address.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two secrets without short-circuiting on the first mismatch.
#[must_use]
pub fn secure_compare(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
