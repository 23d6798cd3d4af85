//! Token fingerprints for logs.
//!
//! Session events are logged with a truncated SHA-256 of the token so two
//! log lines can be correlated without the token itself ever being written.

use sha2::{Digest, Sha256};

/// Length of the fingerprint in bytes before hex encoding.
const FINGERPRINT_BYTES: usize = 8;

/// First 8 bytes of SHA-256(token), as 16 lowercase hex characters.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..FINGERPRINT_BYTES])
}
