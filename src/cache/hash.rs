//! Content hashing utilities for cache keys and schema fingerprints.

use sha2::{Digest, Sha256};

/// Compute the SHA256 digest of a string.
///
/// Returns a 64-character lowercase hexadecimal string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Hash a namespace prefix and its arguments into a fixed-length key.
///
/// The hashed text is the prefix followed by each argument, joined with `:`.
/// Argument shapes may differ between namespaces; the digest length does not.
pub fn compute_key<S: AsRef<str>>(prefix: &str, args: &[S]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(prefix);
    parts.extend(args.iter().map(AsRef::as_ref));
    sha256_hex(&parts.join(":"))
}
