//! # Hashing Utilities
//!
//! Two hash functions, each with a job:
//!
//! - **BLAKE3**: the default. Used for vault salts, creation payload
//!   digests and label-derived identities. Domain separation goes through
//!   BLAKE3's `derive_key` mode, never through hand-prepended tags.
//!
//! - **SHA-256**: the outer hash of CREATE2-style identity derivation.
//!
//! Both produce 32-byte digests; identities keep the trailing 20 bytes.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hash of the input data.
///
/// # Example
///
/// ```
/// use custody_protocol::crypto::sha256;
///
/// let hash = sha256(b"custody");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256(data: &[u8]) -> Vec<u8> {
    sha256_array(data).to_vec()
}

/// Compute the SHA-256 hash and return a fixed-size array.
pub fn sha256_array(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute the BLAKE3 hash of the input data.
///
/// # Example
///
/// ```
/// use custody_protocol::crypto::blake3_hash;
///
/// let hash = blake3_hash(b"custody");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Compute a domain-separated hash using BLAKE3 with a context string.
///
/// `domain_separated_hash("a", data)` and `domain_separated_hash("b", data)`
/// never collide: `derive_key` mode uses an IV derived from the context.
/// The contexts used by the protocol live in [`crate::config`].
pub fn domain_separated_hash(context: &str, data: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    hasher.update(data);
    *hasher.finalize().as_bytes()
}

/// Domain-separated BLAKE3 over several parts fed sequentially.
///
/// Equivalent to hashing the concatenation, without allocating it.
pub fn blake3_hash_multi(context: &str, parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(context);
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}
