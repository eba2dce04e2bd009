//! # Cryptographic Primitives
//!
//! Hashing is the only cryptography this protocol needs, and it needs it in
//! exactly two places: deriving identities and domain-separating the inputs
//! to that derivation.
//!
//! - **BLAKE3** for salts, creation payload digests and label identities.
//! - **SHA-256** for the CREATE2-style outer hash, so the construction reads
//!   the same as the one every EVM tool already knows.
//!
//! Everything here is a thin wrapper around audited implementations.

pub mod hash;

pub use hash::{blake3_hash, blake3_hash_multi, domain_separated_hash, sha256, sha256_array};
