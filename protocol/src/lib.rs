// Copyright (c) 2026 Custody Contributors. MIT License.
// See LICENSE for details.

//! # Custody Protocol: Shared Primitives
//!
//! Everything the registry, the vaults and the tooling around them need to
//! agree on byte-for-byte lives here: what an identity looks like, how new
//! identities are derived, which hash goes where, and the vocabulary of
//! events that indexers consume.
//!
//! ## Architecture
//!
//! - **config**: Protocol constants. Domain tags, prefixes, limits.
//! - **crypto**: Hashing. BLAKE3 internally, SHA-256 for CREATE2-style
//!   identity derivation.
//! - **identity**: The 20-byte [`Address`] and the pure derivation
//!   functions that map `(deployer, salt, code)` to a new identity.
//! - **events**: The event log entries emitted by contracts.
//! - **encoding**: Small serde helpers for hex-encoded byte payloads.
//!
//! ## Design Philosophy
//!
//! 1. Derivation is pure. Given the same inputs, every machine computes the
//!    same identity, before or after the fact.
//! 2. The null identity is a real value (`Address::ZERO`) that every
//!    operation must explicitly reject.
//! 3. Every public type is serializable.

pub mod config;
pub mod crypto;
pub mod encoding;
pub mod events;
pub mod identity;

pub use events::{Event, LogEntry};
pub use identity::{Address, AddressError};

/// Amounts are plain `u64` in the smallest unit of whatever ledger they
/// belong to. No floating point, no implicit decimals.
pub type Amount = u64;
