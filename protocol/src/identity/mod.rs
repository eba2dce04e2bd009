//! # Identity
//!
//! ```text
//! address.rs    the 20-byte Address type, hex text form, label identities
//! derivation.rs nonce-based and CREATE2-style identity derivation
//! ```

pub mod address;
pub mod derivation;

pub use address::{Address, AddressError};
pub use derivation::{
    contract_address, create2_address, creation_code_hash, vault_salt, DerivationError,
};
