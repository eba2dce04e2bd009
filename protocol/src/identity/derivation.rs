//! # Identity Derivation
//!
//! Two ways to get a new identity, both pure:
//!
//! ```text
//! contract_address(deployer, nonce)
//!     = tail20( BLAKE3_derive_key(CONTRACT_ADDRESS_CONTEXT, deployer || nonce_be) )
//!
//! create2_address(deployer, salt, code_hash)
//!     = tail20( SHA-256(0xff || deployer || salt || code_hash) )
//! ```
//!
//! The first is used for ordinary deployments, where the identity only has
//! to be unique. The second is content-addressed: anyone who knows the
//! deployer, the salt and the creation payload can compute the identity
//! before the instance exists. Vault allocation relies on that.

use serde::Serialize;
use thiserror::Error;

use super::Address;
use crate::config::{
    ADDRESS_LENGTH, CONTRACT_ADDRESS_CONTEXT, CREATE2_PREFIX, CREATION_CODE_CONTEXT,
    HASH_OUTPUT_LENGTH, REGISTRY_SALT, VAULT_SALT_CONTEXT,
};
use crate::crypto::hash::{blake3_hash_multi, domain_separated_hash, sha256_array};

/// Errors produced while deriving an identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    /// The creation payload could not be encoded.
    #[error("creation payload encoding failed: {0}")]
    PayloadEncoding(String),
}

/// Identity of the `nonce`-th contract deployed by `deployer`.
pub fn contract_address(deployer: &Address, nonce: u64) -> Address {
    Address::from_digest(&blake3_hash_multi(
        CONTRACT_ADDRESS_CONTEXT,
        &[deployer.as_bytes(), &nonce.to_be_bytes()],
    ))
}

/// CREATE2-style content-addressed identity.
pub fn create2_address(deployer: &Address, salt: &[u8; 32], code_hash: &[u8; 32]) -> Address {
    let mut preimage = Vec::with_capacity(1 + ADDRESS_LENGTH + 2 * HASH_OUTPUT_LENGTH);
    preimage.push(CREATE2_PREFIX);
    preimage.extend_from_slice(deployer.as_bytes());
    preimage.extend_from_slice(salt);
    preimage.extend_from_slice(code_hash);
    Address::from_digest(&sha256_array(&preimage))
}

/// Per-owner salt: the registry-scoped constant followed by the owner.
pub fn vault_salt(owner: &Address) -> [u8; 32] {
    blake3_hash_multi(VAULT_SALT_CONTEXT, &[REGISTRY_SALT, owner.as_bytes()])
}

/// Digest of a creation payload, encoded with `bincode`.
///
/// The encoding is fixed-width for the payload types used in practice
/// (identifiers and addresses), so the digest is stable across platforms.
pub fn creation_code_hash<P: Serialize>(payload: &P) -> Result<[u8; 32], DerivationError> {
    let encoded =
        bincode::serialize(payload).map_err(|e| DerivationError::PayloadEncoding(e.to_string()))?;
    Ok(domain_separated_hash(CREATION_CODE_CONTEXT, &encoded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contract_address_depends_on_nonce_and_deployer() {
        let alice = Address::from_label("alice");
        let bob = Address::from_label("bob");
        assert_eq!(contract_address(&alice, 0), contract_address(&alice, 0));
        assert_ne!(contract_address(&alice, 0), contract_address(&alice, 1));
        assert_ne!(contract_address(&alice, 0), contract_address(&bob, 0));
    }

    #[test]
    fn create2_depends_on_every_input() {
        let deployer = Address::from_label("registry");
        let other = Address::from_label("other-registry");
        let salt = vault_salt(&Address::from_label("alice"));
        let salt_b = vault_salt(&Address::from_label("bob"));
        let code = [1u8; 32];
        let code_b = [2u8; 32];

        let base = create2_address(&deployer, &salt, &code);
        assert_eq!(base, create2_address(&deployer, &salt, &code));
        assert_ne!(base, create2_address(&other, &salt, &code));
        assert_ne!(base, create2_address(&deployer, &salt_b, &code));
        assert_ne!(base, create2_address(&deployer, &salt, &code_b));
    }

    #[test]
    fn create2_matches_manual_preimage() {
        let deployer = Address::new([0x11; 20]);
        let salt = [0x22; 32];
        let code = [0x33; 32];
        let mut preimage = vec![0xff];
        preimage.extend_from_slice(&[0x11; 20]);
        preimage.extend_from_slice(&[0x22; 32]);
        preimage.extend_from_slice(&[0x33; 32]);
        let expected = Address::from_digest(&sha256_array(&preimage));
        assert_eq!(create2_address(&deployer, &salt, &code), expected);
    }

    #[test]
    fn creation_code_hash_is_stable() {
        let payload = ("custody.beacon-proxy.v1", Address::from_label("registry"));
        let a = creation_code_hash(&payload).unwrap();
        let b = creation_code_hash(&payload).unwrap();
        assert_eq!(a, b);

        let other = ("custody.beacon-proxy.v1", Address::from_label("registry-2"));
        assert_ne!(a, creation_code_hash(&other).unwrap());
    }
}
