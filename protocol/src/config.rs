//! # Protocol Configuration & Constants
//!
//! Every magic number in the custody protocol lives here. Identity
//! derivation depends on several of them, so changing any value below
//! changes every predicted vault address. Treat them as frozen once a
//! registry has allocated its first vault.

// ---------------------------------------------------------------------------
// Protocol Version
// ---------------------------------------------------------------------------

/// The full protocol version string.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Version number reported by the standard vault logic body.
pub const STANDARD_VAULT_LOGIC_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Identity Parameters
// ---------------------------------------------------------------------------

/// Length of an identity in bytes. The trailing 20 bytes of a 32-byte digest.
pub const ADDRESS_LENGTH: usize = 20;

/// Hash output length in bytes. Both SHA-256 and BLAKE3 produce 32-byte digests.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// Leading byte of the CREATE2-style preimage
/// `0xff || deployer || salt || code_hash`. Distinguishes it from any
/// preimage used for nonce-based deployment.
pub const CREATE2_PREFIX: u8 = 0xff;

/// BLAKE3 `derive_key` context for nonce-based contract identities.
pub const CONTRACT_ADDRESS_CONTEXT: &str = "custody 2026-01 contract address";

/// BLAKE3 `derive_key` context for per-owner vault salts.
pub const VAULT_SALT_CONTEXT: &str = "custody 2026-01 vault salt";

/// BLAKE3 `derive_key` context for vault creation payload digests.
pub const CREATION_CODE_CONTEXT: &str = "custody 2026-01 creation code";

/// BLAKE3 `derive_key` context for label-derived identities.
pub const LABEL_ADDRESS_CONTEXT: &str = "custody 2026-01 label address";

/// Fixed registry-scoped constant mixed into every vault salt.
pub const REGISTRY_SALT: &[u8] = b"custody.registry.vault.v1";

/// Identifier of the vault creation routine. Part of the creation payload
/// hashed into every vault identity.
pub const VAULT_CREATION_CODE: &str = "custody.beacon-proxy.v1";

// ---------------------------------------------------------------------------
// Runtime Limits
// ---------------------------------------------------------------------------

/// Maximum nesting depth of calls inside one transaction. A strategy that
/// calls back into a vault that calls a ledger that calls back again burns
/// through this quickly, which is the point.
pub const MAX_CALL_DEPTH: usize = 64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_contexts_are_distinct() {
        let contexts = [
            CONTRACT_ADDRESS_CONTEXT,
            VAULT_SALT_CONTEXT,
            CREATION_CODE_CONTEXT,
            LABEL_ADDRESS_CONTEXT,
        ];
        for (i, a) in contexts.iter().enumerate() {
            for b in contexts.iter().skip(i + 1) {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn address_fits_in_digest() {
        assert!(ADDRESS_LENGTH < HASH_OUTPUT_LENGTH);
    }

    #[test]
    fn call_depth_allows_nested_strategies() {
        // registry -> vault -> target -> ledger needs at least four frames.
        assert!(MAX_CALL_DEPTH >= 4);
    }
}
