//! Integration tests for the identity primitives as other crates see them:
//! text and binary forms of [`Address`], and the derivation pipeline that
//! vault allocation is built on.

use std::collections::HashSet;

use custody_protocol::config::VAULT_CREATION_CODE;
use custody_protocol::identity::{
    contract_address, create2_address, creation_code_hash, vault_salt,
};
use custody_protocol::{Address, AddressError, Event, LogEntry};

// ---------------------------------------------------------------------------
// Text and binary forms
// ---------------------------------------------------------------------------

#[test]
fn hex_text_form_parses_back() {
    let addr = Address::from_label("alice");
    let text = addr.to_hex();
    assert!(text.starts_with("0x"));
    assert_eq!(text.len(), 42);
    assert_eq!(text.parse::<Address>().unwrap(), addr);
    assert_eq!(text.to_uppercase().replacen("0X", "0x", 1).parse::<Address>().unwrap(), addr);
    assert_eq!(text.trim_start_matches("0x").parse::<Address>().unwrap(), addr);
}

#[test]
fn malformed_text_is_rejected() {
    assert!(matches!(
        "0x1234".parse::<Address>(),
        Err(AddressError::InvalidLength { expected: 20, got: 2 })
    ));
    assert!(matches!(
        "0xzz".parse::<Address>(),
        Err(AddressError::InvalidHex(_))
    ));
}

#[test]
fn json_uses_hex_and_bincode_uses_raw_bytes() {
    let addr = Address::new([0xab; 20]);

    let json = serde_json::to_string(&addr).unwrap();
    assert_eq!(json, format!("\"0x{}\"", "ab".repeat(20)));
    assert_eq!(serde_json::from_str::<Address>(&json).unwrap(), addr);

    let bytes = bincode::serialize(&addr).unwrap();
    assert_eq!(bytes, vec![0xab; 20]);
    assert_eq!(bincode::deserialize::<Address>(&bytes).unwrap(), addr);
}

#[test]
fn null_identity_is_distinguishable() {
    assert!(Address::ZERO.is_zero());
    assert!(Address::default().is_zero());
    assert!(!Address::from_label("").is_zero());
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

fn vault_like(registry: &Address, owner: &Address) -> Address {
    let code_hash = creation_code_hash(&(VAULT_CREATION_CODE, *registry)).unwrap();
    create2_address(registry, &vault_salt(owner), &code_hash)
}

#[test]
fn owner_identities_do_not_collide() {
    let registry = Address::from_label("registry");
    let derived: HashSet<Address> = (0..2_000)
        .map(|i| vault_like(&registry, &Address::from_label(&format!("owner-{i}"))))
        .collect();
    assert_eq!(derived.len(), 2_000);
}

#[test]
fn same_owner_differs_across_registries() {
    let owner = Address::from_label("alice");
    let a = vault_like(&Address::from_label("registry-a"), &owner);
    let b = vault_like(&Address::from_label("registry-b"), &owner);
    assert_ne!(a, b);
}

#[test]
fn nonce_and_content_addressed_spaces_are_separate() {
    let deployer = Address::from_label("registry");
    let nonce_based: HashSet<Address> = (0..256).map(|n| contract_address(&deployer, n)).collect();
    let owner = Address::from_label("alice");
    assert!(!nonce_based.contains(&vault_like(&deployer, &owner)));
}

// ---------------------------------------------------------------------------
// Event log
// ---------------------------------------------------------------------------

#[test]
fn log_entry_survives_json() {
    let entry = LogEntry {
        sequence: 0,
        emitter: Address::from_label("registry"),
        event: Event::VaultAllocated {
            owner: Address::from_label("alice"),
            vault: Address::from_label("vault"),
            index: 0,
        },
        recorded_at: chrono::Utc::now(),
    };
    let text = serde_json::to_string(&entry).unwrap();
    let back: LogEntry = serde_json::from_str(&text).unwrap();
    assert_eq!(back, entry);
    assert_eq!(back.event.name(), "vault_allocated");
}
