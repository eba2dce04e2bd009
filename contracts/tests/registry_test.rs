//! Integration tests for vault allocation and registry administration.
//!
//! These go through the runtime the way an operator would: deploy, initialize,
//! allocate, then drive the registry's administrative surface and check what
//! every vault observes.

mod common;

use std::sync::Arc;

use common::{setup, LimitedVault};
use custody_contracts::{vault_identity, ExecError, RegistryError, VaultError};
use custody_protocol::{Address, Event};

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[test]
fn double_allocation_fails_and_keeps_original() {
    let mut w = setup();
    let vault = w.vault_for(w.alice);
    w.rt.vault(vault).deposit(w.alice, w.usdc, 700).unwrap();

    let err = w
        .rt
        .registry(w.registry)
        .allocate_vault(w.bob, w.alice)
        .unwrap_err();
    assert_eq!(
        err,
        RegistryError::VaultExists {
            owner: w.alice,
            vault
        }
        .into()
    );

    let reg = w.rt.registry(w.registry);
    assert_eq!(reg.get_vault(w.alice).unwrap(), Some(vault));
    assert_eq!(reg.total_vaults().unwrap(), 1);
    assert_eq!(w.rt.vault(vault).balance(w.usdc).unwrap(), 700);
    assert_eq!(w.rt.vault(vault).asset_owner().unwrap(), w.alice);
}

#[test]
fn prediction_matches_allocation_for_every_owner() {
    let mut w = setup();
    let second = w.rt.deploy_registry(w.admin).unwrap();
    w.rt.registry(second).initialize(w.admin, w.admin, w.logic).unwrap();

    for i in 0..25 {
        let owner = Address::from_label(&format!("owner-{i}"));
        for registry in [w.registry, second] {
            let predicted = w.rt.registry(registry).predict_vault_address(owner).unwrap();
            assert_eq!(predicted, vault_identity(&registry, &owner).unwrap());
            let allocated = w.rt.registry(registry).allocate_vault(w.admin, owner).unwrap();
            assert_eq!(predicted, allocated);
        }
    }

    // Same owner, different registries, different vaults.
    let owner = Address::from_label("owner-0");
    assert_ne!(
        w.rt.registry(w.registry).get_vault(owner).unwrap(),
        w.rt.registry(second).get_vault(owner).unwrap()
    );
    assert_eq!(w.rt.registry(w.registry).total_vaults().unwrap(), 25);
}

#[test]
fn all_vaults_preserves_allocation_order() {
    let mut w = setup();
    let owners: Vec<Address> = ["carol", "alice", "dave"]
        .iter()
        .map(|l| Address::from_label(l))
        .collect();
    let vaults: Vec<Address> = owners.iter().map(|o| w.vault_for(*o)).collect();
    assert_eq!(w.rt.registry(w.registry).all_vaults().unwrap(), vaults);
}

#[test]
fn allocation_requires_initialized_registry() {
    let mut w = setup();
    let fresh = w.rt.deploy_registry(w.admin).unwrap();
    assert_eq!(
        w.rt.registry(fresh).allocate_vault(w.admin, w.alice).unwrap_err(),
        RegistryError::LogicUnset.into()
    );
    assert_eq!(
        w.rt.registry(fresh).allocate_vault(w.admin, Address::ZERO).unwrap_err(),
        RegistryError::ZeroAddress("owner").into()
    );
}

#[test]
fn allocation_emits_ordered_events() {
    let mut w = setup();
    let vault = w.vault_for(w.alice);

    let initialized = w.events_named("vault_initialized");
    assert_eq!(
        initialized,
        vec![Event::VaultInitialized {
            administrative_owner: w.registry,
            asset_owner: w.alice
        }]
    );
    let allocated = w.events_named("vault_allocated");
    assert_eq!(
        allocated,
        vec![Event::VaultAllocated {
            owner: w.alice,
            vault,
            index: 0
        }]
    );

    let sequences: Vec<u64> = w.rt.logs().iter().map(|e| e.sequence).collect();
    let expected: Vec<u64> = (0..sequences.len() as u64).collect();
    assert_eq!(sequences, expected);
}

// ---------------------------------------------------------------------------
// Shared logic
// ---------------------------------------------------------------------------

#[test]
fn upgrade_is_observed_by_existing_vault_on_next_call() {
    let mut w = setup();
    let vault = w.funded_vault(5_000);
    assert_eq!(w.rt.vault(vault).logic_version().unwrap(), 1);

    let v2 = w
        .rt
        .deploy_logic(w.admin, Arc::new(LimitedVault { limit: 1_000 }))
        .unwrap();
    w.rt.registry(w.registry).upgrade_logic(w.admin, v2).unwrap();

    assert_eq!(w.rt.vault(vault).logic_version().unwrap(), 2);
    assert!(matches!(
        w.rt.vault(vault).withdraw(w.alice, w.usdc, 2_000),
        Err(ExecError::Reverted(_))
    ));
    w.rt.vault(vault).withdraw(w.alice, w.usdc, 1_000).unwrap();

    // Storage and identity survived the upgrade.
    assert_eq!(w.rt.vault(vault).balance(w.usdc).unwrap(), 4_000);
    assert_eq!(w.rt.vault(vault).asset_owner().unwrap(), w.alice);

    // Vaults allocated afterwards run the new logic too.
    let bob_vault = w.vault_for(w.bob);
    assert_eq!(w.rt.vault(bob_vault).logic_version().unwrap(), 2);

    assert_eq!(
        w.events_named("logic_upgraded"),
        vec![Event::LogicUpgraded {
            previous: w.logic,
            current: v2
        }]
    );
}

#[test]
fn upgrade_to_null_rejected() {
    let mut w = setup();
    assert_eq!(
        w.rt.registry(w.registry)
            .upgrade_logic(w.admin, Address::ZERO)
            .unwrap_err(),
        RegistryError::ZeroAddress("logic").into()
    );
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

#[test]
fn administrator_pauses_and_unpauses_a_vault() {
    let mut w = setup();
    let vault = w.funded_vault(1_000);

    w.rt.registry(w.registry).pause_vault(w.admin, vault).unwrap();
    assert!(w.rt.vault(vault).is_paused().unwrap());
    w.rt.registry(w.registry).unpause_vault(w.admin, vault).unwrap();
    assert!(!w.rt.vault(vault).is_paused().unwrap());

    assert_eq!(
        w.events_named("vault_paused"),
        vec![Event::VaultPaused { by: w.registry }]
    );
}

#[test]
fn administrator_cannot_move_vault_funds() {
    let mut w = setup();
    let vault = w.funded_vault(1_000);
    assert_eq!(
        w.rt.vault(vault).withdraw(w.admin, w.usdc, 1).unwrap_err(),
        VaultError::NotAssetOwner { caller: w.admin }.into()
    );
}

#[test]
fn transfer_of_administration_moves_every_right() {
    let mut w = setup();
    let vault = w.vault_for(w.alice);
    let successor = Address::from_label("successor");

    w.rt.registry(w.registry)
        .transfer_administration(w.admin, successor)
        .unwrap();
    assert_eq!(w.rt.registry(w.registry).administrator().unwrap(), successor);

    let stale: ExecError = RegistryError::NotAdministrator { caller: w.admin }.into();
    assert_eq!(w.rt.registry(w.registry).pause(w.admin).unwrap_err(), stale);
    assert_eq!(
        w.rt.registry(w.registry).pause_vault(w.admin, vault).unwrap_err(),
        stale
    );

    w.rt.registry(w.registry).pause_vault(successor, vault).unwrap();
    w.rt.registry(w.registry).set_manager(successor, w.manager).unwrap();
    assert_eq!(
        w.events_named("administration_transferred"),
        vec![Event::AdministrationTransferred {
            previous: w.admin,
            current: successor
        }]
    );
}

#[test]
fn set_manager_reports_previous() {
    let mut w = setup();
    let next = Address::from_label("next-manager");
    w.rt.registry(w.registry).set_manager(w.admin, w.manager).unwrap();
    w.rt.registry(w.registry).set_manager(w.admin, next).unwrap();
    assert_eq!(
        w.events_named("manager_changed"),
        vec![
            Event::ManagerChanged {
                previous: None,
                current: w.manager
            },
            Event::ManagerChanged {
                previous: Some(w.manager),
                current: next
            },
        ]
    );
    assert_eq!(
        w.rt.registry(w.registry)
            .set_manager(w.admin, Address::ZERO)
            .unwrap_err(),
        RegistryError::ZeroAddress("manager").into()
    );
}

#[test]
fn failed_administrative_call_leaves_no_trace() {
    let mut w = setup();
    let before = w.rt.logs().len();
    let mallory = Address::from_label("mallory");
    let _ = w.rt.registry(w.registry).pause(mallory);
    let _ = w.rt.registry(w.registry).pause_vault(w.admin, mallory);
    assert_eq!(w.rt.logs().len(), before);
    assert!(!w.rt.registry(w.registry).is_paused().unwrap());
}

#[test]
fn event_log_is_indexer_readable() {
    let mut w = setup();
    let vault = w.vault_for(w.alice);
    let allocated = w
        .rt
        .logs()
        .iter()
        .rfind(|entry| entry.event.name() == "vault_allocated")
        .cloned()
        .unwrap();

    let json = serde_json::to_value(&allocated).unwrap();
    assert_eq!(json["event"], "vault_allocated");
    assert_eq!(json["emitter"], w.registry.to_hex());
    assert_eq!(json["vault"], vault.to_hex());
    assert_eq!(json["owner"], w.alice.to_hex());
    assert_eq!(json["index"], 0);
}
