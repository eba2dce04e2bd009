//! # Vault Registry
//!
//! Allocates one vault per owner identity at a deterministic address and
//! keeps the directory of everything it allocated. It also holds the
//! pieces of authority every vault reads live:
//!
//! - the **shared-logic pointer**, through which each vault resolves its
//!   code on every call;
//! - the **manager**, the single identity allowed to run strategies on any
//!   vault;
//! - the optional **target allowlist** in front of strategy execution.
//!
//! ## Security Model
//!
//! - **Administrator**: pauses allocation, redirects the logic pointer,
//!   pauses individual vaults, rotates the manager, curates the allowlist
//!   and can hand the role to someone else. It never moves vault funds.
//! - **Allocation** is open to any caller, but each owner gets exactly one
//!   vault, forever. Re-allocation fails instead of replacing.
//! - **Identity**: `allocate_vault` and `predict_vault_address` both go
//!   through [`vault_identity`], so a prediction is always what allocation
//!   produces.

use std::collections::{BTreeMap, BTreeSet};

use custody_protocol::{Address, Event};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::beacon::{vault_identity, SharedLogic};
use crate::error::ExecError;
use crate::runtime::{Account, Call, Env, Return};
use crate::vault::{VaultCall, VaultStorage};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A required identity argument was the null identity.
    #[error("{0} must not be the null identity")]
    ZeroAddress(&'static str),

    #[error("registry already initialized")]
    AlreadyInitialized,

    #[error("registry not initialized")]
    NotInitialized,

    #[error("unauthorized: {caller} is not the administrator")]
    NotAdministrator { caller: Address },

    /// Allocation is suspended.
    #[error("registry is paused")]
    Paused,

    #[error("registry is not paused")]
    NotPaused,

    /// The shared-logic pointer has never been installed.
    #[error("shared logic pointer is unset")]
    LogicUnset,

    /// The address is not a deployed logic body.
    #[error("{0} is not a vault logic body")]
    InvalidLogic(Address),

    #[error("owner {owner} already has vault {vault}")]
    VaultExists { owner: Address, vault: Address },

    #[error("{0} is not a vault of this registry")]
    VaultNotFound(Address),
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// Everything the registry answers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryCall {
    Initialize { administrator: Address, logic: Address },
    AllocateVault { owner: Address },
    PredictVaultAddress { owner: Address },
    SetManager { manager: Address },
    UpgradeLogic { logic: Address },
    PauseVault { vault: Address },
    UnpauseVault { vault: Address },
    Pause,
    Unpause,
    TransferAdministration { administrator: Address },
    SetTargetAllowlist { enabled: bool },
    PermitTarget { target: Address },
    RevokeTarget { target: Address },

    // queries
    GetVault { owner: Address },
    HasVault { owner: Address },
    IsVault { vault: Address },
    TotalVaults,
    AllVaults,
    CurrentLogic,
    Administrator,
    Manager,
    IsPaused,
    IsTargetPermitted { target: Address },
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Strategy targets the administrator has vetted. Ignored while disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAllowlist {
    enabled: bool,
    permitted: BTreeSet<Address>,
}

impl TargetAllowlist {
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Everything is permitted while the list is disabled.
    pub fn permits(&self, target: &Address) -> bool {
        !self.enabled || self.permitted.contains(target)
    }
}

/// Registry storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStorage {
    initialized: bool,
    administrator: Address,
    paused: bool,
    logic: SharedLogic,
    owner_to_vault: BTreeMap<Address, Address>,
    is_vault: BTreeSet<Address>,
    /// Allocation order. Never shrinks.
    all_vaults: Vec<Address>,
    manager: Option<Address>,
    allowlist: TargetAllowlist,
}

impl RegistryStorage {
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn administrator(&self) -> Address {
        self.administrator
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn logic(&self) -> &SharedLogic {
        &self.logic
    }

    pub fn vault_of(&self, owner: &Address) -> Option<Address> {
        self.owner_to_vault.get(owner).copied()
    }

    pub fn is_vault(&self, vault: &Address) -> bool {
        self.is_vault.contains(vault)
    }

    pub fn all_vaults(&self) -> &[Address] {
        &self.all_vaults
    }

    pub fn manager(&self) -> Option<Address> {
        self.manager
    }

    pub fn allowlist(&self) -> &TargetAllowlist {
        &self.allowlist
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn storage<'a>(env: &'a Env<'_>) -> Result<&'a RegistryStorage, ExecError> {
    let this = env.this();
    env.world()
        .registry(&this)
        .ok_or(ExecError::UnknownAccount(this))
}

fn storage_mut<'a>(env: &'a mut Env<'_>) -> Result<&'a mut RegistryStorage, ExecError> {
    let this = env.this();
    env.world_mut()
        .registry_mut(&this)
        .ok_or(ExecError::UnknownAccount(this))
}

fn require_administrator(env: &Env<'_>) -> Result<(), ExecError> {
    let registry = storage(env)?;
    if !registry.initialized {
        return Err(RegistryError::NotInitialized.into());
    }
    let caller = env.caller();
    if caller != registry.administrator {
        return Err(RegistryError::NotAdministrator { caller }.into());
    }
    Ok(())
}

fn non_null(address: Address, what: &'static str) -> Result<Address, ExecError> {
    if address.is_zero() {
        return Err(RegistryError::ZeroAddress(what).into());
    }
    Ok(address)
}

pub(crate) fn handle(env: &mut Env<'_>, call: RegistryCall) -> Result<Return, ExecError> {
    match call {
        RegistryCall::Initialize {
            administrator,
            logic,
        } => initialize(env, administrator, logic),
        RegistryCall::AllocateVault { owner } => allocate_vault(env, owner).map(Return::Address),
        RegistryCall::PredictVaultAddress { owner } => {
            let owner = non_null(owner, "owner")?;
            Ok(Return::Address(vault_identity(&env.this(), &owner)?))
        }
        RegistryCall::SetManager { manager } => set_manager(env, manager),
        RegistryCall::UpgradeLogic { logic } => upgrade_logic(env, logic),
        RegistryCall::PauseVault { vault } => forward_to_vault(env, vault, VaultCall::Pause),
        RegistryCall::UnpauseVault { vault } => forward_to_vault(env, vault, VaultCall::Unpause),
        RegistryCall::Pause => set_paused(env, true),
        RegistryCall::Unpause => set_paused(env, false),
        RegistryCall::TransferAdministration { administrator } => {
            transfer_administration(env, administrator)
        }
        RegistryCall::SetTargetAllowlist { enabled } => {
            require_administrator(env)?;
            storage_mut(env)?.allowlist.enabled = enabled;
            info!(registry = %env.this(), enabled, "target allowlist toggled");
            env.emit(Event::TargetAllowlistToggled { enabled });
            Ok(Return::Unit)
        }
        RegistryCall::PermitTarget { target } => {
            require_administrator(env)?;
            let target = non_null(target, "target")?;
            storage_mut(env)?.allowlist.permitted.insert(target);
            env.emit(Event::TargetPermitted { target });
            Ok(Return::Unit)
        }
        RegistryCall::RevokeTarget { target } => {
            require_administrator(env)?;
            let target = non_null(target, "target")?;
            storage_mut(env)?.allowlist.permitted.remove(&target);
            env.emit(Event::TargetRevoked { target });
            Ok(Return::Unit)
        }

        RegistryCall::GetVault { owner } => Ok(Return::MaybeAddress(storage(env)?.vault_of(&owner))),
        RegistryCall::HasVault { owner } => {
            Ok(Return::Bool(storage(env)?.vault_of(&owner).is_some()))
        }
        RegistryCall::IsVault { vault } => Ok(Return::Bool(storage(env)?.is_vault(&vault))),
        RegistryCall::TotalVaults => Ok(Return::Count(storage(env)?.all_vaults.len() as u64)),
        RegistryCall::AllVaults => Ok(Return::Addresses(storage(env)?.all_vaults.clone())),
        RegistryCall::CurrentLogic => Ok(Return::MaybeAddress(
            storage(env)?.logic.implementation(),
        )),
        RegistryCall::Administrator => Ok(Return::Address(storage(env)?.administrator)),
        RegistryCall::Manager => Ok(Return::MaybeAddress(storage(env)?.manager)),
        RegistryCall::IsPaused => Ok(Return::Bool(storage(env)?.paused)),
        RegistryCall::IsTargetPermitted { target } => {
            Ok(Return::Bool(storage(env)?.allowlist.permits(&target)))
        }
    }
}

fn initialize(env: &mut Env<'_>, administrator: Address, logic: Address) -> Result<Return, ExecError> {
    if storage(env)?.initialized {
        return Err(RegistryError::AlreadyInitialized.into());
    }
    let administrator = non_null(administrator, "administrator")?;
    let logic = non_null(logic, "logic")?;
    if env.world().logic(&logic).is_none() {
        return Err(RegistryError::InvalidLogic(logic).into());
    }

    let registry = storage_mut(env)?;
    registry.initialized = true;
    registry.administrator = administrator;
    registry.paused = false;
    registry.logic.install(logic);

    info!(registry = %env.this(), %administrator, %logic, "registry initialized");
    env.emit(Event::RegistryInitialized {
        administrator,
        logic,
    });
    Ok(Return::Unit)
}

fn allocate_vault(env: &mut Env<'_>, owner: Address) -> Result<Address, ExecError> {
    let owner = non_null(owner, "owner")?;
    let registry = storage(env)?;
    if registry.paused {
        return Err(RegistryError::Paused.into());
    }
    if registry.logic.implementation().is_none() {
        return Err(RegistryError::LogicUnset.into());
    }
    if let Some(vault) = registry.vault_of(&owner) {
        return Err(RegistryError::VaultExists { owner, vault }.into());
    }

    let this = env.this();
    let vault = vault_identity(&this, &owner)?;
    env.world_mut()
        .create(vault, Account::Vault(VaultStorage::new(this)))?;
    env.call(
        vault,
        Call::Vault(VaultCall::Initialize {
            administrative_owner: this,
            asset_owner: owner,
        }),
    )?;

    let registry = storage_mut(env)?;
    let index = registry.all_vaults.len() as u64;
    registry.owner_to_vault.insert(owner, vault);
    registry.is_vault.insert(vault);
    registry.all_vaults.push(vault);

    info!(registry = %this, %owner, %vault, index, "vault allocated");
    env.emit(Event::VaultAllocated {
        owner,
        vault,
        index,
    });
    Ok(vault)
}

fn set_manager(env: &mut Env<'_>, manager: Address) -> Result<Return, ExecError> {
    require_administrator(env)?;
    let manager = non_null(manager, "manager")?;
    let previous = storage_mut(env)?.manager.replace(manager);

    info!(registry = %env.this(), ?previous, current = %manager, "manager changed");
    env.emit(Event::ManagerChanged {
        previous,
        current: manager,
    });
    Ok(Return::Unit)
}

fn upgrade_logic(env: &mut Env<'_>, logic: Address) -> Result<Return, ExecError> {
    require_administrator(env)?;
    let logic = non_null(logic, "logic")?;
    if storage(env)?.logic.implementation().is_none() {
        return Err(RegistryError::LogicUnset.into());
    }
    if env.world().logic(&logic).is_none() {
        return Err(RegistryError::InvalidLogic(logic).into());
    }

    let previous = storage_mut(env)?
        .logic
        .upgrade_to(logic)
        .ok_or(RegistryError::LogicUnset)?;

    info!(registry = %env.this(), %previous, current = %logic, "shared logic upgraded");
    env.emit(Event::LogicUpgraded {
        previous,
        current: logic,
    });
    Ok(Return::Unit)
}

/// Pause and unpause of a single vault. The vault itself checks that the
/// caller is its administrative owner, which this registry is.
fn forward_to_vault(env: &mut Env<'_>, vault: Address, call: VaultCall) -> Result<Return, ExecError> {
    require_administrator(env)?;
    if !storage(env)?.is_vault(&vault) {
        return Err(RegistryError::VaultNotFound(vault).into());
    }
    env.call(vault, Call::Vault(call))?;
    Ok(Return::Unit)
}

fn set_paused(env: &mut Env<'_>, paused: bool) -> Result<Return, ExecError> {
    require_administrator(env)?;
    let registry = storage_mut(env)?;
    match (registry.paused, paused) {
        (true, true) => return Err(RegistryError::Paused.into()),
        (false, false) => return Err(RegistryError::NotPaused.into()),
        _ => registry.paused = paused,
    }

    let by = env.caller();
    info!(registry = %env.this(), paused, "registry pause state changed");
    env.emit(if paused {
        Event::RegistryPaused { by }
    } else {
        Event::RegistryUnpaused { by }
    });
    Ok(Return::Unit)
}

fn transfer_administration(env: &mut Env<'_>, administrator: Address) -> Result<Return, ExecError> {
    require_administrator(env)?;
    let current = non_null(administrator, "administrator")?;
    let registry = storage_mut(env)?;
    let previous = std::mem::replace(&mut registry.administrator, current);

    info!(registry = %env.this(), %previous, %current, "administration transferred");
    env.emit(Event::AdministrationTransferred { previous, current });
    Ok(Return::Unit)
}
