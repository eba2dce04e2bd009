//! # Shared Logic
//!
//! Vaults carry storage only. Their code lives in a logic body deployed at
//! its own identity, and every vault finds it through one pointer held by
//! its registry:
//!
//! ```text
//! vault.beacon ──▶ registry.logic ──▶ Account::Logic(body)
//! ```
//!
//! The chain is walked on every vault call and nothing along it is cached,
//! so redirecting the registry's pointer changes the code of every vault,
//! existing and future, at once. Storage and identities are untouched.
//!
//! The same module owns vault identity derivation, because a vault's
//! identity commits to its beacon.

use std::sync::Arc;

use custody_protocol::config::VAULT_CREATION_CODE;
use custody_protocol::identity::{create2_address, creation_code_hash, vault_salt, DerivationError};
use custody_protocol::Address;
use serde::{Deserialize, Serialize};

use crate::error::ExecError;
use crate::registry::RegistryError;
use crate::runtime::{Env, Return, WorldState};
use crate::vault::VaultCall;

/// Code for vault instances.
///
/// A logic body is immutable once deployed. Upgrading means deploying a
/// new body and pointing the registry at it.
pub trait VaultLogic: Send + Sync {
    /// Version number reported through `logic_version` queries.
    fn version(&self) -> u32;

    /// Runs one vault call against the storage at `env.this()`.
    fn handle(&self, env: &mut Env<'_>, call: VaultCall) -> Result<Return, ExecError>;
}

/// The registry-held pointer to the active logic body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedLogic {
    implementation: Option<Address>,
}

impl SharedLogic {
    pub fn implementation(&self) -> Option<Address> {
        self.implementation
    }

    pub(crate) fn install(&mut self, logic: Address) {
        self.implementation = Some(logic);
    }

    /// Redirects the pointer, returning where it pointed before.
    pub(crate) fn upgrade_to(&mut self, logic: Address) -> Option<Address> {
        self.implementation.replace(logic)
    }
}

/// Finds the code of the vault at `vault` by walking its beacon.
pub(crate) fn resolve_logic(
    world: &WorldState,
    vault: &Address,
) -> Result<Arc<dyn VaultLogic>, ExecError> {
    let storage = world.vault(vault).ok_or(ExecError::UnknownAccount(*vault))?;
    let beacon = storage.beacon();
    let registry = world
        .registry(&beacon)
        .ok_or(ExecError::UnknownAccount(beacon))?;
    let logic = registry
        .logic()
        .implementation()
        .ok_or(RegistryError::LogicUnset)?;
    world
        .logic(&logic)
        .ok_or_else(|| RegistryError::InvalidLogic(logic).into())
}

/// What a vault identity commits to besides owner and registry.
///
/// The beacon is part of it, so two registries never derive the same
/// vault identity even for the same owner.
#[derive(Debug, Clone, Serialize)]
struct CreationPayload<'a> {
    code: &'a str,
    beacon: Address,
    init_data: Vec<u8>,
}

/// Identity the vault of `owner` gets (or got) on `registry`.
///
/// Both allocation and prediction call this, so they cannot drift apart.
/// It needs no state, which makes offline prediction possible.
pub fn vault_identity(registry: &Address, owner: &Address) -> Result<Address, DerivationError> {
    let payload = CreationPayload {
        code: VAULT_CREATION_CODE,
        beacon: *registry,
        init_data: Vec::new(),
    };
    let code_hash = creation_code_hash(&payload)?;
    Ok(create2_address(registry, &vault_salt(owner), &code_hash))
}
