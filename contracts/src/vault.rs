//! # Vault
//!
//! A per-owner asset container. The vault account holds storage only
//! ([`VaultStorage`]); the operations live in a logic body, normally
//! [`StandardVault`], resolved through the registry on every call.
//!
//! ## Authority
//!
//! | operation          | who                                   |
//! |--------------------|---------------------------------------|
//! | `deposit`          | asset owner                           |
//! | `withdraw`         | asset owner                           |
//! | `execute_strategy` | the registry's manager, read live     |
//! | `pause`/`unpause`  | administrative owner (the registry)   |
//!
//! The administrator can stop a vault but never move its funds. The
//! manager can move funds only through approvals it grants in the same
//! atomic call.
//!
//! ## Re-entrancy
//!
//! The three operations that call out hold a per-vault busy flag for their
//! whole duration. Any nested entry into one of them on the same vault
//! fails with [`VaultError::Reentrancy`], whoever the caller is.
//!
//! Balances are never stored here. A vault owns whatever each ledger says
//! its identity owns.

use custody_protocol::config::STANDARD_VAULT_LOGIC_VERSION;
use custody_protocol::encoding::hex_bytes;
use custody_protocol::{Address, Amount, Event};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::beacon::VaultLogic;
use crate::error::ExecError;
use crate::ledger;
use crate::registry::RegistryCall;
use crate::runtime::{Call, Env, Return};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by vault logic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VaultError {
    /// A required identity argument was the null identity.
    #[error("{0} must not be the null identity")]
    ZeroAddress(&'static str),

    #[error("amount must be greater than zero")]
    ZeroAmount,

    #[error("vault already initialized")]
    AlreadyInitialized,

    #[error("vault not initialized")]
    NotInitialized,

    #[error("unauthorized: {caller} is not the asset owner")]
    NotAssetOwner { caller: Address },

    #[error("unauthorized: {caller} is not the administrative owner")]
    NotAdministrativeOwner { caller: Address },

    #[error("unauthorized: {caller} is not the manager")]
    NotManager { caller: Address },

    #[error("vault is paused")]
    Paused,

    #[error("vault is not paused")]
    NotPaused,

    /// A guarded operation was entered while another one was in flight.
    #[error("re-entrant call rejected")]
    Reentrancy,

    #[error("insufficient balance of {token}: vault holds {available}, requested {requested}")]
    InsufficientBalance {
        token: Address,
        available: Amount,
        requested: Amount,
    },

    /// The ledger call itself failed.
    #[error("ledger {token} failed on {operation}: {source}")]
    LedgerCallFailed {
        token: Address,
        operation: &'static str,
        source: Box<ExecError>,
    },

    /// The ledger answered `false`.
    #[error("ledger {token} rejected {operation}")]
    LedgerRejected {
        token: Address,
        operation: &'static str,
    },

    /// The strategy target failed. Approvals granted for it are gone too.
    #[error("strategy call to {target} failed: {source}")]
    ExecutionFailed {
        target: Address,
        source: Box<ExecError>,
    },

    #[error("strategy target {0} is not on the registry allowlist")]
    TargetNotPermitted(Address),
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// An allowance the vault grants to the strategy target before calling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub token: Address,
    pub amount: Amount,
}

/// Everything a vault answers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultCall {
    Initialize {
        administrative_owner: Address,
        asset_owner: Address,
    },
    Deposit {
        token: Address,
        amount: Amount,
    },
    Withdraw {
        token: Address,
        amount: Amount,
    },
    ExecuteStrategy {
        target: Address,
        #[serde(with = "hex_bytes")]
        payload: Vec<u8>,
        approvals: Vec<Approval>,
    },
    Pause,
    Unpause,

    // queries
    Balance {
        token: Address,
    },
    AssetOwner,
    AdministrativeOwner,
    IsPaused,
    LogicVersion,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Lifecycle of a vault. There is no way back to `Uninitialized`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultStatus {
    #[default]
    Uninitialized,
    Active,
    Paused,
}

/// Per-instance vault storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStorage {
    /// Registry whose logic pointer supplies this vault's code.
    beacon: Address,
    administrative_owner: Address,
    asset_owner: Address,
    status: VaultStatus,
    /// Set while a guarded operation is running.
    entered: bool,
}

impl VaultStorage {
    pub fn new(beacon: Address) -> Self {
        Self {
            beacon,
            administrative_owner: Address::ZERO,
            asset_owner: Address::ZERO,
            status: VaultStatus::Uninitialized,
            entered: false,
        }
    }

    pub fn beacon(&self) -> Address {
        self.beacon
    }

    pub fn administrative_owner(&self) -> Address {
        self.administrative_owner
    }

    pub fn asset_owner(&self) -> Address {
        self.asset_owner
    }

    pub fn status(&self) -> VaultStatus {
        self.status
    }

    fn require_initialized(&self) -> Result<(), VaultError> {
        match self.status {
            VaultStatus::Uninitialized => Err(VaultError::NotInitialized),
            _ => Ok(()),
        }
    }

    fn require_active(&self) -> Result<(), VaultError> {
        match self.status {
            VaultStatus::Uninitialized => Err(VaultError::NotInitialized),
            VaultStatus::Paused => Err(VaultError::Paused),
            VaultStatus::Active => Ok(()),
        }
    }
}

fn storage<'a>(env: &'a Env<'_>) -> Result<&'a VaultStorage, ExecError> {
    let this = env.this();
    env.world().vault(&this).ok_or(ExecError::UnknownAccount(this))
}

fn storage_mut<'a>(env: &'a mut Env<'_>) -> Result<&'a mut VaultStorage, ExecError> {
    let this = env.this();
    env.world_mut()
        .vault_mut(&this)
        .ok_or(ExecError::UnknownAccount(this))
}

/// Runs `body` with the busy flag held.
fn guarded<T>(
    env: &mut Env<'_>,
    body: impl FnOnce(&mut Env<'_>) -> Result<T, ExecError>,
) -> Result<T, ExecError> {
    let vault = storage_mut(env)?;
    if vault.entered {
        return Err(VaultError::Reentrancy.into());
    }
    vault.entered = true;

    let result = body(env);
    storage_mut(env)?.entered = false;
    result
}

/// Folds a ledger answer into the vault's error vocabulary.
fn ledger_outcome(
    token: Address,
    operation: &'static str,
    outcome: Result<bool, ExecError>,
) -> Result<(), ExecError> {
    match outcome {
        Ok(true) => Ok(()),
        Ok(false) => Err(VaultError::LedgerRejected { token, operation }.into()),
        Err(source) => Err(VaultError::LedgerCallFailed {
            token,
            operation,
            source: Box::new(source),
        }
        .into()),
    }
}

fn non_null(address: Address, what: &'static str) -> Result<Address, ExecError> {
    if address.is_zero() {
        return Err(VaultError::ZeroAddress(what).into());
    }
    Ok(address)
}

// ---------------------------------------------------------------------------
// Standard logic
// ---------------------------------------------------------------------------

/// The stock vault logic body.
///
/// Its operations are public so that later logic versions can reuse them
/// and only override what changes.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardVault;

impl StandardVault {
    pub fn initialize(
        &self,
        env: &mut Env<'_>,
        administrative_owner: Address,
        asset_owner: Address,
    ) -> Result<(), ExecError> {
        if storage(env)?.status != VaultStatus::Uninitialized {
            return Err(VaultError::AlreadyInitialized.into());
        }
        let administrative_owner = non_null(administrative_owner, "administrative owner")?;
        let asset_owner = non_null(asset_owner, "asset owner")?;

        let vault = storage_mut(env)?;
        vault.administrative_owner = administrative_owner;
        vault.asset_owner = asset_owner;
        vault.status = VaultStatus::Active;
        vault.entered = false;

        env.emit(Event::VaultInitialized {
            administrative_owner,
            asset_owner,
        });
        Ok(())
    }

    /// Pulls `amount` of `token` from the asset owner into the vault.
    ///
    /// The owner must have approved the vault on the ledger beforehand.
    pub fn deposit(&self, env: &mut Env<'_>, token: Address, amount: Amount) -> Result<(), ExecError> {
        guarded(env, |env| {
            let caller = env.caller();
            let this = env.this();
            self.check_owner_operation(env, token, amount)?;

            let outcome = ledger::transfer_from(env, token, caller, this, amount);
            ledger_outcome(token, "transfer_from", outcome)?;

            debug!(vault = %this, %token, amount, "deposit");
            env.emit(Event::Deposited { token, amount });
            Ok(())
        })
    }

    /// Sends `amount` of `token` back to the asset owner.
    pub fn withdraw(&self, env: &mut Env<'_>, token: Address, amount: Amount) -> Result<(), ExecError> {
        guarded(env, |env| {
            let caller = env.caller();
            let this = env.this();
            self.check_owner_operation(env, token, amount)?;

            let available = ledger::balance_of(env, token, this).map_err(|source| {
                VaultError::LedgerCallFailed {
                    token,
                    operation: "balance_of",
                    source: Box::new(source),
                }
            })?;
            if amount > available {
                return Err(VaultError::InsufficientBalance {
                    token,
                    available,
                    requested: amount,
                }
                .into());
            }

            let outcome = ledger::transfer(env, token, caller, amount);
            ledger_outcome(token, "transfer", outcome)?;

            debug!(vault = %this, %token, amount, "withdrawal");
            env.emit(Event::Withdrawn { token, amount });
            Ok(())
        })
    }

    /// Grants `approvals` to `target`, then calls it with `payload`.
    ///
    /// Approvals and the call are one unit: if the target fails, the
    /// allowances it was granted disappear with it.
    pub fn execute_strategy(
        &self,
        env: &mut Env<'_>,
        target: Address,
        payload: Vec<u8>,
        approvals: &[Approval],
    ) -> Result<(), ExecError> {
        guarded(env, |env| {
            let caller = env.caller();
            let this = env.this();
            let registry = {
                let vault = storage(env)?;
                vault.require_initialized()?;
                vault.administrative_owner
            };

            let manager = env
                .call(registry, Call::Registry(RegistryCall::Manager))?
                .into_maybe_address()?;
            if manager != Some(caller) {
                return Err(VaultError::NotManager { caller }.into());
            }
            storage(env)?.require_active()?;
            let target = non_null(target, "target")?;

            let permitted = env
                .call(
                    registry,
                    Call::Registry(RegistryCall::IsTargetPermitted { target }),
                )?
                .into_bool()?;
            if !permitted {
                return Err(VaultError::TargetNotPermitted(target).into());
            }

            for approval in approvals.iter().filter(|a| a.amount > 0) {
                let token = non_null(approval.token, "token")?;
                let outcome = ledger::approve(env, token, target, approval.amount);
                ledger_outcome(token, "approve", outcome)?;
                env.emit(Event::ApprovalSet {
                    token,
                    spender: target,
                    amount: approval.amount,
                });
            }

            // The target consumes the payload; the event records the same bytes.
            let recorded = payload.clone();
            env.call(target, Call::Raw(payload))
                .map_err(|source| VaultError::ExecutionFailed {
                    target,
                    source: Box::new(source),
                })?;

            info!(vault = %this, %target, approvals = approvals.len(), "strategy executed");
            env.emit(Event::StrategyExecuted {
                target,
                payload: recorded,
            });
            Ok(())
        })
    }

    pub fn pause(&self, env: &mut Env<'_>) -> Result<(), ExecError> {
        self.set_paused(env, true)
    }

    pub fn unpause(&self, env: &mut Env<'_>) -> Result<(), ExecError> {
        self.set_paused(env, false)
    }

    /// What `token` reports the vault holds.
    pub fn balance(&self, env: &mut Env<'_>, token: Address) -> Result<Amount, ExecError> {
        let token = non_null(token, "token")?;
        let this = env.this();
        ledger::balance_of(env, token, this)
    }

    fn check_owner_operation(&self, env: &Env<'_>, token: Address, amount: Amount) -> Result<(), ExecError> {
        let vault = storage(env)?;
        vault.require_initialized()?;
        let caller = env.caller();
        if caller != vault.asset_owner {
            return Err(VaultError::NotAssetOwner { caller }.into());
        }
        non_null(token, "token")?;
        if amount == 0 {
            return Err(VaultError::ZeroAmount.into());
        }
        vault.require_active()?;
        Ok(())
    }

    fn set_paused(&self, env: &mut Env<'_>, paused: bool) -> Result<(), ExecError> {
        let caller = env.caller();
        let vault = storage_mut(env)?;
        vault.require_initialized()?;
        if caller != vault.administrative_owner {
            return Err(VaultError::NotAdministrativeOwner { caller }.into());
        }
        vault.status = match (vault.status, paused) {
            (VaultStatus::Paused, true) => return Err(VaultError::Paused.into()),
            (VaultStatus::Active, false) => return Err(VaultError::NotPaused.into()),
            (_, true) => VaultStatus::Paused,
            (_, false) => VaultStatus::Active,
        };

        info!(vault = %env.this(), paused, "vault pause state changed");
        env.emit(if paused {
            Event::VaultPaused { by: caller }
        } else {
            Event::VaultUnpaused { by: caller }
        });
        Ok(())
    }
}

impl VaultLogic for StandardVault {
    fn version(&self) -> u32 {
        STANDARD_VAULT_LOGIC_VERSION
    }

    fn handle(&self, env: &mut Env<'_>, call: VaultCall) -> Result<Return, ExecError> {
        match call {
            VaultCall::Initialize {
                administrative_owner,
                asset_owner,
            } => self
                .initialize(env, administrative_owner, asset_owner)
                .map(|()| Return::Unit),
            VaultCall::Deposit { token, amount } => {
                self.deposit(env, token, amount).map(|()| Return::Unit)
            }
            VaultCall::Withdraw { token, amount } => {
                self.withdraw(env, token, amount).map(|()| Return::Unit)
            }
            VaultCall::ExecuteStrategy {
                target,
                payload,
                approvals,
            } => self
                .execute_strategy(env, target, payload, &approvals)
                .map(|()| Return::Unit),
            VaultCall::Pause => self.pause(env).map(|()| Return::Unit),
            VaultCall::Unpause => self.unpause(env).map(|()| Return::Unit),
            VaultCall::Balance { token } => self.balance(env, token).map(Return::Amount),
            VaultCall::AssetOwner => Ok(Return::Address(storage(env)?.asset_owner)),
            VaultCall::AdministrativeOwner => {
                Ok(Return::Address(storage(env)?.administrative_owner))
            }
            VaultCall::IsPaused => Ok(Return::Bool(storage(env)?.status == VaultStatus::Paused)),
            VaultCall::LogicVersion => Ok(Return::Version(self.version())),
        }
    }
}
