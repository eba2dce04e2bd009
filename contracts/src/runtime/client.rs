//! Typed handles over [`Runtime::transact`] and [`Runtime::query`].
//!
//! ```ignore
//! let vault = rt.registry(registry).allocate_vault(admin, alice)?;
//! rt.vault(vault).deposit(alice, usdc, 1_000)?;
//! ```
//!
//! Mutating methods take the sending identity first. Queries run against a
//! scratch copy of the world and never change anything.

use custody_protocol::{Address, Amount};

use super::{Call, Return, Runtime};
use crate::error::ExecError;
use crate::ledger::LedgerCall;
use crate::registry::RegistryCall;
use crate::vault::{Approval, VaultCall, VaultStatus};

/// Handle on a registry.
pub struct RegistryClient<'r> {
    runtime: &'r mut Runtime,
    address: Address,
}

impl<'r> RegistryClient<'r> {
    pub(crate) fn new(runtime: &'r mut Runtime, address: Address) -> Self {
        Self { runtime, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn send(&mut self, caller: Address, call: RegistryCall) -> Result<Return, ExecError> {
        self.runtime
            .transact(caller, self.address, Call::Registry(call))
    }

    fn view(&self, call: RegistryCall) -> Result<Return, ExecError> {
        self.runtime.query(self.address, Call::Registry(call))
    }

    pub fn initialize(
        &mut self,
        caller: Address,
        administrator: Address,
        logic: Address,
    ) -> Result<(), ExecError> {
        self.send(
            caller,
            RegistryCall::Initialize {
                administrator,
                logic,
            },
        )
        .map(drop)
    }

    pub fn allocate_vault(&mut self, caller: Address, owner: Address) -> Result<Address, ExecError> {
        self.send(caller, RegistryCall::AllocateVault { owner })?
            .into_address()
    }

    pub fn set_manager(&mut self, caller: Address, manager: Address) -> Result<(), ExecError> {
        self.send(caller, RegistryCall::SetManager { manager })
            .map(drop)
    }

    pub fn upgrade_logic(&mut self, caller: Address, logic: Address) -> Result<(), ExecError> {
        self.send(caller, RegistryCall::UpgradeLogic { logic })
            .map(drop)
    }

    pub fn pause_vault(&mut self, caller: Address, vault: Address) -> Result<(), ExecError> {
        self.send(caller, RegistryCall::PauseVault { vault }).map(drop)
    }

    pub fn unpause_vault(&mut self, caller: Address, vault: Address) -> Result<(), ExecError> {
        self.send(caller, RegistryCall::UnpauseVault { vault })
            .map(drop)
    }

    pub fn pause(&mut self, caller: Address) -> Result<(), ExecError> {
        self.send(caller, RegistryCall::Pause).map(drop)
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), ExecError> {
        self.send(caller, RegistryCall::Unpause).map(drop)
    }

    pub fn transfer_administration(
        &mut self,
        caller: Address,
        administrator: Address,
    ) -> Result<(), ExecError> {
        self.send(caller, RegistryCall::TransferAdministration { administrator })
            .map(drop)
    }

    pub fn set_target_allowlist(&mut self, caller: Address, enabled: bool) -> Result<(), ExecError> {
        self.send(caller, RegistryCall::SetTargetAllowlist { enabled })
            .map(drop)
    }

    pub fn permit_target(&mut self, caller: Address, target: Address) -> Result<(), ExecError> {
        self.send(caller, RegistryCall::PermitTarget { target })
            .map(drop)
    }

    pub fn revoke_target(&mut self, caller: Address, target: Address) -> Result<(), ExecError> {
        self.send(caller, RegistryCall::RevokeTarget { target })
            .map(drop)
    }

    pub fn predict_vault_address(&self, owner: Address) -> Result<Address, ExecError> {
        self.view(RegistryCall::PredictVaultAddress { owner })?
            .into_address()
    }

    pub fn get_vault(&self, owner: Address) -> Result<Option<Address>, ExecError> {
        self.view(RegistryCall::GetVault { owner })?
            .into_maybe_address()
    }

    pub fn has_vault(&self, owner: Address) -> Result<bool, ExecError> {
        self.view(RegistryCall::HasVault { owner })?.into_bool()
    }

    pub fn is_vault(&self, vault: Address) -> Result<bool, ExecError> {
        self.view(RegistryCall::IsVault { vault })?.into_bool()
    }

    pub fn total_vaults(&self) -> Result<u64, ExecError> {
        self.view(RegistryCall::TotalVaults)?.into_count()
    }

    pub fn all_vaults(&self) -> Result<Vec<Address>, ExecError> {
        self.view(RegistryCall::AllVaults)?.into_addresses()
    }

    pub fn current_logic(&self) -> Result<Option<Address>, ExecError> {
        self.view(RegistryCall::CurrentLogic)?.into_maybe_address()
    }

    pub fn administrator(&self) -> Result<Address, ExecError> {
        self.view(RegistryCall::Administrator)?.into_address()
    }

    pub fn manager(&self) -> Result<Option<Address>, ExecError> {
        self.view(RegistryCall::Manager)?.into_maybe_address()
    }

    pub fn is_paused(&self) -> Result<bool, ExecError> {
        self.view(RegistryCall::IsPaused)?.into_bool()
    }

    pub fn is_target_permitted(&self, target: Address) -> Result<bool, ExecError> {
        self.view(RegistryCall::IsTargetPermitted { target })?
            .into_bool()
    }
}

/// Handle on a vault.
pub struct VaultClient<'r> {
    runtime: &'r mut Runtime,
    address: Address,
}

impl<'r> VaultClient<'r> {
    pub(crate) fn new(runtime: &'r mut Runtime, address: Address) -> Self {
        Self { runtime, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn send(&mut self, caller: Address, call: VaultCall) -> Result<Return, ExecError> {
        self.runtime.transact(caller, self.address, Call::Vault(call))
    }

    fn view(&self, call: VaultCall) -> Result<Return, ExecError> {
        self.runtime.query(self.address, Call::Vault(call))
    }

    pub fn initialize(
        &mut self,
        caller: Address,
        administrative_owner: Address,
        asset_owner: Address,
    ) -> Result<(), ExecError> {
        self.send(
            caller,
            VaultCall::Initialize {
                administrative_owner,
                asset_owner,
            },
        )
        .map(drop)
    }

    pub fn deposit(&mut self, caller: Address, token: Address, amount: Amount) -> Result<(), ExecError> {
        self.send(caller, VaultCall::Deposit { token, amount })
            .map(drop)
    }

    pub fn withdraw(&mut self, caller: Address, token: Address, amount: Amount) -> Result<(), ExecError> {
        self.send(caller, VaultCall::Withdraw { token, amount })
            .map(drop)
    }

    pub fn execute_strategy(
        &mut self,
        caller: Address,
        target: Address,
        payload: Vec<u8>,
        approvals: Vec<Approval>,
    ) -> Result<(), ExecError> {
        self.send(
            caller,
            VaultCall::ExecuteStrategy {
                target,
                payload,
                approvals,
            },
        )
        .map(drop)
    }

    pub fn pause(&mut self, caller: Address) -> Result<(), ExecError> {
        self.send(caller, VaultCall::Pause).map(drop)
    }

    pub fn unpause(&mut self, caller: Address) -> Result<(), ExecError> {
        self.send(caller, VaultCall::Unpause).map(drop)
    }

    pub fn balance(&self, token: Address) -> Result<Amount, ExecError> {
        self.view(VaultCall::Balance { token })?.into_amount()
    }

    pub fn asset_owner(&self) -> Result<Address, ExecError> {
        self.view(VaultCall::AssetOwner)?.into_address()
    }

    pub fn administrative_owner(&self) -> Result<Address, ExecError> {
        self.view(VaultCall::AdministrativeOwner)?.into_address()
    }

    pub fn is_paused(&self) -> Result<bool, ExecError> {
        self.view(VaultCall::IsPaused)?.into_bool()
    }

    pub fn logic_version(&self) -> Result<u32, ExecError> {
        self.view(VaultCall::LogicVersion)?.into_version()
    }

    /// Storage-level status, read directly without going through the logic.
    pub fn status(&self) -> Option<VaultStatus> {
        self.runtime
            .world()
            .vault(&self.address)
            .map(|v| v.status())
    }
}

/// Handle on a ledger.
pub struct LedgerClient<'r> {
    runtime: &'r mut Runtime,
    address: Address,
}

impl<'r> LedgerClient<'r> {
    pub(crate) fn new(runtime: &'r mut Runtime, address: Address) -> Self {
        Self { runtime, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn send(&mut self, caller: Address, call: LedgerCall) -> Result<Return, ExecError> {
        self.runtime
            .transact(caller, self.address, Call::Ledger(call))
    }

    fn view(&self, call: LedgerCall) -> Result<Return, ExecError> {
        self.runtime.query(self.address, Call::Ledger(call))
    }

    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), ExecError> {
        self.send(caller, LedgerCall::Mint { to, amount }).map(drop)
    }

    pub fn transfer(&mut self, caller: Address, to: Address, amount: Amount) -> Result<bool, ExecError> {
        self.send(caller, LedgerCall::Transfer { to, amount })?
            .into_bool()
    }

    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<bool, ExecError> {
        self.send(caller, LedgerCall::TransferFrom { from, to, amount })?
            .into_bool()
    }

    pub fn approve(&mut self, caller: Address, spender: Address, amount: Amount) -> Result<bool, ExecError> {
        self.send(caller, LedgerCall::Approve { spender, amount })?
            .into_bool()
    }

    pub fn balance_of(&self, holder: Address) -> Result<Amount, ExecError> {
        self.view(LedgerCall::BalanceOf { holder })?.into_amount()
    }

    pub fn allowance(&self, owner: Address, spender: Address) -> Result<Amount, ExecError> {
        self.view(LedgerCall::Allowance { owner, spender })?
            .into_amount()
    }

    pub fn total_supply(&self) -> Result<Amount, ExecError> {
        self.view(LedgerCall::TotalSupply)?.into_amount()
    }
}
