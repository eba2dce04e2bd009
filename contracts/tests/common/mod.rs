//! Shared fixture and stand-in programs for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use custody_contracts::{
    Call, Env, ExecError, LedgerCall, Program, Return, Runtime, StandardVault, VaultCall, VaultLogic,
};
use custody_protocol::{Address, Amount, Event};

/// A runtime with one initialized registry and one funded ledger.
pub struct World {
    pub rt: Runtime,
    pub admin: Address,
    pub manager: Address,
    pub alice: Address,
    pub bob: Address,
    pub registry: Address,
    pub logic: Address,
    pub usdc: Address,
}

pub const ALICE_FUNDS: Amount = 1_000_000;

pub fn setup() -> World {
    let mut rt = Runtime::new();
    let admin = Address::from_label("admin");
    let manager = Address::from_label("manager");
    let alice = Address::from_label("alice");
    let bob = Address::from_label("bob");

    let logic = rt.deploy_logic(admin, Arc::new(StandardVault)).unwrap();
    let registry = rt.deploy_registry(admin).unwrap();
    rt.registry(registry).initialize(admin, admin, logic).unwrap();

    let usdc = rt.deploy_ledger(admin, "USD Coin", "USDC", 6).unwrap();
    rt.ledger(usdc).mint(admin, alice, ALICE_FUNDS).unwrap();

    World {
        rt,
        admin,
        manager,
        alice,
        bob,
        registry,
        logic,
        usdc,
    }
}

impl World {
    /// Allocates a vault for `owner` and lets it pull all of `owner`'s USDC.
    pub fn vault_for(&mut self, owner: Address) -> Address {
        let vault = self
            .rt
            .registry(self.registry)
            .allocate_vault(self.admin, owner)
            .unwrap();
        self.rt.ledger(self.usdc).approve(owner, vault, u64::MAX).unwrap();
        vault
    }

    /// Alice's vault holding `amount` USDC, with the manager installed.
    pub fn funded_vault(&mut self, amount: Amount) -> Address {
        let vault = self.vault_for(self.alice);
        self.rt.vault(vault).deposit(self.alice, self.usdc, amount).unwrap();
        self.rt
            .registry(self.registry)
            .set_manager(self.admin, self.manager)
            .unwrap();
        vault
    }

    pub fn usdc_balance(&mut self, holder: Address) -> Amount {
        self.rt.ledger(self.usdc).balance_of(holder).unwrap()
    }

    pub fn deploy(&mut self, program: impl Program + 'static) -> Address {
        self.rt.deploy_program(self.admin, Arc::new(program)).unwrap()
    }

    pub fn events_named(&self, name: &str) -> Vec<Event> {
        self.rt
            .logs()
            .iter()
            .filter(|entry| entry.event.name() == name)
            .map(|entry| entry.event.clone())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Strategy targets
// ---------------------------------------------------------------------------

/// Refuses everything.
pub struct AlwaysRevert;

impl Program for AlwaysRevert {
    fn name(&self) -> &str {
        "always-revert"
    }

    fn handle(&self, _env: &mut Env<'_>, _call: Call) -> Result<Return, ExecError> {
        Err(ExecError::Reverted("strategy refused".into()))
    }
}

/// Pulls `(token, amount)` from whoever called it, using the allowance the
/// caller granted. Payload is the `bincode` encoding of that pair.
pub struct PullApproved;

impl PullApproved {
    pub fn payload(token: Address, amount: Amount) -> Vec<u8> {
        bincode::serialize(&(token, amount)).unwrap()
    }
}

impl Program for PullApproved {
    fn name(&self) -> &str {
        "pull-approved"
    }

    fn handle(&self, env: &mut Env<'_>, call: Call) -> Result<Return, ExecError> {
        let Call::Raw(bytes) = call else {
            return Err(ExecError::Reverted("expected raw payload".into()));
        };
        let (token, amount): (Address, Amount) = bincode::deserialize(&bytes)
            .map_err(|e| ExecError::MalformedPayload(e.to_string()))?;
        let from = env.caller();
        let to = env.this();
        env.call(
            token,
            Call::Ledger(LedgerCall::TransferFrom { from, to, amount }),
        )?;
        Ok(Return::Unit)
    }
}

/// Calls back into `vault` with `call` whenever it is invoked.
pub struct Reenter {
    pub vault: Address,
    pub call: VaultCall,
}

impl Program for Reenter {
    fn name(&self) -> &str {
        "reenter"
    }

    fn handle(&self, env: &mut Env<'_>, _call: Call) -> Result<Return, ExecError> {
        env.call(self.vault, Call::Vault(self.call.clone()))
    }
}

/// A ledger that answers every mutation with `false`.
pub struct RefusingLedger;

impl Program for RefusingLedger {
    fn name(&self) -> &str {
        "refusing-ledger"
    }

    fn handle(&self, _env: &mut Env<'_>, call: Call) -> Result<Return, ExecError> {
        match call {
            Call::Ledger(LedgerCall::BalanceOf { .. }) => Ok(Return::Amount(u64::MAX)),
            Call::Ledger(_) => Ok(Return::Bool(false)),
            other => Err(ExecError::Reverted(format!("not a ledger call: {}", other.kind()))),
        }
    }
}

// ---------------------------------------------------------------------------
// Logic versions
// ---------------------------------------------------------------------------

/// Second logic version: identical behavior, new version number, and
/// withdrawals of more than `limit` per call are refused.
pub struct LimitedVault {
    pub limit: Amount,
}

impl VaultLogic for LimitedVault {
    fn version(&self) -> u32 {
        2
    }

    fn handle(&self, env: &mut Env<'_>, call: VaultCall) -> Result<Return, ExecError> {
        match call {
            VaultCall::Withdraw { amount, .. } if amount > self.limit => Err(ExecError::Reverted(
                format!("withdrawal of {amount} exceeds per-call limit {}", self.limit),
            )),
            VaultCall::LogicVersion => Ok(Return::Version(self.version())),
            other => StandardVault.handle(env, other),
        }
    }
}
