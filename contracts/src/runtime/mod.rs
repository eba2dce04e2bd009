//! # Runtime
//!
//! The in-process host the contracts run on. It plays the part a chain
//! plays for on-chain code:
//!
//! ```text
//! call.rs     Call / Return values
//! state.rs    account table, nonces, event log
//! client.rs   typed handles over transact/query
//! ```
//!
//! ## Call framing
//!
//! Every call, top-level or nested, is a frame:
//!
//! 1. the world is snapshotted,
//! 2. the target's code runs with an [`Env`] naming caller and callee,
//! 3. on failure the snapshot is put back.
//!
//! A callee that fails therefore leaves nothing behind, and a caller that
//! propagates the failure leaves nothing behind either. That is the whole
//! atomicity story: there is no separate undo path anywhere in the
//! contracts.
//!
//! Execution is serialized by `&mut Runtime`. Re-entrancy is still
//! possible (a callee may call back into its caller) and is the callee
//! contracts' business to reject.

pub mod call;
pub mod client;
pub mod state;

use std::sync::Arc;

use custody_protocol::config::MAX_CALL_DEPTH;
use custody_protocol::{Address, Event, LogEntry};
use tracing::{debug, info, warn};

pub use call::{Call, Return};
pub use client::{LedgerClient, RegistryClient, VaultClient};
pub use state::{Account, WorldState};

use crate::beacon::{self, VaultLogic};
use crate::error::ExecError;
use crate::ledger::{self, TokenLedger};
use crate::registry::{self, RegistryStorage};

/// Opaque external code: strategy targets, adapters, stand-in ledgers.
///
/// A program sees every call verbatim, including [`Call::Raw`] payloads,
/// and may call any other account through the [`Env`].
pub trait Program: Send + Sync {
    /// Name used in logs and debug output.
    fn name(&self) -> &str;

    fn handle(&self, env: &mut Env<'_>, call: Call) -> Result<Return, ExecError>;
}

/// Execution context of one frame.
pub struct Env<'w> {
    world: &'w mut WorldState,
    caller: Address,
    this: Address,
    depth: usize,
}

impl<'w> Env<'w> {
    /// Who sent this call.
    pub fn caller(&self) -> Address {
        self.caller
    }

    /// The account whose code is running.
    pub fn this(&self) -> Address {
        self.this
    }

    /// Nesting depth; the top-level transaction is 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn world(&self) -> &WorldState {
        &*self.world
    }

    pub(crate) fn world_mut(&mut self) -> &mut WorldState {
        &mut *self.world
    }

    /// Appends an event attributed to the running account.
    pub fn emit(&mut self, event: Event) {
        let this = self.this;
        self.world.emit(this, event);
    }

    /// Calls another account as `this`, in a new frame.
    pub fn call(&mut self, target: Address, call: Call) -> Result<Return, ExecError> {
        dispatch(&mut *self.world, self.this, target, call, self.depth + 1)
    }
}

/// Resolved code for a call target.
enum Handler {
    Registry,
    Vault(Arc<dyn VaultLogic>),
    Ledger,
    Program(Arc<dyn Program>),
    Inert,
}

impl Handler {
    fn resolve(world: &WorldState, target: &Address) -> Result<Self, ExecError> {
        match world.account(target) {
            None => Err(ExecError::UnknownAccount(*target)),
            Some(Account::Registry(_)) => Ok(Handler::Registry),
            Some(Account::Vault(_)) => Ok(Handler::Vault(beacon::resolve_logic(world, target)?)),
            Some(Account::Ledger(_)) => Ok(Handler::Ledger),
            Some(Account::Program(p)) => Ok(Handler::Program(Arc::clone(p))),
            Some(Account::Logic(_)) => Ok(Handler::Inert),
        }
    }
}

/// Runs one frame, restoring the world if it fails.
pub(crate) fn dispatch(
    world: &mut WorldState,
    caller: Address,
    target: Address,
    call: Call,
    depth: usize,
) -> Result<Return, ExecError> {
    if depth > MAX_CALL_DEPTH {
        return Err(ExecError::CallDepthExceeded(MAX_CALL_DEPTH));
    }

    let snapshot = world.clone();
    let result = execute(world, caller, target, call, depth);
    if let Err(error) = &result {
        debug!(%caller, %target, depth, %error, "frame reverted");
        *world = snapshot;
    }
    result
}

fn execute(
    world: &mut WorldState,
    caller: Address,
    target: Address,
    call: Call,
    depth: usize,
) -> Result<Return, ExecError> {
    let handler = Handler::resolve(world, &target)?;

    let call = match (&handler, call) {
        (Handler::Program(_) | Handler::Inert, call) => call,
        (_, Call::Raw(bytes)) => Call::decode(&bytes)?,
        (_, call) => call,
    };

    let mut env = Env {
        world,
        caller,
        this: target,
        depth,
    };

    match (handler, call) {
        (Handler::Registry, Call::Registry(c)) => registry::handle(&mut env, c),
        (Handler::Vault(logic), Call::Vault(c)) => logic.handle(&mut env, c),
        (Handler::Ledger, Call::Ledger(c)) => ledger::handle(&mut env, c),
        (Handler::Program(program), call) => program.handle(&mut env, call),
        (_, call) => Err(ExecError::UnsupportedCall {
            target,
            call: call.kind(),
        }),
    }
}

/// The host.
#[derive(Debug, Clone, Default)]
pub struct Runtime {
    world: WorldState,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn world(&self) -> &WorldState {
        &self.world
    }

    pub fn logs(&self) -> &[LogEntry] {
        self.world.logs()
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut WorldState {
        &mut self.world
    }

    /// Runs a top-level call from `caller`. Either everything it did is
    /// kept, or nothing is.
    pub fn transact(
        &mut self,
        caller: Address,
        target: Address,
        call: Call,
    ) -> Result<Return, ExecError> {
        if caller.is_zero() {
            return Err(ExecError::AnonymousCaller);
        }
        if self.world.contains(&caller) {
            return Err(ExecError::ContractCaller(caller));
        }
        let kind = call.kind();
        let result = dispatch(&mut self.world, caller, target, call, 0);
        match &result {
            Ok(_) => debug!(%caller, %target, call = kind, "transaction committed"),
            Err(error) => warn!(%caller, %target, call = kind, %error, "transaction reverted"),
        }
        result
    }

    /// Runs a call against a throwaway copy of the world.
    pub fn query(&self, target: Address, call: Call) -> Result<Return, ExecError> {
        let mut scratch = self.world.clone();
        dispatch(&mut scratch, Address::ZERO, target, call, 0)
    }

    /// Deploys an uninitialized registry.
    pub fn deploy_registry(&mut self, deployer: Address) -> Result<Address, ExecError> {
        let address = self
            .world
            .deploy(deployer, Account::Registry(RegistryStorage::default()))?;
        info!(%deployer, registry = %address, "registry deployed");
        Ok(address)
    }

    /// Deploys a vault logic body.
    pub fn deploy_logic(
        &mut self,
        deployer: Address,
        logic: Arc<dyn VaultLogic>,
    ) -> Result<Address, ExecError> {
        let version = logic.version();
        let address = self.world.deploy(deployer, Account::Logic(logic))?;
        info!(%deployer, logic = %address, version, "vault logic deployed");
        Ok(address)
    }

    /// Deploys a reference ledger. The deployer becomes its minter.
    pub fn deploy_ledger(
        &mut self,
        deployer: Address,
        name: &str,
        symbol: &str,
        decimals: u8,
    ) -> Result<Address, ExecError> {
        let ledger = TokenLedger::new(name, symbol, decimals, deployer);
        let address = self.world.deploy(deployer, Account::Ledger(ledger))?;
        info!(%deployer, ledger = %address, symbol, "ledger deployed");
        Ok(address)
    }

    /// Deploys opaque program code.
    pub fn deploy_program(
        &mut self,
        deployer: Address,
        program: Arc<dyn Program>,
    ) -> Result<Address, ExecError> {
        let name = program.name().to_string();
        let address = self.world.deploy(deployer, Account::Program(program))?;
        info!(%deployer, program = %address, name, "program deployed");
        Ok(address)
    }

    pub fn registry(&mut self, address: Address) -> RegistryClient<'_> {
        RegistryClient::new(self, address)
    }

    pub fn vault(&mut self, address: Address) -> VaultClient<'_> {
        VaultClient::new(self, address)
    }

    pub fn ledger(&mut self, address: Address) -> LedgerClient<'_> {
        LedgerClient::new(self, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::LedgerCall;

    struct Echo;

    impl Program for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn handle(&self, _env: &mut Env<'_>, call: Call) -> Result<Return, ExecError> {
            match call {
                Call::Raw(bytes) => Ok(Return::Bytes(bytes)),
                other => Err(ExecError::Reverted(format!("echo got {}", other.kind()))),
            }
        }
    }

    /// Calls itself until the depth limit stops it.
    struct Recursor;

    impl Program for Recursor {
        fn name(&self) -> &str {
            "recursor"
        }

        fn handle(&self, env: &mut Env<'_>, call: Call) -> Result<Return, ExecError> {
            let this = env.this();
            env.call(this, call)
        }
    }

    /// Moves its own funds, then fails, so the transfer must disappear.
    struct TransferThenFail {
        ledger: Address,
        to: Address,
    }

    impl Program for TransferThenFail {
        fn name(&self) -> &str {
            "transfer-then-fail"
        }

        fn handle(&self, env: &mut Env<'_>, _call: Call) -> Result<Return, ExecError> {
            env.call(
                self.ledger,
                Call::Ledger(LedgerCall::Transfer {
                    to: self.to,
                    amount: 400,
                }),
            )?;
            Err(ExecError::Reverted("changed my mind".into()))
        }
    }

    #[test]
    fn programs_receive_raw_payloads_verbatim() {
        let mut rt = Runtime::new();
        let admin = Address::from_label("admin");
        let echo = rt.deploy_program(admin, Arc::new(Echo)).unwrap();
        let out = rt
            .transact(admin, echo, Call::Raw(vec![1, 2, 3]))
            .unwrap();
        assert_eq!(out, Return::Bytes(vec![1, 2, 3]));
    }

    #[test]
    fn unknown_target_is_reported() {
        let mut rt = Runtime::new();
        let admin = Address::from_label("admin");
        let nowhere = Address::from_label("nowhere");
        assert_eq!(
            rt.transact(admin, nowhere, Call::Raw(vec![])),
            Err(ExecError::UnknownAccount(nowhere))
        );
    }

    #[test]
    fn anonymous_transactions_are_rejected() {
        let mut rt = Runtime::new();
        let echo = rt
            .deploy_program(Address::from_label("admin"), Arc::new(Echo))
            .unwrap();
        assert_eq!(
            rt.transact(Address::ZERO, echo, Call::Raw(vec![])),
            Err(ExecError::AnonymousCaller)
        );
    }

    #[test]
    fn contract_accounts_cannot_send_transactions() {
        let mut rt = Runtime::new();
        let admin = Address::from_label("admin");
        let mallory = Address::from_label("mallory");
        let registry = rt.deploy_registry(admin).unwrap();
        let token = rt.deploy_ledger(admin, "Test", "TST", 6).unwrap();
        let holder = rt.deploy_program(admin, Arc::new(Echo)).unwrap();
        rt.ledger(token).mint(admin, holder, 5_000).unwrap();

        let logs_before = rt.logs().len();
        let stolen = rt.transact(
            holder,
            token,
            Call::Ledger(LedgerCall::Transfer {
                to: mallory,
                amount: 5_000,
            }),
        );
        assert_eq!(stolen, Err(ExecError::ContractCaller(holder)));
        assert_eq!(
            rt.transact(registry, token, Call::Ledger(LedgerCall::TotalSupply)),
            Err(ExecError::ContractCaller(registry))
        );
        assert_eq!(rt.ledger(token).balance_of(holder).unwrap(), 5_000);
        assert_eq!(rt.ledger(token).balance_of(mallory).unwrap(), 0);
        assert_eq!(rt.logs().len(), logs_before);
    }

    #[test]
    fn runaway_recursion_hits_depth_limit() {
        let mut rt = Runtime::new();
        let admin = Address::from_label("admin");
        let rec = rt.deploy_program(admin, Arc::new(Recursor)).unwrap();
        assert_eq!(
            rt.transact(admin, rec, Call::Raw(vec![])),
            Err(ExecError::CallDepthExceeded(MAX_CALL_DEPTH))
        );
    }

    #[test]
    fn failed_frame_discards_nested_effects_and_events() {
        let mut rt = Runtime::new();
        let admin = Address::from_label("admin");
        let bob = Address::from_label("bob");
        let token = rt.deploy_ledger(admin, "Test", "TST", 6).unwrap();
        let program = rt
            .deploy_program(admin, Arc::new(TransferThenFail { ledger: token, to: bob }))
            .unwrap();
        rt.ledger(token).mint(admin, program, 1_000).unwrap();

        let logs_before = rt.logs().len();
        let result = rt.transact(admin, program, Call::Raw(vec![]));
        assert_eq!(result, Err(ExecError::Reverted("changed my mind".into())));
        assert_eq!(rt.ledger(token).balance_of(program).unwrap(), 1_000);
        assert_eq!(rt.ledger(token).balance_of(bob).unwrap(), 0);
        assert_eq!(rt.logs().len(), logs_before);
    }

    #[test]
    fn raw_bytes_to_builtin_are_decoded() {
        let mut rt = Runtime::new();
        let admin = Address::from_label("admin");
        let bob = Address::from_label("bob");
        let token = rt.deploy_ledger(admin, "Test", "TST", 6).unwrap();
        let payload = Call::Ledger(LedgerCall::Mint { to: bob, amount: 42 })
            .encode()
            .unwrap();
        rt.transact(admin, token, Call::Raw(payload)).unwrap();
        assert_eq!(rt.ledger(token).balance_of(bob).unwrap(), 42);
    }

    #[test]
    fn logic_bodies_are_not_callable() {
        let mut rt = Runtime::new();
        let admin = Address::from_label("admin");
        let logic = rt
            .deploy_logic(admin, Arc::new(crate::vault::StandardVault))
            .unwrap();
        assert_eq!(
            rt.transact(admin, logic, Call::Raw(vec![])),
            Err(ExecError::UnsupportedCall {
                target: logic,
                call: "raw"
            })
        );
    }
}
