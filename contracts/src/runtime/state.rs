//! # World State
//!
//! The account table, per-deployer nonces and the event log. The whole
//! thing is `Clone`: call framing snapshots it on entry and puts the
//! snapshot back if the frame fails. Code bodies (`Logic`, `Program`) are
//! shared behind `Arc`, so a snapshot copies storage, not code.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use custody_protocol::identity::contract_address;
use custody_protocol::{Address, Event, LogEntry};

use super::Program;
use crate::beacon::VaultLogic;
use crate::error::ExecError;
use crate::ledger::TokenLedger;
use crate::registry::RegistryStorage;
use crate::vault::VaultStorage;

/// Something that lives at an address.
#[derive(Clone)]
pub enum Account {
    Registry(RegistryStorage),
    /// Vault instance storage. Its code is resolved through its beacon.
    Vault(VaultStorage),
    /// An immutable vault logic body.
    Logic(Arc<dyn VaultLogic>),
    Ledger(TokenLedger),
    /// Opaque external code.
    Program(Arc<dyn Program>),
}

impl Account {
    pub fn kind(&self) -> &'static str {
        match self {
            Account::Registry(_) => "registry",
            Account::Vault(_) => "vault",
            Account::Logic(_) => "logic",
            Account::Ledger(_) => "ledger",
            Account::Program(_) => "program",
        }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Account::Registry(r) => f.debug_tuple("Registry").field(r).finish(),
            Account::Vault(v) => f.debug_tuple("Vault").field(v).finish(),
            Account::Logic(l) => f
                .debug_struct("Logic")
                .field("version", &l.version())
                .finish(),
            Account::Ledger(l) => f.debug_tuple("Ledger").field(l).finish(),
            Account::Program(p) => f.debug_struct("Program").field("name", &p.name()).finish(),
        }
    }
}

/// Everything the runtime knows.
#[derive(Debug, Clone, Default)]
pub struct WorldState {
    accounts: BTreeMap<Address, Account>,
    nonces: BTreeMap<Address, u64>,
    logs: Vec<LogEntry>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    /// Number of deployments `deployer` has made so far.
    pub fn nonce(&self, deployer: &Address) -> u64 {
        self.nonces.get(deployer).copied().unwrap_or(0)
    }

    /// Places an account at a caller-chosen identity.
    pub(crate) fn create(&mut self, address: Address, account: Account) -> Result<(), ExecError> {
        if address.is_zero() || self.accounts.contains_key(&address) {
            return Err(ExecError::AddressCollision(address));
        }
        self.accounts.insert(address, account);
        Ok(())
    }

    /// Places an account at the next nonce-derived identity of `deployer`.
    pub(crate) fn deploy(
        &mut self,
        deployer: Address,
        account: Account,
    ) -> Result<Address, ExecError> {
        let nonce = self.nonce(&deployer);
        let address = contract_address(&deployer, nonce);
        self.create(address, account)?;
        self.nonces.insert(deployer, nonce + 1);
        Ok(address)
    }

    pub fn registry(&self, address: &Address) -> Option<&RegistryStorage> {
        match self.accounts.get(address) {
            Some(Account::Registry(r)) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn registry_mut(&mut self, address: &Address) -> Option<&mut RegistryStorage> {
        match self.accounts.get_mut(address) {
            Some(Account::Registry(r)) => Some(r),
            _ => None,
        }
    }

    pub fn vault(&self, address: &Address) -> Option<&VaultStorage> {
        match self.accounts.get(address) {
            Some(Account::Vault(v)) => Some(v),
            _ => None,
        }
    }

    pub(crate) fn vault_mut(&mut self, address: &Address) -> Option<&mut VaultStorage> {
        match self.accounts.get_mut(address) {
            Some(Account::Vault(v)) => Some(v),
            _ => None,
        }
    }

    pub fn ledger(&self, address: &Address) -> Option<&TokenLedger> {
        match self.accounts.get(address) {
            Some(Account::Ledger(l)) => Some(l),
            _ => None,
        }
    }

    pub(crate) fn ledger_mut(&mut self, address: &Address) -> Option<&mut TokenLedger> {
        match self.accounts.get_mut(address) {
            Some(Account::Ledger(l)) => Some(l),
            _ => None,
        }
    }

    pub fn logic(&self, address: &Address) -> Option<Arc<dyn VaultLogic>> {
        match self.accounts.get(address) {
            Some(Account::Logic(l)) => Some(Arc::clone(l)),
            _ => None,
        }
    }

    pub(crate) fn emit(&mut self, emitter: Address, event: Event) {
        tracing::debug!(%emitter, event = event.name(), "event emitted");
        self.logs.push(LogEntry {
            sequence: self.logs.len() as u64,
            emitter,
            event,
            recorded_at: Utc::now(),
        });
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }
}
