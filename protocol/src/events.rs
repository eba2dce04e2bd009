//! # Events
//!
//! Contracts report what happened through an append-only, ordered event
//! log. Indexers (and the CLI) read it; nothing inside the protocol does.
//!
//! Events belong to the call frame that emitted them. When a frame fails,
//! its events are discarded together with the rest of its state changes, so
//! the log never describes something that did not happen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount};

/// Everything a registry, vault or ledger can announce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    // -- registry ----------------------------------------------------------
    RegistryInitialized {
        administrator: Address,
        logic: Address,
    },
    VaultAllocated {
        owner: Address,
        vault: Address,
        index: u64,
    },
    LogicUpgraded {
        previous: Address,
        current: Address,
    },
    ManagerChanged {
        previous: Option<Address>,
        current: Address,
    },
    AdministrationTransferred {
        previous: Address,
        current: Address,
    },
    RegistryPaused {
        by: Address,
    },
    RegistryUnpaused {
        by: Address,
    },
    TargetAllowlistToggled {
        enabled: bool,
    },
    TargetPermitted {
        target: Address,
    },
    TargetRevoked {
        target: Address,
    },

    // -- vault -------------------------------------------------------------
    VaultInitialized {
        administrative_owner: Address,
        asset_owner: Address,
    },
    VaultPaused {
        by: Address,
    },
    VaultUnpaused {
        by: Address,
    },
    Deposited {
        token: Address,
        amount: Amount,
    },
    Withdrawn {
        token: Address,
        amount: Amount,
    },
    ApprovalSet {
        token: Address,
        spender: Address,
        amount: Amount,
    },
    StrategyExecuted {
        target: Address,
        #[serde(with = "crate::encoding::hex_bytes")]
        payload: Vec<u8>,
    },

    // -- value ledger ------------------------------------------------------
    Transfer {
        from: Address,
        to: Address,
        amount: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        amount: Amount,
    },
}

impl Event {
    /// Short snake_case name, used for log lines and metrics labels.
    pub fn name(&self) -> &'static str {
        match self {
            Event::RegistryInitialized { .. } => "registry_initialized",
            Event::VaultAllocated { .. } => "vault_allocated",
            Event::LogicUpgraded { .. } => "logic_upgraded",
            Event::ManagerChanged { .. } => "manager_changed",
            Event::AdministrationTransferred { .. } => "administration_transferred",
            Event::RegistryPaused { .. } => "registry_paused",
            Event::RegistryUnpaused { .. } => "registry_unpaused",
            Event::TargetAllowlistToggled { .. } => "target_allowlist_toggled",
            Event::TargetPermitted { .. } => "target_permitted",
            Event::TargetRevoked { .. } => "target_revoked",
            Event::VaultInitialized { .. } => "vault_initialized",
            Event::VaultPaused { .. } => "vault_paused",
            Event::VaultUnpaused { .. } => "vault_unpaused",
            Event::Deposited { .. } => "deposited",
            Event::Withdrawn { .. } => "withdrawn",
            Event::ApprovalSet { .. } => "approval_set",
            Event::StrategyExecuted { .. } => "strategy_executed",
            Event::Transfer { .. } => "transfer",
            Event::Approval { .. } => "approval",
        }
    }
}

/// One entry of the event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the log, starting at 0. Dense: no gaps, even after
    /// failed calls, because failed calls never keep their entries.
    pub sequence: u64,
    /// The contract that emitted the event.
    pub emitter: Address,
    /// What happened.
    #[serde(flatten)]
    pub event: Event,
    /// Wall-clock time of emission.
    pub recorded_at: DateTime<Utc>,
}
