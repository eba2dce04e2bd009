//! # Custody Contracts
//!
//! The registry/vault system and the in-process runtime it runs on:
//!
//! - **Registry**: deterministic allocator and directory of vaults. Owns
//!   the shared-logic pointer, the manager identity and the administrator.
//! - **Vault**: per-owner asset container. Owner-gated deposit/withdraw,
//!   registry-gated pause, manager-gated generic execution with
//!   pre-authorized transfers.
//! - **Beacon**: the shared-logic indirection. Every vault call resolves
//!   its code through the registry's pointer at call time.
//! - **Ledger**: a reference fungible value ledger. Vaults only rely on
//!   its four-call surface, so any program can stand in for it.
//! - **Runtime**: the host. Accounts live here, and every call runs in a
//!   frame that can be rolled back.
//!
//! ## Design Principles
//!
//! 1. Every call is a frame. A failing frame restores the world exactly as
//!    it found it, events included. There is no partial success.
//! 2. Authority is read live. Vaults never cache the manager or the logic
//!    pointer; they ask the registry on every call.
//! 3. State transitions are explicit: enum variants, not boolean flags.
//! 4. All monetary arithmetic is checked.

pub mod beacon;
pub mod error;
pub mod ledger;
pub mod registry;
pub mod runtime;
pub mod vault;

pub use beacon::{vault_identity, SharedLogic, VaultLogic};
pub use error::ExecError;
pub use ledger::{LedgerCall, LedgerError, TokenLedger};
pub use registry::{RegistryCall, RegistryError, RegistryStorage};
pub use runtime::{Account, Call, Env, Program, Return, Runtime, WorldState};
pub use vault::{Approval, StandardVault, VaultCall, VaultError, VaultStatus, VaultStorage};
