//! Runtime-level errors.
//!
//! Each contract has its own error enum ([`RegistryError`], [`VaultError`],
//! [`LedgerError`]). [`ExecError`] is what crosses a call boundary: it wraps
//! those and adds the failures only the host can produce.

use custody_protocol::identity::DerivationError;
use custody_protocol::Address;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::registry::RegistryError;
use crate::vault::VaultError;

/// Why a call frame failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Nothing is deployed at the target identity.
    #[error("no account at {0}")]
    UnknownAccount(Address),

    /// The target exists but does not understand this kind of call.
    #[error("account {target} does not accept {call} calls")]
    UnsupportedCall {
        target: Address,
        call: &'static str,
    },

    /// Too many nested frames.
    #[error("call depth limit of {0} exceeded")]
    CallDepthExceeded(usize),

    /// A deployment or allocation landed on an identity already in use.
    #[error("address {0} is already occupied")]
    AddressCollision(Address),

    /// A callee answered with the wrong shape of value.
    #[error("unexpected return value: expected {expected}, got {got}")]
    UnexpectedReturn {
        expected: &'static str,
        got: &'static str,
    },

    /// A raw payload sent to a built-in contract did not decode.
    #[error("malformed call payload: {0}")]
    MalformedPayload(String),

    /// Top-level transactions need a non-null sender.
    #[error("transactions must be sent by a non-null identity")]
    AnonymousCaller,

    /// Contracts act only from inside a frame, never as a transaction sender.
    #[error("transactions cannot be sent as contract account {0}")]
    ContractCaller(Address),

    #[error("identity derivation failed: {0}")]
    Derivation(#[from] DerivationError),

    /// An opaque program refused the call.
    #[error("call reverted: {0}")]
    Reverted(String),
}
