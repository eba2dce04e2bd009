//! Call and return values.
//!
//! A [`Call`] is everything one account can ask of another. Built-in
//! contracts understand their own typed variant, and also accept
//! [`Call::Raw`] bytes, which they decode as a `bincode`-encoded `Call`.
//! Opaque programs receive whatever was sent, unmodified.

use custody_protocol::encoding::hex_bytes;
use custody_protocol::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::error::ExecError;
use crate::ledger::LedgerCall;
use crate::registry::RegistryCall;
use crate::vault::VaultCall;

/// A message sent to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Call {
    Registry(RegistryCall),
    Vault(VaultCall),
    Ledger(LedgerCall),
    /// Opaque bytes, forwarded verbatim.
    Raw(#[serde(with = "hex_bytes")] Vec<u8>),
}

impl Call {
    /// Encodes the call so it can travel as a raw payload.
    pub fn encode(&self) -> Result<Vec<u8>, ExecError> {
        bincode::serialize(self).map_err(|e| ExecError::MalformedPayload(e.to_string()))
    }

    /// Decodes a raw payload produced by [`Call::encode`].
    pub fn decode(bytes: &[u8]) -> Result<Self, ExecError> {
        bincode::deserialize(bytes).map_err(|e| ExecError::MalformedPayload(e.to_string()))
    }

    /// Short name of the call family, for errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Call::Registry(_) => "registry",
            Call::Vault(_) => "vault",
            Call::Ledger(_) => "ledger",
            Call::Raw(_) => "raw",
        }
    }
}

/// What a call answers with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Return {
    Unit,
    Bool(bool),
    Amount(Amount),
    Count(u64),
    Version(u32),
    Address(Address),
    MaybeAddress(Option<Address>),
    Addresses(Vec<Address>),
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
}

macro_rules! expect_variant {
    ($name:ident, $variant:ident, $ty:ty, $label:literal) => {
        #[doc = concat!("Unwraps a `", $label, "` answer.")]
        pub fn $name(self) -> Result<$ty, ExecError> {
            match self {
                Return::$variant(value) => Ok(value),
                other => Err(ExecError::UnexpectedReturn {
                    expected: $label,
                    got: other.kind(),
                }),
            }
        }
    };
}

impl Return {
    pub fn kind(&self) -> &'static str {
        match self {
            Return::Unit => "unit",
            Return::Bool(_) => "bool",
            Return::Amount(_) => "amount",
            Return::Count(_) => "count",
            Return::Version(_) => "version",
            Return::Address(_) => "address",
            Return::MaybeAddress(_) => "maybe_address",
            Return::Addresses(_) => "addresses",
            Return::Bytes(_) => "bytes",
        }
    }

    expect_variant!(into_bool, Bool, bool, "bool");
    expect_variant!(into_amount, Amount, Amount, "amount");
    expect_variant!(into_count, Count, u64, "count");
    expect_variant!(into_version, Version, u32, "version");
    expect_variant!(into_address, Address, Address, "address");
    expect_variant!(into_maybe_address, MaybeAddress, Option<Address>, "maybe_address");
    expect_variant!(into_addresses, Addresses, Vec<Address>, "addresses");
}
