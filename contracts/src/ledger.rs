//! # Token Ledger
//!
//! A reference fungible value ledger, deployed into the runtime like any
//! other contract. Vaults rely on four calls only:
//!
//! ```text
//! balance_of(holder)               -> amount
//! transfer(to, amount)             -> bool
//! transfer_from(from, to, amount)  -> bool
//! approve(spender, amount)         -> bool
//! ```
//!
//! so an opaque program answering the same [`LedgerCall`]s can stand in for
//! this one (tests use that to build misbehaving ledgers).
//!
//! ## Rules
//!
//! - **Mint gating**: only the `minter` fixed at deployment can mint.
//! - **Allowances**: `approve` sets the allowance to exactly the amount,
//!   it does not add. `transfer_from` consumes allowance.
//! - **Supply tracking**: total supply and balances are checked on every
//!   credit. Overflow is an error, never a wrap.

use std::collections::BTreeMap;

use custody_protocol::{Address, Amount, Event};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ExecError;
use crate::runtime::{Call, Env, Return};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised by the reference ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A required identity argument was the null identity.
    #[error("{0} must not be the null identity")]
    ZeroAddress(&'static str),

    #[error("unauthorized: {caller} is not the minter")]
    UnauthorizedMint { caller: Address },

    #[error("insufficient balance: {holder} has {available}, needs {requested}")]
    InsufficientBalance {
        holder: Address,
        available: Amount,
        requested: Amount,
    },

    #[error("insufficient allowance: {spender} may move {available} of {owner}'s funds, needs {requested}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        available: Amount,
        requested: Amount,
    },

    /// A credit would exceed `u64::MAX`.
    #[error("amount overflow")]
    Overflow,
}

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

/// Everything the ledger answers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerCall {
    BalanceOf { holder: Address },
    Allowance { owner: Address, spender: Address },
    TotalSupply,
    Transfer { to: Address, amount: Amount },
    TransferFrom { from: Address, to: Address, amount: Amount },
    Approve { spender: Address, amount: Amount },
    Mint { to: Address, amount: Amount },
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Ledger storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenLedger {
    /// Human-readable name (e.g., "USD Coin").
    name: String,
    /// Ticker symbol (e.g., "USDC").
    symbol: String,
    decimals: u8,
    /// The only identity allowed to mint.
    minter: Address,
    total_supply: Amount,
    balances: BTreeMap<Address, Amount>,
    /// `owner -> (spender -> allowance)`.
    allowances: BTreeMap<Address, BTreeMap<Address, Amount>>,
}

impl TokenLedger {
    /// Creates an empty ledger with zero supply.
    pub fn new(name: &str, symbol: &str, decimals: u8, minter: Address) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            minter,
            total_supply: 0,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn minter(&self) -> Address {
        self.minter
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of `holder`, or 0.
    pub fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    /// How much `spender` may still move out of `owner`'s balance.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|s| s.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Creates new supply for `to`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::UnauthorizedMint`] if `caller` is not the
    /// minter and [`LedgerError::Overflow`] if supply would exceed `u64::MAX`.
    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        if caller != self.minter {
            return Err(LedgerError::UnauthorizedMint { caller });
        }
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress("recipient"));
        }

        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.total_supply = supply;
        self.balances.insert(to, balance);
        Ok(())
    }

    /// Moves `amount` from `from` to `to`.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::ZeroAddress("recipient"));
        }
        let available = self.balance_of(&from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                holder: from,
                available,
                requested: amount,
            });
        }

        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.balances.insert(from, available - amount);
        self.balances.insert(to, credited);
        Ok(())
    }

    /// Sets `spender`'s allowance over `owner`'s funds to exactly `amount`.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) -> Result<(), LedgerError> {
        if spender.is_zero() {
            return Err(LedgerError::ZeroAddress("spender"));
        }
        self.allowances
            .entry(owner)
            .or_default()
            .insert(spender, amount);
        Ok(())
    }

    /// Moves `amount` from `from` to `to` on behalf of `spender`, consuming
    /// allowance.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let available = self.allowance(&from, &spender);
        if available < amount {
            return Err(LedgerError::InsufficientAllowance {
                owner: from,
                spender,
                available,
                requested: amount,
            });
        }
        self.transfer(from, to, amount)?;
        self.allowances
            .entry(from)
            .or_default()
            .insert(spender, available - amount);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub(crate) fn handle(env: &mut Env<'_>, call: LedgerCall) -> Result<Return, ExecError> {
    let this = env.this();
    let caller = env.caller();
    let ledger = env
        .world_mut()
        .ledger_mut(&this)
        .ok_or(ExecError::UnknownAccount(this))?;

    match call {
        LedgerCall::BalanceOf { holder } => Ok(Return::Amount(ledger.balance_of(&holder))),
        LedgerCall::Allowance { owner, spender } => {
            Ok(Return::Amount(ledger.allowance(&owner, &spender)))
        }
        LedgerCall::TotalSupply => Ok(Return::Amount(ledger.total_supply())),
        LedgerCall::Transfer { to, amount } => {
            ledger.transfer(caller, to, amount)?;
            env.emit(Event::Transfer {
                from: caller,
                to,
                amount,
            });
            Ok(Return::Bool(true))
        }
        LedgerCall::TransferFrom { from, to, amount } => {
            ledger.transfer_from(caller, from, to, amount)?;
            env.emit(Event::Transfer { from, to, amount });
            Ok(Return::Bool(true))
        }
        LedgerCall::Approve { spender, amount } => {
            ledger.approve(caller, spender, amount)?;
            env.emit(Event::Approval {
                owner: caller,
                spender,
                amount,
            });
            Ok(Return::Bool(true))
        }
        LedgerCall::Mint { to, amount } => {
            ledger.mint(caller, to, amount)?;
            env.emit(Event::Transfer {
                from: Address::ZERO,
                to,
                amount,
            });
            Ok(Return::Unit)
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound helpers
// ---------------------------------------------------------------------------
//
// How contracts talk to a ledger they do not own. Each is one nested frame,
// so the callee may be this reference ledger or any program that answers
// the same calls.

pub fn balance_of(env: &mut Env<'_>, token: Address, holder: Address) -> Result<Amount, ExecError> {
    env.call(token, Call::Ledger(LedgerCall::BalanceOf { holder }))?
        .into_amount()
}

pub fn transfer(env: &mut Env<'_>, token: Address, to: Address, amount: Amount) -> Result<bool, ExecError> {
    env.call(token, Call::Ledger(LedgerCall::Transfer { to, amount }))?
        .into_bool()
}

pub fn transfer_from(
    env: &mut Env<'_>,
    token: Address,
    from: Address,
    to: Address,
    amount: Amount,
) -> Result<bool, ExecError> {
    env.call(token, Call::Ledger(LedgerCall::TransferFrom { from, to, amount }))?
        .into_bool()
}

pub fn approve(
    env: &mut Env<'_>,
    token: Address,
    spender: Address,
    amount: Amount,
) -> Result<bool, ExecError> {
    env.call(token, Call::Ledger(LedgerCall::Approve { spender, amount }))?
        .into_bool()
}
