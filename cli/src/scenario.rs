//! # Scenarios
//!
//! A scenario is a JSON file of steps, each sent by a named actor:
//!
//! ```json
//! { "steps": [
//!   { "op": "deploy_logic",    "as": "admin", "bind": "logic" },
//!   { "op": "deploy_registry", "as": "admin", "bind": "registry" },
//!   { "op": "initialize",      "as": "admin", "registry": "registry",
//!     "administrator": "admin", "logic": "logic" },
//!   { "op": "allocate",        "as": "alice", "registry": "registry",
//!     "owner": "alice", "bind": "alice_vault" },
//!   { "op": "withdraw",        "as": "bob",   "vault": "alice_vault",
//!     "token": "usdc", "amount": 1, "expect": "error" }
//! ] }
//! ```
//!
//! Names resolve in this order: literal `0x…` hex, a name bound by an
//! earlier step (`bind`), or [`Address::from_label`]. Actors therefore need
//! no declaration.
//!
//! Contract failures are outcomes, not errors: they are reported and
//! compared against the step's `expect`. Only malformed scenarios (bad hex,
//! duplicate bindings) abort the run.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use custody_contracts::{Approval, Call, ExecError, LedgerCall, Runtime, StandardVault};
use custody_protocol::{Address, Amount};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<Step>,
}

/// What the author expects a step to do.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expect {
    #[default]
    Success,
    Error,
}

#[derive(Debug, Deserialize)]
pub struct Step {
    /// Actor sending the step.
    #[serde(rename = "as")]
    pub sender: String,
    #[serde(default)]
    pub expect: Expect,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Action {
    DeployLogic {
        bind: String,
    },
    DeployRegistry {
        bind: String,
    },
    DeployLedger {
        bind: String,
        name: String,
        symbol: String,
        #[serde(default = "default_decimals")]
        decimals: u8,
    },
    Initialize {
        registry: String,
        administrator: String,
        logic: String,
    },
    Mint {
        token: String,
        to: String,
        amount: Amount,
    },
    Approve {
        token: String,
        spender: String,
        amount: Amount,
    },
    Balance {
        token: String,
        holder: String,
    },
    Allocate {
        registry: String,
        owner: String,
        #[serde(default)]
        bind: Option<String>,
    },
    Predict {
        registry: String,
        owner: String,
    },
    Deposit {
        vault: String,
        token: String,
        amount: Amount,
    },
    Withdraw {
        vault: String,
        token: String,
        amount: Amount,
    },
    SetManager {
        registry: String,
        manager: String,
    },
    Upgrade {
        registry: String,
        logic: String,
    },
    PauseVault {
        registry: String,
        vault: String,
    },
    UnpauseVault {
        registry: String,
        vault: String,
    },
    PauseRegistry {
        registry: String,
    },
    UnpauseRegistry {
        registry: String,
    },
    TransferAdministration {
        registry: String,
        administrator: String,
    },
    SetTargetAllowlist {
        registry: String,
        enabled: bool,
    },
    PermitTarget {
        registry: String,
        target: String,
    },
    RevokeTarget {
        registry: String,
        target: String,
    },
    ExecuteStrategy {
        vault: String,
        target: String,
        #[serde(default)]
        payload: Payload,
        #[serde(default)]
        approvals: Vec<ApprovalSpec>,
    },
}

fn default_decimals() -> u8 {
    6
}

impl Action {
    pub fn op(&self) -> &'static str {
        match self {
            Action::DeployLogic { .. } => "deploy_logic",
            Action::DeployRegistry { .. } => "deploy_registry",
            Action::DeployLedger { .. } => "deploy_ledger",
            Action::Initialize { .. } => "initialize",
            Action::Mint { .. } => "mint",
            Action::Approve { .. } => "approve",
            Action::Balance { .. } => "balance",
            Action::Allocate { .. } => "allocate",
            Action::Predict { .. } => "predict",
            Action::Deposit { .. } => "deposit",
            Action::Withdraw { .. } => "withdraw",
            Action::SetManager { .. } => "set_manager",
            Action::Upgrade { .. } => "upgrade",
            Action::PauseVault { .. } => "pause_vault",
            Action::UnpauseVault { .. } => "unpause_vault",
            Action::PauseRegistry { .. } => "pause_registry",
            Action::UnpauseRegistry { .. } => "unpause_registry",
            Action::TransferAdministration { .. } => "transfer_administration",
            Action::SetTargetAllowlist { .. } => "set_target_allowlist",
            Action::PermitTarget { .. } => "permit_target",
            Action::RevokeTarget { .. } => "revoke_target",
            Action::ExecuteStrategy { .. } => "execute_strategy",
        }
    }
}

/// Bytes handed to a strategy target.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    /// Literal bytes, hex with optional `0x`.
    Hex(String),
    /// An encoded ledger transfer, so the target ledger moves the vault's
    /// own funds.
    LedgerTransfer { to: String, amount: Amount },
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Hex(String::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApprovalSpec {
    pub token: String,
    pub amount: Amount,
}

/// Reads and parses a scenario file.
pub fn load(path: &Path) -> Result<Scenario> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse scenario {}", path.display()))
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

/// One line of run output.
#[derive(Debug, Serialize)]
pub struct StepReport {
    pub step: usize,
    pub op: &'static str,
    pub sender: Address,
    pub ok: bool,
    pub expected: Expect,
    /// `false` when the outcome contradicts `expected`.
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

type Outcome = std::result::Result<Value, ExecError>;

/// Drives a fresh runtime through scenario steps.
#[derive(Default)]
pub struct ScenarioRunner {
    runtime: Runtime,
    names: BTreeMap<String, Address>,
}

fn address_value(address: Address) -> Value {
    Value::String(address.to_hex())
}

impl ScenarioRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// Resolves a name, `0x` literal or label to an identity.
    pub fn resolve(&self, name: &str) -> Result<Address> {
        if name.starts_with("0x") || name.starts_with("0X") {
            return name
                .parse()
                .with_context(|| format!("invalid address literal {name:?}"));
        }
        Ok(self
            .names
            .get(name)
            .copied()
            .unwrap_or_else(|| Address::from_label(name)))
    }

    fn bind(&mut self, name: &str, address: Address) -> Result<()> {
        if self.names.contains_key(name) {
            bail!("name {name:?} is already bound");
        }
        tracing::debug!(name, %address, "name bound");
        self.names.insert(name.to_string(), address);
        Ok(())
    }

    /// Executes one step and reports how it went.
    pub fn run_step(&mut self, index: usize, step: &Step) -> Result<StepReport> {
        let sender = self.resolve(&step.sender)?;
        let op = step.action.op();
        let outcome = self
            .apply(sender, &step.action)
            .with_context(|| format!("step {index} ({op}) is malformed"))?;

        let ok = outcome.is_ok();
        let matched = ok == (step.expect == Expect::Success);
        if !matched {
            tracing::warn!(step = index, op, ok, expected = ?step.expect, "unexpected step outcome");
        }

        let (value, error) = match outcome {
            Ok(Value::Null) => (None, None),
            Ok(value) => (Some(value), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Ok(StepReport {
            step: index,
            op,
            sender,
            ok,
            expected: step.expect,
            matched,
            value,
            error,
        })
    }

    fn apply(&mut self, sender: Address, action: &Action) -> Result<Outcome> {
        let outcome = match action {
            Action::DeployLogic { bind } => {
                let deployed = self.runtime.deploy_logic(sender, Arc::new(StandardVault));
                self.bind_deployed(bind, deployed)?
            }
            Action::DeployRegistry { bind } => {
                let deployed = self.runtime.deploy_registry(sender);
                self.bind_deployed(bind, deployed)?
            }
            Action::DeployLedger {
                bind,
                name,
                symbol,
                decimals,
            } => {
                let deployed = self.runtime.deploy_ledger(sender, name, symbol, *decimals);
                self.bind_deployed(bind, deployed)?
            }
            Action::Initialize {
                registry,
                administrator,
                logic,
            } => {
                let (registry, administrator, logic) = (
                    self.resolve(registry)?,
                    self.resolve(administrator)?,
                    self.resolve(logic)?,
                );
                unit(
                    self.runtime
                        .registry(registry)
                        .initialize(sender, administrator, logic),
                )
            }
            Action::Mint { token, to, amount } => {
                let (token, to) = (self.resolve(token)?, self.resolve(to)?);
                unit(self.runtime.ledger(token).mint(sender, to, *amount))
            }
            Action::Approve {
                token,
                spender,
                amount,
            } => {
                let (token, spender) = (self.resolve(token)?, self.resolve(spender)?);
                self.runtime
                    .ledger(token)
                    .approve(sender, spender, *amount)
                    .map(Value::Bool)
            }
            Action::Balance { token, holder } => {
                let (token, holder) = (self.resolve(token)?, self.resolve(holder)?);
                self.runtime
                    .ledger(token)
                    .balance_of(holder)
                    .map(Value::from)
            }
            Action::Allocate {
                registry,
                owner,
                bind,
            } => {
                let (registry, owner) = (self.resolve(registry)?, self.resolve(owner)?);
                let allocated = self.runtime.registry(registry).allocate_vault(sender, owner);
                match (allocated, bind) {
                    (Ok(vault), Some(name)) => {
                        self.bind(name, vault)?;
                        Ok(address_value(vault))
                    }
                    (allocated, _) => allocated.map(address_value),
                }
            }
            Action::Predict { registry, owner } => {
                let (registry, owner) = (self.resolve(registry)?, self.resolve(owner)?);
                self.runtime
                    .registry(registry)
                    .predict_vault_address(owner)
                    .map(address_value)
            }
            Action::Deposit {
                vault,
                token,
                amount,
            } => {
                let (vault, token) = (self.resolve(vault)?, self.resolve(token)?);
                unit(self.runtime.vault(vault).deposit(sender, token, *amount))
            }
            Action::Withdraw {
                vault,
                token,
                amount,
            } => {
                let (vault, token) = (self.resolve(vault)?, self.resolve(token)?);
                unit(self.runtime.vault(vault).withdraw(sender, token, *amount))
            }
            Action::SetManager { registry, manager } => {
                let (registry, manager) = (self.resolve(registry)?, self.resolve(manager)?);
                unit(self.runtime.registry(registry).set_manager(sender, manager))
            }
            Action::Upgrade { registry, logic } => {
                let (registry, logic) = (self.resolve(registry)?, self.resolve(logic)?);
                unit(self.runtime.registry(registry).upgrade_logic(sender, logic))
            }
            Action::PauseVault { registry, vault } => {
                let (registry, vault) = (self.resolve(registry)?, self.resolve(vault)?);
                unit(self.runtime.registry(registry).pause_vault(sender, vault))
            }
            Action::UnpauseVault { registry, vault } => {
                let (registry, vault) = (self.resolve(registry)?, self.resolve(vault)?);
                unit(self.runtime.registry(registry).unpause_vault(sender, vault))
            }
            Action::PauseRegistry { registry } => {
                let registry = self.resolve(registry)?;
                unit(self.runtime.registry(registry).pause(sender))
            }
            Action::UnpauseRegistry { registry } => {
                let registry = self.resolve(registry)?;
                unit(self.runtime.registry(registry).unpause(sender))
            }
            Action::TransferAdministration {
                registry,
                administrator,
            } => {
                let (registry, administrator) =
                    (self.resolve(registry)?, self.resolve(administrator)?);
                unit(
                    self.runtime
                        .registry(registry)
                        .transfer_administration(sender, administrator),
                )
            }
            Action::SetTargetAllowlist { registry, enabled } => {
                let registry = self.resolve(registry)?;
                unit(
                    self.runtime
                        .registry(registry)
                        .set_target_allowlist(sender, *enabled),
                )
            }
            Action::PermitTarget { registry, target } => {
                let (registry, target) = (self.resolve(registry)?, self.resolve(target)?);
                unit(self.runtime.registry(registry).permit_target(sender, target))
            }
            Action::RevokeTarget { registry, target } => {
                let (registry, target) = (self.resolve(registry)?, self.resolve(target)?);
                unit(self.runtime.registry(registry).revoke_target(sender, target))
            }
            Action::ExecuteStrategy {
                vault,
                target,
                payload,
                approvals,
            } => {
                let (vault, target) = (self.resolve(vault)?, self.resolve(target)?);
                let payload = self.encode_payload(payload)?;
                let approvals = approvals
                    .iter()
                    .map(|a| {
                        Ok(Approval {
                            token: self.resolve(&a.token)?,
                            amount: a.amount,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                unit(
                    self.runtime
                        .vault(vault)
                        .execute_strategy(sender, target, payload, approvals),
                )
            }
        };
        Ok(outcome)
    }

    fn bind_deployed(
        &mut self,
        name: &str,
        deployed: std::result::Result<Address, ExecError>,
    ) -> Result<Outcome> {
        Ok(match deployed {
            Ok(address) => {
                self.bind(name, address)?;
                Ok(address_value(address))
            }
            Err(e) => Err(e),
        })
    }

    fn encode_payload(&self, payload: &Payload) -> Result<Vec<u8>> {
        match payload {
            Payload::Hex(text) => {
                let digits = text.strip_prefix("0x").unwrap_or(text);
                hex::decode(digits).with_context(|| format!("invalid hex payload {text:?}"))
            }
            Payload::LedgerTransfer { to, amount } => {
                let call = Call::Ledger(LedgerCall::Transfer {
                    to: self.resolve(to)?,
                    amount: *amount,
                });
                call.encode().context("failed to encode ledger transfer")
            }
        }
    }
}

fn unit(result: std::result::Result<(), ExecError>) -> Outcome {
    result.map(|()| Value::Null)
}
