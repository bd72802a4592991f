//! # Scenario Runner
//!
//! Replays a scripted list of vault operations against a fresh vault and
//! reports, step by step, what committed and what was rejected. Used by
//! `pacific-node simulate` to reproduce user flows without an HTTP client.
//!
//! ```json
//! { "steps": [
//!     { "deposit":  { "caller": "alice", "amount": 1000000, "slippage": 5 } },
//!     { "advance":  { "ticks": 100 } },
//!     { "withdraw": { "caller": "alice" } }
//! ] }
//! ```
//!
//! `slippage` is in parts-per-thousand and defaults to 1%.

use anyhow::{bail, Context, Result};
use pacific_contracts::{
    Amount, DestinationIndex, NewDestination, SimulatedAdapter, Slippage, Vault, VaultError,
    VaultState,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// One scripted operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    AddDestination {
        caller: String,
        destination: NewDestination,
    },
    SetActive {
        caller: String,
        index: DestinationIndex,
        active: bool,
    },
    SetSwapDestination {
        caller: String,
        index: DestinationIndex,
    },
    Deposit {
        caller: String,
        amount: Amount,
        #[serde(default)]
        slippage: Slippage,
    },
    Withdraw {
        caller: String,
        #[serde(default)]
        slippage: Slippage,
    },
    CollectFees {
        caller: String,
    },
    Pause {
        caller: String,
    },
    Unpause {
        caller: String,
    },
    /// Advances the simulated clock.
    Advance {
        ticks: u64,
    },
}

impl Step {
    fn name(&self) -> &'static str {
        match self {
            Step::AddDestination { .. } => "add_destination",
            Step::SetActive { .. } => "set_active",
            Step::SetSwapDestination { .. } => "set_swap_destination",
            Step::Deposit { .. } => "deposit",
            Step::Withdraw { .. } => "withdraw",
            Step::CollectFees { .. } => "collect_fees",
            Step::Pause { .. } => "pause",
            Step::Unpause { .. } => "unpause",
            Step::Advance { .. } => "advance",
        }
    }

    /// Applies the step, returning the amount it moved, if any.
    fn apply(&self, vault: &mut Vault<SimulatedAdapter>) -> Result<Option<Amount>, VaultError> {
        match self {
            Step::AddDestination {
                caller,
                destination,
            } => vault.add_destination(caller, destination.clone()).map(|_| None),
            Step::SetActive {
                caller,
                index,
                active,
            } => vault
                .set_destination_active(caller, *index, *active)
                .map(|()| None),
            Step::SetSwapDestination { caller, index } => {
                vault.set_swap_destination(caller, *index).map(|()| None)
            }
            Step::Deposit {
                caller,
                amount,
                slippage,
            } => vault
                .deposit(caller, *amount, *slippage)
                .map(|a| Some(a.allocated_total())),
            Step::Withdraw { caller, slippage } => {
                vault.withdraw(caller, *slippage).map(|w| Some(w.total))
            }
            Step::CollectFees { caller } => vault.collect_fees(caller).map(|s| Some(s.amount)),
            Step::Pause { caller } => vault.pause(caller).map(|()| None),
            Step::Unpause { caller } => vault.unpause(caller).map(|()| None),
            Step::Advance { ticks } => {
                vault.adapter_mut().advance(*ticks);
                Ok(None)
            }
        }
    }
}

/// A scripted run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Reads a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("invalid scenario {}", path.display()))
    }
}

/// What one step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step: usize,
    pub operation: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a full run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub outcomes: Vec<StepOutcome>,
    pub events: usize,
    pub tick: u64,
    pub state: VaultState,
}

/// Replays `scenario` against `vault`.
///
/// Rejected steps are recorded and the run continues, unless `strict` is
/// set, in which case the first rejection aborts the run.
pub fn run(
    vault: &mut Vault<SimulatedAdapter>,
    scenario: &Scenario,
    strict: bool,
) -> Result<ScenarioReport> {
    let mut outcomes = Vec::with_capacity(scenario.steps.len());
    let mut events = 0;

    for (i, step) in scenario.steps.iter().enumerate() {
        let outcome = match step.apply(vault) {
            Ok(amount) => {
                info!(step = i, operation = step.name(), "step committed");
                StepOutcome {
                    step: i,
                    operation: step.name().to_string(),
                    ok: true,
                    amount,
                    code: None,
                    error: None,
                }
            }
            Err(e) => {
                warn!(step = i, operation = step.name(), code = e.code(), error = %e, "step rejected");
                if strict {
                    bail!("step {} ({}) rejected: {}", i, step.name(), e);
                }
                StepOutcome {
                    step: i,
                    operation: step.name().to_string(),
                    ok: false,
                    amount: None,
                    code: Some(e.code().to_string()),
                    error: Some(e.to_string()),
                }
            }
        };
        events += vault.drain_events().len();
        outcomes.push(outcome);
    }

    Ok(ScenarioReport {
        outcomes,
        events,
        tick: vault.adapter().now(),
        state: vault.state(),
    })
}
