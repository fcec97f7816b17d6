//! Scripted replay against an in-memory ledger.
//!
//! A script is a JSON document:
//!
//! ```json
//! {
//!   "start": 1700000000,
//!   "reserves": 1000000,
//!   "steps": [
//!     { "fund": { "who": "alice", "amount": 1000 } },
//!     { "stake": { "who": "alice", "amount": 1000, "period": 30 } },
//!     { "advance": { "days": 31 } },
//!     { "withdraw_all": { "who": "alice", "id": 1 } }
//!   ]
//! }
//! ```
//!
//! Steps run in order on a [`ManualClock`](tally_ledger::ManualClock). A
//! failing step is recorded in the report and the replay moves on.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tally_core::error::LedgerError;
use tally_core::events::LedgerEvent;
use tally_core::traits::Clock;
use tally_core::types::{Amount, Days, Identity, PositionId, PositionSlot, Timestamp};
use tally_ledger::{LedgerConfig, MemoryBackend, PositionLedger, WithdrawReceipt};

fn default_start() -> Timestamp {
    1_700_000_000
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    #[serde(default = "default_start")]
    pub start: Timestamp,
    /// Pre-funded custody used to pay rewards.
    #[serde(default)]
    pub reserves: Amount,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub enum Step {
    Advance {
        #[serde(default)]
        days: Days,
        #[serde(default)]
        secs: u64,
    },
    Fund {
        who: Identity,
        amount: Amount,
    },
    Stake {
        who: Identity,
        amount: Amount,
        period: Days,
    },
    StakeBatch {
        who: Identity,
        amounts: Vec<Amount>,
        periods: Vec<Days>,
    },
    Extend {
        who: Identity,
        id: PositionId,
        period: Days,
    },
    Withdraw {
        who: Identity,
        id: PositionId,
        amount: Amount,
    },
    WithdrawAll {
        who: Identity,
        id: PositionId,
    },
    WithdrawBatch {
        who: Identity,
        ids: Vec<PositionId>,
        amounts: Vec<Amount>,
    },
    AdminWithdraw {
        who: Identity,
        amount: Amount,
    },
}

/// What a successful step produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepOutput {
    Clock { now: Timestamp },
    Balance { balance: Amount },
    Opened { id: PositionId },
    OpenedBatch { ids: Vec<PositionId> },
    Withdrawn(WithdrawReceipt),
    WithdrawnBatch(Vec<WithdrawReceipt>),
    Custody { custody: Amount },
}

#[derive(Debug, Serialize)]
pub struct StepOutcome {
    pub index: usize,
    pub step: Step,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<StepOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Report {
    pub steps: Vec<StepOutcome>,
    pub events: Vec<LedgerEvent>,
    pub positions: BTreeMap<Identity, Vec<PositionSlot>>,
    pub custody: Amount,
    pub finished_at: Timestamp,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.steps.iter().filter(|s| s.error.is_some()).count()
    }
}

pub fn parse(json: &str) -> Result<Script> {
    Ok(serde_json::from_str(json)?)
}

/// Run `script` against a fresh ledger built from `config`.
pub fn run(config: &LedgerConfig, script: &Script) -> Result<Report> {
    let schedule = config.schedule()?;
    let backend = MemoryBackend::new(config.admin(), script.start);
    backend.assets.fund_custody(script.reserves);
    let ledger = backend.ledger(schedule);

    let mut steps = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.iter().enumerate() {
        let outcome = match apply(&backend, &ledger, step) {
            Ok(output) => {
                debug!(index, ?step, "step applied");
                StepOutcome {
                    index,
                    step: step.clone(),
                    output: Some(output),
                    error: None,
                }
            }
            Err(e) => {
                warn!(index, ?step, error = %e, "step failed");
                StepOutcome {
                    index,
                    step: step.clone(),
                    output: None,
                    error: Some(e.to_string()),
                }
            }
        };
        steps.push(outcome);
    }

    let positions = ledger
        .owners()
        .into_iter()
        .map(|owner| {
            let slots = ledger.positions(&owner);
            (owner, slots)
        })
        .collect();

    let report = Report {
        steps,
        events: backend.events.events(),
        positions,
        custody: backend.assets.custody(),
        finished_at: ledger.now(),
    };
    info!(
        steps = report.steps.len(),
        failures = report.failures(),
        events = report.events.len(),
        "replay finished"
    );
    Ok(report)
}

fn apply(
    backend: &MemoryBackend,
    ledger: &PositionLedger,
    step: &Step,
) -> Result<StepOutput, LedgerError> {
    let output = match step {
        Step::Advance { days, secs } => {
            backend.clock.advance_days(*days);
            backend.clock.advance_secs(*secs);
            StepOutput::Clock {
                now: backend.clock.now(),
            }
        }
        Step::Fund { who, amount } => {
            backend.assets.mint(who, *amount);
            StepOutput::Balance {
                balance: backend.assets.balance_of(who),
            }
        }
        Step::Stake {
            who,
            amount,
            period,
        } => StepOutput::Opened {
            id: ledger.stake(who, *amount, *period)?,
        },
        Step::StakeBatch {
            who,
            amounts,
            periods,
        } => StepOutput::OpenedBatch {
            ids: ledger.stake_batch(who, amounts, periods)?,
        },
        Step::Extend { who, id, period } => StepOutput::Opened {
            id: ledger.extend_staking_period(who, *id, *period)?,
        },
        Step::Withdraw { who, id, amount } => {
            StepOutput::Withdrawn(ledger.withdraw(who, *id, *amount)?)
        }
        Step::WithdrawAll { who, id } => StepOutput::Withdrawn(ledger.withdraw_all(who, *id)?),
        Step::WithdrawBatch { who, ids, amounts } => {
            StepOutput::WithdrawnBatch(ledger.withdraw_batch(who, ids, amounts)?)
        }
        Step::AdminWithdraw { who, amount } => {
            ledger.admin_withdraw(who, *amount)?;
            StepOutput::Custody {
                custody: backend.assets.custody(),
            }
        }
    };
    Ok(output)
}
