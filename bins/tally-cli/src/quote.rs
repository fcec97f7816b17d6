//! Price a hypothetical position without touching any balances.

use anyhow::{bail, Result};
use serde::Serialize;
use tally_core::constants::{FIRST_POSITION_ID, SECONDS_PER_DAY};
use tally_core::error::LedgerError;
use tally_core::schedule::RateSchedule;
use tally_core::types::{Amount, Days, Identity, Position, Rate};
use tally_ledger::MemoryBackend;

#[derive(Debug, Serialize)]
pub struct Quote {
    pub amount: Amount,
    pub period: Days,
    pub rate: Rate,
    /// Value at the end of the term.
    pub term_end_value: Amount,
    pub elapsed_days: Days,
    /// Value after `elapsed_days`, or `None` while the term is still running.
    pub withdrawable: Option<Amount>,
}

pub fn quote(
    schedule: RateSchedule,
    amount: Amount,
    period: Days,
    elapsed_days: Days,
) -> Result<Quote> {
    if amount == 0 {
        bail!("amount must be non-zero");
    }
    let rate = schedule.rate_for_period(period)?;
    // Pricing never consults the authorizer.
    let quoter = Identity::from("quote");
    let ledger = MemoryBackend::new(quoter.clone(), 0).ledger(schedule);

    let position = Position {
        id: FIRST_POSITION_ID,
        owner: quoter,
        staked_amount: amount,
        staking_period: period,
        start_time: 0,
    };
    let at = |days: Days| days.saturating_mul(SECONDS_PER_DAY);

    let term_end_value = ledger.preview_withdrawable(&position, at(period))?;
    let withdrawable = match ledger.preview_withdrawable(&position, at(elapsed_days)) {
        Ok(value) => Some(value),
        Err(LedgerError::TermNotElapsed { .. }) => None,
        Err(e) => return Err(e.into()),
    };

    Ok(Quote {
        amount,
        period,
        rate,
        term_end_value,
        elapsed_days,
        withdrawable,
    })
}
