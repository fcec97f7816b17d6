//! The position ledger.
//!
//! [`PositionLedger`] owns a [`PositionStore`] and drives the position state
//! machine: stake, extend, withdraw (partial or full), their batch variants,
//! and the administrative escape hatch.
//!
//! Every mutating operation follows the same shape while holding the caller's
//! set lock:
//! 1. validate and price against the current state (no mutation),
//! 2. request the external transfer, if any,
//! 3. commit: close slots, draw ids, open positions, emit events.
//!
//! Step 3 cannot fail, so a failure in 1 or 2 leaves no trace. Batches plan
//! every step against a staged copy and aggregate their transfers into one.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use tally_core::error::LedgerError;
use tally_core::events::LedgerEvent;
use tally_core::schedule::RateSchedule;
use tally_core::traits::{AssetLedger, Authorizer, Clock, CompoundCalculator, EventSink};
use tally_core::types::{
    Amount, Days, Identity, Position, PositionId, PositionSlot, Rate, Timestamp,
};

use crate::store::{PositionSet, PositionStore};

/// External collaborators a ledger is wired to.
pub struct Collaborators {
    pub calculator: Arc<dyn CompoundCalculator>,
    pub assets: Arc<dyn AssetLedger>,
    pub authorizer: Arc<dyn Authorizer>,
    pub clock: Arc<dyn Clock>,
    pub events: Arc<dyn EventSink>,
}

/// Outcome of a committed withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WithdrawReceipt {
    /// The position that was closed.
    pub id: PositionId,
    /// Amount transferred to the caller.
    pub withdrawn: Amount,
    /// Position holding the unclaimed remainder, if any was left.
    pub remainder: Option<PositionId>,
}

/// A priced withdrawal that has not been applied yet.
#[derive(Debug, Clone)]
struct WithdrawPlan {
    position: Position,
    amount: Amount,
    remainder: Amount,
}

pub struct PositionLedger {
    schedule: RateSchedule,
    store: PositionStore,
    calculator: Arc<dyn CompoundCalculator>,
    assets: Arc<dyn AssetLedger>,
    authorizer: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
    events: Arc<dyn EventSink>,
}

impl PositionLedger {
    pub fn new(schedule: RateSchedule, store: PositionStore, deps: Collaborators) -> Self {
        Self {
            schedule,
            store,
            calculator: deps.calculator,
            assets: deps.assets,
            authorizer: deps.authorizer,
            clock: deps.clock,
            events: deps.events,
        }
    }

    // --- queries ---

    pub fn schedule(&self) -> &RateSchedule {
        &self.schedule
    }

    pub fn rate_for_period(&self, period: Days) -> Result<Rate, LedgerError> {
        self.schedule.rate_for_period(period)
    }

    /// The id the next opened position will receive.
    pub fn next_id(&self) -> PositionId {
        self.store.next_id()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Every identity the store holds a set for, sorted.
    pub fn owners(&self) -> Vec<Identity> {
        self.store.owners()
    }

    /// Ordered snapshot of an owner's slots, closed slots at their original index.
    pub fn positions(&self, owner: &Identity) -> Vec<PositionSlot> {
        self.store.snapshot(owner)
    }

    pub fn position(&self, owner: &Identity, id: PositionId) -> Option<PositionSlot> {
        let set = self.store.existing_set(owner)?;
        let set = set.lock();
        set.get(id).cloned()
    }

    pub fn active_positions(&self, owner: &Identity) -> Vec<Position> {
        self.store
            .existing_set(owner)
            .map(|set| set.lock().active_positions().cloned().collect())
            .unwrap_or_default()
    }

    /// Sum of the principals of an owner's live positions.
    pub fn total_staked(&self, owner: &Identity) -> Result<Amount, LedgerError> {
        self.active_positions(owner)
            .iter()
            .try_fold(0u128, |acc, p| acc.checked_add(p.staked_amount))
            .ok_or(LedgerError::Overflow)
    }

    /// When the term of a live position ends.
    pub fn term_end(&self, owner: &Identity, id: PositionId) -> Result<Timestamp, LedgerError> {
        let set = self.set_of(owner, id)?;
        let set = set.lock();
        Ok(live(&set, id)?.term_end())
    }

    /// Price a position at `now`.
    ///
    /// The term is priced at the position's own rate. Once at least one full
    /// day has passed beyond the term, every whole extra day compounds on top
    /// at the minimum rate. A fraction of an extra day accrues nothing.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::TermNotElapsed`] before the term end
    /// - [`LedgerError::InvalidPeriod`] if the position's period is not configured
    /// - [`LedgerError::Overflow`] from the calculator
    pub fn preview_withdrawable(
        &self,
        position: &Position,
        now: Timestamp,
    ) -> Result<Amount, LedgerError> {
        if !position.is_term_elapsed(now) {
            return Err(LedgerError::TermNotElapsed {
                id: position.id,
                ends_at: position.term_end(),
            });
        }

        let period = position.staking_period;
        let rate = self.schedule.rate_for_period(period)?;
        let at_term_end = self
            .calculator
            .compound(rate, position.staked_amount, period)?;

        let elapsed = position.elapsed_days(now);
        if elapsed > period {
            let extra = elapsed - period;
            let value =
                self.calculator
                    .compound(self.schedule.minimum_rate(), at_term_end, extra)?;
            debug!(id = position.id, at_term_end, extra, value, "priced stale position");
            return Ok(value);
        }

        debug!(id = position.id, at_term_end, "priced matured position");
        Ok(at_term_end)
    }

    /// Value `caller` could withdraw from position `id` right now.
    pub fn withdrawable_amount(
        &self,
        caller: &Identity,
        id: PositionId,
    ) -> Result<Amount, LedgerError> {
        let now = self.clock.now();
        let set = self.set_of(caller, id)?;
        let set = set.lock();
        self.preview_withdrawable(live(&set, id)?, now)
    }

    // --- operations ---

    /// Lock `amount` for `period` days. Returns the new position id.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] for a zero amount
    /// - [`LedgerError::InvalidPeriod`] if `period` is not a tier
    /// - [`LedgerError::TransferFailure`] if the asset ledger refuses the deposit
    pub fn stake(
        &self,
        caller: &Identity,
        amount: Amount,
        period: Days,
    ) -> Result<PositionId, LedgerError> {
        self.validate_stake(amount, period)?;

        let now = self.clock.now();
        self.deposit_then(caller, amount, |set| {
            self.open(set, caller, amount, period, now)
        })
    }

    /// Stake every `(amounts[i], periods[i])` pair, all or nothing.
    ///
    /// The deposit is requested once, for the sum of all amounts, after every
    /// pair has been validated. Ids increase in pair order.
    pub fn stake_batch(
        &self,
        caller: &Identity,
        amounts: &[Amount],
        periods: &[Days],
    ) -> Result<Vec<PositionId>, LedgerError> {
        if amounts.len() != periods.len() {
            return Err(LedgerError::LengthMismatch {
                left: amounts.len(),
                right: periods.len(),
            });
        }

        let mut total: Amount = 0;
        for (index, (&amount, &period)) in amounts.iter().zip(periods).enumerate() {
            self.validate_stake(amount, period)
                .inspect_err(|e| debug!(%caller, index, error = %e, "stake batch rejected"))?;
            total = total.checked_add(amount).ok_or(LedgerError::Overflow)?;
        }
        if amounts.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        self.deposit_then(caller, total, |set| {
            amounts
                .iter()
                .zip(periods)
                .map(|(&amount, &period)| self.open(set, caller, amount, period, now))
                .collect()
        })
    }

    /// Roll a matured position, including its accrued value, into a new tier.
    ///
    /// No transfer takes place. The old id is closed and a new position starting
    /// now is opened. Returns the new id.
    pub fn extend_staking_period(
        &self,
        caller: &Identity,
        id: PositionId,
        new_period: Days,
    ) -> Result<PositionId, LedgerError> {
        self.schedule.tier_for_period(new_period)?;

        let now = self.clock.now();
        let set = self.set_of(caller, id)?;
        let mut set = set.lock();

        let value = self.preview_withdrawable(live(&set, id)?, now)?;

        set.close(id);
        let new_id = self.open(&mut set, caller, value, new_period, now);
        info!(%caller, old_id = id, new_id, value, new_period, "staking period extended");
        Ok(new_id)
    }

    /// Withdraw `amount` from a matured position.
    ///
    /// The position is closed. Whatever is left of its withdrawable value is
    /// re-staked at the rollover period so it keeps accruing at the minimum rate.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] for a zero amount
    /// - [`LedgerError::InvalidPosition`] for an unknown, foreign or closed id
    /// - [`LedgerError::TermNotElapsed`] before the term end
    /// - [`LedgerError::InsufficientWithdrawable`] if `amount` exceeds the value
    /// - [`LedgerError::TransferFailure`] if the payout is refused
    pub fn withdraw(
        &self,
        caller: &Identity,
        id: PositionId,
        amount: Amount,
    ) -> Result<WithdrawReceipt, LedgerError> {
        self.withdraw_inner(caller, id, Some(amount))
    }

    /// Withdraw the whole value of a matured position. Leaves no remainder.
    pub fn withdraw_all(
        &self,
        caller: &Identity,
        id: PositionId,
    ) -> Result<WithdrawReceipt, LedgerError> {
        self.withdraw_inner(caller, id, None)
    }

    /// Withdraw `amounts[i]` from `ids[i]` for every pair, all or nothing.
    ///
    /// Steps are planned in order against a staged copy of the caller's set, so
    /// naming the same id twice fails on the second step. One payout for the
    /// total is requested before anything is committed.
    pub fn withdraw_batch(
        &self,
        caller: &Identity,
        ids: &[PositionId],
        amounts: &[Amount],
    ) -> Result<Vec<WithdrawReceipt>, LedgerError> {
        if ids.len() != amounts.len() {
            return Err(LedgerError::LengthMismatch {
                left: ids.len(),
                right: amounts.len(),
            });
        }
        let Some(&first) = ids.first() else {
            return Ok(Vec::new());
        };

        let now = self.clock.now();
        let set = self.set_of(caller, first)?;
        let mut set = set.lock();

        let mut staged = PositionSet::clone(&set);
        let mut plans = Vec::with_capacity(ids.len());
        let mut total: Amount = 0;
        for (index, (&id, &amount)) in ids.iter().zip(amounts).enumerate() {
            let plan = self
                .plan_withdraw(&staged, id, Some(amount), now)
                .inspect_err(|e| debug!(%caller, index, id, error = %e, "withdraw batch rejected"))?;
            staged.close(id);
            total = total.checked_add(plan.amount).ok_or(LedgerError::Overflow)?;
            plans.push(plan);
        }

        self.transfer_out(caller, total)?;
        Ok(plans
            .into_iter()
            .map(|plan| self.commit_withdraw(&mut set, caller, plan, now))
            .collect())
    }

    /// Pay `amount` out of custody to an administrator.
    ///
    /// Independent of position accounting; the only gate is the authorizer.
    pub fn admin_withdraw(&self, caller: &Identity, amount: Amount) -> Result<(), LedgerError> {
        if !self.authorizer.is_admin(caller) {
            warn!(%caller, amount, "unauthorized admin withdrawal");
            return Err(LedgerError::Unauthorized(caller.clone()));
        }
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }

        self.transfer_out(caller, amount)?;
        self.events.emit(LedgerEvent::AdminWithdrawn {
            admin: caller.clone(),
            amount,
        });
        info!(admin = %caller, amount, "admin withdrawal");
        Ok(())
    }

    // --- internals ---

    fn validate_stake(&self, amount: Amount, period: Days) -> Result<(), LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        self.schedule.tier_for_period(period)?;
        Ok(())
    }

    /// Take `amount` from `caller`, then run `commit` under the caller's set lock.
    ///
    /// A first-time owner's set is only created once the deposit succeeded, so
    /// a refused deposit leaves the store untouched.
    fn deposit_then<T>(
        &self,
        caller: &Identity,
        amount: Amount,
        commit: impl FnOnce(&mut PositionSet) -> T,
    ) -> Result<T, LedgerError> {
        if let Some(set) = self.store.existing_set(caller) {
            let mut set = set.lock();
            self.transfer_in(caller, amount)?;
            return Ok(commit(&mut set));
        }

        self.transfer_in(caller, amount)?;
        let set = self.store.owner_set(caller);
        let mut set = set.lock();
        Ok(commit(&mut set))
    }

    fn set_of(
        &self,
        owner: &Identity,
        id: PositionId,
    ) -> Result<Arc<Mutex<PositionSet>>, LedgerError> {
        self.store
            .existing_set(owner)
            .ok_or(LedgerError::InvalidPosition(id))
    }

    fn withdraw_inner(
        &self,
        caller: &Identity,
        id: PositionId,
        requested: Option<Amount>,
    ) -> Result<WithdrawReceipt, LedgerError> {
        if requested == Some(0) {
            return Err(LedgerError::InvalidAmount);
        }

        let now = self.clock.now();
        let set = self.set_of(caller, id)?;
        let mut set = set.lock();

        let plan = self.plan_withdraw(&set, id, requested, now)?;
        self.transfer_out(caller, plan.amount)?;
        Ok(self.commit_withdraw(&mut set, caller, plan, now))
    }

    /// Price a withdrawal of `requested` (or everything, for `None`) without mutating.
    fn plan_withdraw(
        &self,
        set: &PositionSet,
        id: PositionId,
        requested: Option<Amount>,
        now: Timestamp,
    ) -> Result<WithdrawPlan, LedgerError> {
        let position = live(set, id)?;
        let available = self.preview_withdrawable(position, now)?;
        let amount = match requested {
            None => available,
            Some(0) => return Err(LedgerError::InvalidAmount),
            Some(requested) if requested > available => {
                return Err(LedgerError::InsufficientWithdrawable {
                    requested,
                    available,
                });
            }
            Some(requested) => requested,
        };
        Ok(WithdrawPlan {
            position: position.clone(),
            amount,
            remainder: available - amount,
        })
    }

    fn commit_withdraw(
        &self,
        set: &mut PositionSet,
        caller: &Identity,
        plan: WithdrawPlan,
        now: Timestamp,
    ) -> WithdrawReceipt {
        let WithdrawPlan {
            position,
            amount,
            remainder,
        } = plan;

        let closed = set.close(position.id);
        debug_assert!(closed.is_some(), "planned position must still be live");

        let remainder_id = (remainder > 0).then(|| {
            let period = self.schedule.period_for_minimum_rate();
            self.open(set, caller, remainder, period, now)
        });

        self.events.emit(LedgerEvent::Withdrawn {
            caller: caller.clone(),
            id: position.id,
            staked_amount: position.staked_amount,
            withdraw_amount: amount,
            period: position.staking_period,
            start_time: position.start_time,
            end_time: now,
        });
        info!(%caller, id = position.id, amount, remainder, "position withdrawn");

        WithdrawReceipt {
            id: position.id,
            withdrawn: amount,
            remainder: remainder_id,
        }
    }

    /// Commit a new position. Draws the id, so only call once nothing can fail.
    fn open(
        &self,
        set: &mut PositionSet,
        caller: &Identity,
        amount: Amount,
        period: Days,
        now: Timestamp,
    ) -> PositionId {
        let id = self.store.allocate_id();
        set.push(Position {
            id,
            owner: caller.clone(),
            staked_amount: amount,
            staking_period: period,
            start_time: now,
        });
        self.events.emit(LedgerEvent::Staked {
            caller: caller.clone(),
            id,
            amount,
            period,
            start_time: now,
        });
        info!(%caller, id, amount, period, "position opened");
        id
    }

    fn transfer_in(&self, caller: &Identity, amount: Amount) -> Result<(), LedgerError> {
        self.assets.transfer_in(caller, amount).map_err(|e| {
            warn!(%caller, amount, error = %e, "deposit refused");
            LedgerError::from(e)
        })
    }

    fn transfer_out(&self, caller: &Identity, amount: Amount) -> Result<(), LedgerError> {
        self.assets.transfer_out(caller, amount).map_err(|e| {
            warn!(%caller, amount, error = %e, "payout refused");
            LedgerError::from(e)
        })
    }
}

/// The live position `id` in `set`.
fn live(set: &PositionSet, id: PositionId) -> Result<&Position, LedgerError> {
    set.active(id).ok_or(LedgerError::InvalidPosition(id))
}
