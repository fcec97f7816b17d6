//! Tiered rate schedule.
//!
//! A schedule pairs exactly three staking periods with daily rates, plus a
//! minimum rate that applies to value held past its term and to positions
//! created at the rollover period. Fixed at construction.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LONG_PERIOD_DAYS, DEFAULT_LONG_RATE, DEFAULT_MEDIUM_PERIOD_DAYS, DEFAULT_MEDIUM_RATE,
    DEFAULT_MINIMUM_RATE, DEFAULT_MINIMUM_RATE_PERIOD_DAYS, DEFAULT_SHORT_PERIOD_DAYS,
    DEFAULT_SHORT_RATE, TIER_COUNT,
};
use crate::error::{LedgerError, ScheduleError};
use crate::types::{Days, Rate};

/// A staking period eligible for fresh stakes, and its daily rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tier {
    pub period: Days,
    pub rate: Rate,
}

impl Tier {
    pub const fn new(period: Days, rate: Rate) -> Self {
        Self { period, rate }
    }
}

/// Immutable rate configuration of a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateSchedule {
    tiers: [Tier; TIER_COUNT],
    minimum_rate: Rate,
    period_for_minimum_rate: Days,
}

impl RateSchedule {
    /// Validate and build a schedule.
    ///
    /// # Errors
    ///
    /// - [`ScheduleError::ZeroPeriod`] if any period is zero
    /// - [`ScheduleError::DuplicatePeriod`] if two tiers share a period
    /// - [`ScheduleError::MinimumPeriodCollides`] if the rollover period equals a tier period
    pub fn new(
        tiers: [Tier; TIER_COUNT],
        minimum_rate: Rate,
        period_for_minimum_rate: Days,
    ) -> Result<Self, ScheduleError> {
        if period_for_minimum_rate == 0 || tiers.iter().any(|t| t.period == 0) {
            return Err(ScheduleError::ZeroPeriod);
        }
        for (i, tier) in tiers.iter().enumerate() {
            if tiers[i + 1..].iter().any(|t| t.period == tier.period) {
                return Err(ScheduleError::DuplicatePeriod(tier.period));
            }
        }
        if tiers.iter().any(|t| t.period == period_for_minimum_rate) {
            return Err(ScheduleError::MinimumPeriodCollides(period_for_minimum_rate));
        }
        Ok(Self {
            tiers,
            minimum_rate,
            period_for_minimum_rate,
        })
    }

    pub fn tiers(&self) -> &[Tier; TIER_COUNT] {
        &self.tiers
    }

    pub fn minimum_rate(&self) -> Rate {
        self.minimum_rate
    }

    pub fn period_for_minimum_rate(&self) -> Days {
        self.period_for_minimum_rate
    }

    /// The tier whose period is exactly `period`.
    ///
    /// Only tiers are eligible for fresh stakes and extensions.
    pub fn tier_for_period(&self, period: Days) -> Result<&Tier, LedgerError> {
        self.tiers
            .iter()
            .find(|t| t.period == period)
            .ok_or(LedgerError::InvalidPeriod(period))
    }

    /// Rate accrued during the term of a position staked for `period`.
    ///
    /// Tier periods map to their tier rate; the rollover period maps to the
    /// minimum rate.
    pub fn rate_for_period(&self, period: Days) -> Result<Rate, LedgerError> {
        if period == self.period_for_minimum_rate {
            return Ok(self.minimum_rate);
        }
        self.tier_for_period(period).map(|t| t.rate)
    }
}

impl Default for RateSchedule {
    fn default() -> Self {
        Self {
            tiers: [
                Tier::new(DEFAULT_SHORT_PERIOD_DAYS, Rate::from_raw(DEFAULT_SHORT_RATE)),
                Tier::new(DEFAULT_MEDIUM_PERIOD_DAYS, Rate::from_raw(DEFAULT_MEDIUM_RATE)),
                Tier::new(DEFAULT_LONG_PERIOD_DAYS, Rate::from_raw(DEFAULT_LONG_RATE)),
            ],
            minimum_rate: Rate::from_raw(DEFAULT_MINIMUM_RATE),
            period_for_minimum_rate: DEFAULT_MINIMUM_RATE_PERIOD_DAYS,
        }
    }
}
