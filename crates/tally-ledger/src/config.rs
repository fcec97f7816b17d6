//! Ledger configuration.
//!
//! [`LedgerConfig`] is plain serde data with defaults matching
//! [`RateSchedule::default`]. Rates are raw values scaled by
//! [`RATE_PRECISION`](tally_core::constants::RATE_PRECISION).

use serde::{Deserialize, Serialize};

use tally_core::constants::{
    DEFAULT_LONG_PERIOD_DAYS, DEFAULT_LONG_RATE, DEFAULT_MEDIUM_PERIOD_DAYS, DEFAULT_MEDIUM_RATE,
    DEFAULT_MINIMUM_RATE, DEFAULT_MINIMUM_RATE_PERIOD_DAYS, DEFAULT_SHORT_PERIOD_DAYS,
    DEFAULT_SHORT_RATE,
};
use tally_core::error::LedgerError;
use tally_core::schedule::{RateSchedule, Tier};
use tally_core::types::{Days, Identity, Rate};

/// One configured tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    pub period_days: Days,
    /// Daily rate scaled by 10^18.
    pub rate: u64,
}

impl From<TierConfig> for Tier {
    fn from(t: TierConfig) -> Self {
        Tier::new(t.period_days, Rate::from_raw(t.rate as u128))
    }
}

/// Configuration for a ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub tiers: [TierConfig; 3],
    /// Floor daily rate scaled by 10^18.
    pub minimum_rate: u64,
    /// Rollover duration for remainders re-staked at the minimum rate.
    pub minimum_rate_period_days: Days,
    /// Identity allowed to withdraw from custody directly.
    pub admin: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            tiers: [
                TierConfig {
                    period_days: DEFAULT_SHORT_PERIOD_DAYS,
                    rate: DEFAULT_SHORT_RATE as u64,
                },
                TierConfig {
                    period_days: DEFAULT_MEDIUM_PERIOD_DAYS,
                    rate: DEFAULT_MEDIUM_RATE as u64,
                },
                TierConfig {
                    period_days: DEFAULT_LONG_PERIOD_DAYS,
                    rate: DEFAULT_LONG_RATE as u64,
                },
            ],
            minimum_rate: DEFAULT_MINIMUM_RATE as u64,
            minimum_rate_period_days: DEFAULT_MINIMUM_RATE_PERIOD_DAYS,
            admin: "admin".to_string(),
        }
    }
}

impl LedgerConfig {
    /// Validate into a [`RateSchedule`].
    ///
    /// A rejected schedule surfaces as [`LedgerError::InvalidSchedule`].
    pub fn schedule(&self) -> Result<RateSchedule, LedgerError> {
        let schedule = RateSchedule::new(
            self.tiers.map(Tier::from),
            Rate::from_raw(self.minimum_rate as u128),
            self.minimum_rate_period_days,
        )?;
        Ok(schedule)
    }

    pub fn admin(&self) -> Identity {
        Identity::new(self.admin.clone())
    }
}
