//! Core ledger types: identities, rates, positions and position slots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{RATE_PRECISION, SECONDS_PER_DAY};

/// Asset amount in the asset's smallest unit.
pub type Amount = u128;

/// Unix timestamp in seconds.
pub type Timestamp = u64;

/// Duration measured in whole accrual days.
pub type Days = u64;

/// Globally unique, monotonically assigned position identifier.
pub type PositionId = u64;

/// The staking identity that owns positions and signs operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Daily rate as a ratio scaled by [`RATE_PRECISION`].
///
/// `Rate::from_raw(200_000_000_000_000)` is 0.02 % per day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rate(u128);

impl Rate {
    pub const ZERO: Self = Self(0);

    pub const fn from_raw(scaled: u128) -> Self {
        Self(scaled)
    }

    /// Build a rate from parts-per-million per day (200 ppm = 0.02 %/day).
    ///
    /// ```
    /// use tally_core::types::Rate;
    /// assert_eq!(Rate::from_ppm(200).raw(), 200_000_000_000_000);
    /// ```
    pub const fn from_ppm(ppm: u128) -> Self {
        Self(ppm * (RATE_PRECISION / 1_000_000))
    }

    pub const fn raw(&self) -> u128 {
        self.0
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Render as percent per day with six decimals.
        let micro_percent = self.0 / (RATE_PRECISION / 100_000_000);
        write!(
            f,
            "{}.{:06}%/day",
            micro_percent / 1_000_000,
            micro_percent % 1_000_000
        )
    }
}

/// One staking commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub owner: Identity,
    /// Principal locked at `start_time`. Always non-zero for a stored position.
    pub staked_amount: Amount,
    pub staking_period: Days,
    pub start_time: Timestamp,
}

impl Position {
    /// Moment the chosen term ends.
    pub fn term_end(&self) -> Timestamp {
        self.start_time
            .saturating_add(self.staking_period.saturating_mul(SECONDS_PER_DAY))
    }

    /// Whether `now - start_time >= staking_period` holds.
    pub fn is_term_elapsed(&self, now: Timestamp) -> bool {
        now >= self.term_end()
    }

    /// Whole days elapsed since `start_time`, rounded down. Zero if `now` precedes the start.
    pub fn elapsed_days(&self, now: Timestamp) -> Days {
        now.saturating_sub(self.start_time) / SECONDS_PER_DAY
    }
}

/// A stored slot in a position set.
///
/// Closing a position replaces its slot with `Closed`; slots are never removed
/// so index and id references stay stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PositionSlot {
    Active(Position),
    Closed { id: PositionId },
}

impl PositionSlot {
    pub fn id(&self) -> PositionId {
        match self {
            Self::Active(p) => p.id,
            Self::Closed { id } => *id,
        }
    }

    pub fn active(&self) -> Option<&Position> {
        match self {
            Self::Active(p) => Some(p),
            Self::Closed { .. } => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed { .. })
    }
}
