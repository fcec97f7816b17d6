//! Ledger constants. Rates are daily ratios scaled by [`RATE_PRECISION`].

/// Fixed decimal scale of a [`Rate`](crate::types::Rate): `10^18` represents 100 %/day.
pub const RATE_PRECISION: u128 = 1_000_000_000_000_000_000;

/// Length of one accrual day in seconds.
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Fractional bits of the Q64.64 compounding representation.
pub const FIXED_POINT_FRACTION_BITS: u32 = 64;

/// Number of tiers a rate schedule carries.
pub const TIER_COUNT: usize = 3;

/// Short tier: 30 days at 0.02 %/day.
pub const DEFAULT_SHORT_PERIOD_DAYS: u64 = 30;
pub const DEFAULT_SHORT_RATE: u128 = 200_000_000_000_000;

/// Medium tier: 180 days at 0.04 %/day.
pub const DEFAULT_MEDIUM_PERIOD_DAYS: u64 = 180;
pub const DEFAULT_MEDIUM_RATE: u128 = 400_000_000_000_000;

/// Long tier: 1460 days (four years) at 0.1 %/day.
pub const DEFAULT_LONG_PERIOD_DAYS: u64 = 1460;
pub const DEFAULT_LONG_RATE: u128 = 1_000_000_000_000_000;

/// Floor rate, 0.005 %/day.
pub const DEFAULT_MINIMUM_RATE: u128 = 50_000_000_000_000;

/// Rollover duration for positions created without a chosen tier.
pub const DEFAULT_MINIMUM_RATE_PERIOD_DAYS: u64 = 1;

/// First id handed out by a fresh position store.
pub const FIRST_POSITION_ID: u64 = 1;
