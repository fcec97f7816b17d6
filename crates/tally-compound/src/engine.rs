//! Compounding engine implementing the [`CompoundCalculator`] trait.
//!
//! Accrued value is `principal * (1 + rate)^days`. The daily factor is
//! converted to Q64.64, raised to `days` by binary exponentiation, and applied
//! to the principal. Every step truncates toward zero.

use tally_core::error::CompoundError;
use tally_core::traits::CompoundCalculator;
use tally_core::types::{Amount, Days, Rate};
use tracing::trace;

use crate::fixed;

/// The production compounding calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompoundEngine;

impl CompoundEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Growth factor `(1 + rate)^days` in Q64.64.
pub fn growth_factor(rate: Rate, days: Days) -> Result<u128, CompoundError> {
    fixed::pow(fixed::from_rate(rate)?, days)
}

/// Compute `principal * (1 + rate)^days`, truncated to a whole amount.
///
/// `days == 0` returns `principal` exactly, as does `rate == 0`.
///
/// # Errors
///
/// [`CompoundError::Overflow`] if the growth factor leaves the Q64.64 range or
/// the scaled principal exceeds `u128::MAX`.
pub fn compound(rate: Rate, principal: Amount, days: Days) -> Result<Amount, CompoundError> {
    if days == 0 || principal == 0 {
        return Ok(principal);
    }
    let factor = growth_factor(rate, days)?;
    let value = fixed::mul(principal, factor)?;
    trace!(%rate, principal, days, value, "compounded");
    Ok(value)
}

impl CompoundCalculator for CompoundEngine {
    fn compound(&self, rate: Rate, principal: Amount, days: Days) -> Result<Amount, CompoundError> {
        compound(rate, principal, days)
    }
}
