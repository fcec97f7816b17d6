//! Unsigned Q64.64 fixed-point primitives.
//!
//! A value `x` is stored as `x * 2^64` in a `u128`, so the representable range
//! is `[0, 2^64)` with a resolution of `2^-64`. Multiplication widens to 256
//! bits through 64-bit limbs and truncates the result.

use tally_core::constants::{FIXED_POINT_FRACTION_BITS, RATE_PRECISION};
use tally_core::error::CompoundError;
use tally_core::types::Rate;

/// `1.0` in Q64.64.
pub const ONE: u128 = 1 << FIXED_POINT_FRACTION_BITS;

const LO_MASK: u128 = u64::MAX as u128;

/// Compute `floor(a * b / 2^64)`.
///
/// With both operands in Q64.64 this is the truncated fixed-point product.
/// With `a` a plain integer it scales `a` by the fixed-point `b`.
/// Fails if the result does not fit in a `u128`.
pub fn mul(a: u128, b: u128) -> Result<u128, CompoundError> {
    let (a_hi, a_lo) = (a >> 64, a & LO_MASK);
    let (b_hi, b_lo) = (b >> 64, b & LO_MASK);

    // Each limb product is below 2^128.
    let hh = a_hi * b_hi;
    let hl = a_hi * b_lo;
    let lh = a_lo * b_hi;
    let ll = a_lo * b_lo;

    if hh >> 64 != 0 {
        return Err(CompoundError::Overflow);
    }

    (hh << 64)
        .checked_add(hl)
        .and_then(|v| v.checked_add(lh))
        .and_then(|v| v.checked_add(ll >> 64))
        .ok_or(CompoundError::Overflow)
}

/// Daily growth factor `1 + rate` in Q64.64, truncated.
pub fn from_rate(rate: Rate) -> Result<u128, CompoundError> {
    let raw = rate.raw();
    let whole = raw / RATE_PRECISION;
    // Remainder is below 10^18 < 2^60, so the shift cannot overflow.
    let frac = ((raw % RATE_PRECISION) << FIXED_POINT_FRACTION_BITS) / RATE_PRECISION;

    let int_part = whole.checked_add(1).ok_or(CompoundError::Overflow)?;
    if int_part > LO_MASK {
        return Err(CompoundError::Overflow);
    }
    Ok((int_part << FIXED_POINT_FRACTION_BITS) | frac)
}

/// Fixed-point exponentiation: `base^exp` in Q64.64.
///
/// Binary exponentiation, O(log exp) multiplications, each truncated.
pub fn pow(base: u128, exp: u64) -> Result<u128, CompoundError> {
    if exp == 0 {
        return Ok(ONE);
    }

    let mut result = ONE;
    let mut b = base;
    let mut e = exp;

    while e > 0 {
        if e & 1 == 1 {
            result = mul(result, b)?;
        }
        e >>= 1;
        if e > 0 {
            b = mul(b, b)?;
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn mul_identity() {
        assert_eq!(mul(ONE, ONE).unwrap(), ONE);
        assert_eq!(mul(12_345, ONE).unwrap(), 12_345);
        assert_eq!(mul(u128::MAX, ONE).unwrap(), u128::MAX);
    }

    #[test]
    fn mul_half() {
        let half = ONE / 2;
        assert_eq!(mul(ONE, half).unwrap(), half);
        assert_eq!(mul(half, half).unwrap(), ONE / 4);
        // 3 * 0.5 = 1.5 truncates to 1 when the left side is an integer.
        assert_eq!(mul(3, half).unwrap(), 1);
    }

    #[test]
    fn mul_zero() {
        assert_eq!(mul(0, u128::MAX).unwrap(), 0);
        assert_eq!(mul(u128::MAX, 0).unwrap(), 0);
    }

    #[test]
    fn mul_overflow() {
        // 2^64 * 2^64 (Q64.64) = 2^64, which is out of range.
        let big = ONE << 63;
        assert_eq!(mul(big, big), Err(CompoundError::Overflow));
        assert_eq!(mul(u128::MAX, 2 * ONE), Err(CompoundError::Overflow));
    }

    #[test]
    fn mul_truncates() {
        // Smallest positive values: 2^-64 * 2^-64 truncates to zero.
        assert_eq!(mul(1, 1).unwrap(), 0);
        assert_eq!(mul(ONE + 1, ONE + 1).unwrap(), ONE + 2);
    }

    #[test]
    fn from_rate_zero_is_one() {
        assert_eq!(from_rate(Rate::ZERO).unwrap(), ONE);
    }

    #[test]
    fn from_rate_whole_percentages() {
        // 100 %/day doubles.
        assert_eq!(from_rate(Rate::from_raw(RATE_PRECISION)).unwrap(), 2 * ONE);
        // 50 %/day.
        assert_eq!(
            from_rate(Rate::from_raw(RATE_PRECISION / 2)).unwrap(),
            ONE + ONE / 2
        );
    }

    #[test]
    fn from_rate_truncates_fraction() {
        // 1e-18 * 2^64 = 18.44..., truncated to 18.
        assert_eq!(from_rate(Rate::from_raw(1)).unwrap(), ONE + 18);
    }

    #[test]
    fn from_rate_overflow() {
        let too_big = Rate::from_raw(u128::MAX);
        assert_eq!(from_rate(too_big), Err(CompoundError::Overflow));
    }

    #[test]
    fn pow_zero_exponent() {
        assert_eq!(pow(5 * ONE, 0).unwrap(), ONE);
        assert_eq!(pow(0, 0).unwrap(), ONE);
    }

    #[test]
    fn pow_of_two() {
        assert_eq!(pow(2 * ONE, 10).unwrap(), 1024 * ONE);
        assert_eq!(pow(2 * ONE, 63).unwrap(), (1u128 << 63) * ONE);
        assert_eq!(pow(2 * ONE, 64), Err(CompoundError::Overflow));
    }

    #[test]
    fn pow_of_one_is_exact() {
        assert_eq!(pow(ONE, u64::MAX).unwrap(), ONE);
    }

    proptest! {
        #[test]
        fn mul_commutative(a in any::<u64>(), b in any::<u128>()) {
            let a = a as u128;
            prop_assert_eq!(mul(a, b), mul(b, a));
        }

        #[test]
        fn mul_by_one_is_identity(x in any::<u128>()) {
            prop_assert_eq!(mul(x, ONE).unwrap(), x);
        }

        #[test]
        fn pow_never_below_one(frac in 0u128..(1u128 << 60), exp in 0u64..10_000) {
            let base = ONE + frac;
            if let Ok(v) = pow(base, exp) {
                prop_assert!(v >= ONE);
            }
        }
    }
}
