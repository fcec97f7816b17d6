//! # tally-compound: discrete daily compounding.
//!
//! All calculations use integer arithmetic only for determinism.
//!
//! - **Q64.64 fixed point**: growth factors are unsigned binary fixed-point
//!   numbers held in a `u128` (64 integer bits, 64 fractional bits).
//! - **Compound growth**: accrued value is `principal * (1 + rate)^days`,
//!   computed by binary exponentiation of the daily factor.
//! - **Truncation**: every conversion and multiply rounds toward zero, so a
//!   result never exceeds the exact mathematical value.

pub mod engine;
pub mod fixed;

pub use engine::{compound, growth_factor, CompoundEngine};
pub use fixed::ONE;
