//! # tally-core
//! Foundation types and traits for the Tally staking ledger.

pub mod constants;
pub mod error;
pub mod events;
pub mod schedule;
pub mod traits;
pub mod types;
