//! Error types for the Tally ledger.
use thiserror::Error;

use crate::types::{Amount, Days, Identity, PositionId, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompoundError {
    #[error("fixed-point overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: Amount, need: Amount },
    #[error("insufficient custody: have {have}, need {need}")] InsufficientCustody { have: Amount, need: Amount },
    #[error("transfer rejected: {0}")] Rejected(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("zero staking period")] ZeroPeriod,
    #[error("duplicate tier period: {0} days")] DuplicatePeriod(Days),
    #[error("minimum-rate period {0} days collides with a tier")] MinimumPeriodCollides(Days),
}

/// Every failure a ledger operation can surface to its caller.
///
/// A failed operation leaves no mutated state, no emitted event and no
/// completed transfer behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be greater than zero")] InvalidAmount,
    #[error("invalid staking period: {0} days")] InvalidPeriod(Days),
    #[error("no live position with id {0}")] InvalidPosition(PositionId),
    #[error("term of position {id} ends at {ends_at}")] TermNotElapsed { id: PositionId, ends_at: Timestamp },
    #[error("insufficient withdrawable: requested {requested}, available {available}")] InsufficientWithdrawable { requested: Amount, available: Amount },
    #[error("length mismatch: {left} != {right}")] LengthMismatch { left: usize, right: usize },
    #[error("unauthorized: {0}")] Unauthorized(Identity),
    #[error("transfer failed: {0}")] TransferFailure(#[from] TransferError),
    #[error("arithmetic overflow")] Overflow,
    #[error("invalid schedule: {0}")] InvalidSchedule(#[from] ScheduleError),
}

impl From<CompoundError> for LedgerError {
    fn from(err: CompoundError) -> Self {
        match err {
            CompoundError::Overflow => Self::Overflow,
        }
    }
}
