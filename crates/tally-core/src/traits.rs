//! Trait interfaces for the Tally ledger.
//!
//! These traits define the contracts between the ledger and its collaborators:
//! - [`CompoundCalculator`]: compounding math (tally-compound implements)
//! - [`AssetLedger`]: custody and transfer of the staked asset
//! - [`Authorizer`]: capability check for administrative withdrawals
//! - [`Clock`]: time source for term and accrual arithmetic
//! - [`EventSink`]: append-only consumer of [`LedgerEvent`]s

use crate::error::{CompoundError, TransferError};
use crate::events::LedgerEvent;
use crate::types::{Amount, Days, Identity, Rate, Timestamp};

/// Discrete daily compounding.
pub trait CompoundCalculator: Send + Sync {
    /// Compute `principal * (1 + rate)^days`.
    ///
    /// Returns `principal` unchanged when `days == 0`. Implementations must be
    /// deterministic and must fail with [`CompoundError::Overflow`] instead of
    /// wrapping.
    fn compound(&self, rate: Rate, principal: Amount, days: Days) -> Result<Amount, CompoundError>;
}

/// External fungible-asset ledger holding the staked funds.
///
/// A failed call must leave balances untouched.
pub trait AssetLedger: Send + Sync {
    /// Move `amount` from `from` into the ledger's custody.
    fn transfer_in(&self, from: &Identity, amount: Amount) -> Result<(), TransferError>;

    /// Move `amount` out of custody to `to`.
    fn transfer_out(&self, to: &Identity, amount: Amount) -> Result<(), TransferError>;
}

/// Capability check gating administrative operations.
pub trait Authorizer: Send + Sync {
    fn is_admin(&self, identity: &Identity) -> bool;
}

/// Monotonic time source, in Unix seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Append-only consumer of ledger events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: LedgerEvent);
}
