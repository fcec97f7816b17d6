//! In-memory collaborators.
//!
//! [`MemoryAssetLedger`] keeps per-identity balances plus the ledger's custody
//! balance and rejects overdrafts without touching state. [`ManualClock`] is a
//! settable clock for tests and scripted replays. [`MemoryEventLog`] records
//! events in emission order. None of these persist anything.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use tally_compound::CompoundEngine;
use tally_core::constants::SECONDS_PER_DAY;
use tally_core::error::TransferError;
use tally_core::events::LedgerEvent;
use tally_core::schedule::RateSchedule;
use tally_core::traits::{AssetLedger, Authorizer, Clock, EventSink};
use tally_core::types::{Amount, Days, Identity, Timestamp};

use crate::ledger::{Collaborators, PositionLedger};
use crate::store::PositionStore;

/// A completed transfer, as recorded by [`MemoryAssetLedger`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "direction", rename_all = "snake_case")]
pub enum TransferRecord {
    In { from: Identity, amount: Amount },
    Out { to: Identity, amount: Amount },
}

#[derive(Debug, Default)]
struct AssetBook {
    balances: HashMap<Identity, Amount>,
    custody: Amount,
    transfers: Vec<TransferRecord>,
}

/// Fungible-asset ledger held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryAssetLedger {
    book: Mutex<AssetBook>,
}

impl MemoryAssetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` to `who` out of thin air.
    pub fn mint(&self, who: &Identity, amount: Amount) {
        let mut book = self.book.lock();
        let balance = book.balances.entry(who.clone()).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Credit the ledger's custody directly, e.g. to fund reward reserves.
    pub fn fund_custody(&self, amount: Amount) {
        let mut book = self.book.lock();
        book.custody = book.custody.saturating_add(amount);
    }

    pub fn balance_of(&self, who: &Identity) -> Amount {
        self.book.lock().balances.get(who).copied().unwrap_or(0)
    }

    pub fn custody(&self) -> Amount {
        self.book.lock().custody
    }

    /// Completed transfers in order.
    pub fn transfers(&self) -> Vec<TransferRecord> {
        self.book.lock().transfers.clone()
    }
}

impl AssetLedger for MemoryAssetLedger {
    fn transfer_in(&self, from: &Identity, amount: Amount) -> Result<(), TransferError> {
        let mut book = self.book.lock();
        let have = book.balances.get(from).copied().unwrap_or(0);
        if have < amount {
            return Err(TransferError::InsufficientBalance { have, need: amount });
        }
        let custody = book
            .custody
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("custody overflow".into()))?;
        book.balances.insert(from.clone(), have - amount);
        book.custody = custody;
        book.transfers.push(TransferRecord::In {
            from: from.clone(),
            amount,
        });
        Ok(())
    }

    fn transfer_out(&self, to: &Identity, amount: Amount) -> Result<(), TransferError> {
        let mut book = self.book.lock();
        if book.custody < amount {
            return Err(TransferError::InsufficientCustody {
                have: book.custody,
                need: amount,
            });
        }
        let balance = book.balances.get(to).copied().unwrap_or(0);
        let balance = balance
            .checked_add(amount)
            .ok_or_else(|| TransferError::Rejected("balance overflow".into()))?;
        book.custody -= amount;
        book.balances.insert(to.clone(), balance);
        book.transfers.push(TransferRecord::Out {
            to: to.clone(),
            amount,
        });
        Ok(())
    }
}

/// Grants admin rights to exactly one identity.
#[derive(Debug, Clone)]
pub struct StaticAdmin {
    admin: Identity,
}

impl StaticAdmin {
    pub fn new(admin: Identity) -> Self {
        Self { admin }
    }
}

impl Authorizer for StaticAdmin {
    fn is_admin(&self, identity: &Identity) -> bool {
        *identity == self.admin
    }
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        chrono::Utc::now().timestamp().max(0) as Timestamp
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `secs`, stopping at the end of time.
    pub fn advance_secs(&self, secs: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                Some(now.saturating_add(secs))
            });
    }

    pub fn advance_days(&self, days: Days) {
        self.advance_secs(days.saturating_mul(SECONDS_PER_DAY));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}

/// Append-only in-memory event log.
#[derive(Debug, Default)]
pub struct MemoryEventLog {
    events: Mutex<Vec<LedgerEvent>>,
}

impl MemoryEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for MemoryEventLog {
    fn emit(&self, event: LedgerEvent) {
        self.events.lock().push(event);
    }
}

/// Event sink that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: LedgerEvent) {
        info!(target: "tally::events", caller = %event.caller(), ?event, "ledger event");
    }
}

/// A ledger wired to in-memory collaborators, with handles kept for inspection.
pub struct MemoryBackend {
    pub assets: Arc<MemoryAssetLedger>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<MemoryEventLog>,
    pub admin: Identity,
}

impl MemoryBackend {
    pub fn new(admin: Identity, start: Timestamp) -> Self {
        Self {
            assets: Arc::new(MemoryAssetLedger::new()),
            clock: Arc::new(ManualClock::new(start)),
            events: Arc::new(MemoryEventLog::new()),
            admin,
        }
    }

    /// Build a ledger over a fresh store that shares this backend's handles.
    pub fn ledger(&self, schedule: RateSchedule) -> PositionLedger {
        PositionLedger::new(
            schedule,
            PositionStore::new(),
            Collaborators {
                calculator: Arc::new(CompoundEngine::new()),
                assets: Arc::clone(&self.assets) as Arc<dyn AssetLedger>,
                authorizer: Arc::new(StaticAdmin::new(self.admin.clone())),
                clock: Arc::clone(&self.clock) as Arc<dyn Clock>,
                events: Arc::clone(&self.events) as Arc<dyn EventSink>,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Identity {
        Identity::from("alice")
    }

    #[test]
    fn transfer_in_moves_to_custody() {
        let assets = MemoryAssetLedger::new();
        assets.mint(&alice(), 500);
        assets.transfer_in(&alice(), 200).unwrap();
        assert_eq!(assets.balance_of(&alice()), 300);
        assert_eq!(assets.custody(), 200);
        assert_eq!(
            assets.transfers(),
            vec![TransferRecord::In { from: alice(), amount: 200 }]
        );
    }

    #[test]
    fn transfer_in_rejects_overdraft_without_mutation() {
        let assets = MemoryAssetLedger::new();
        assets.mint(&alice(), 100);
        let err = assets.transfer_in(&alice(), 101).unwrap_err();
        assert_eq!(err, TransferError::InsufficientBalance { have: 100, need: 101 });
        assert_eq!(assets.balance_of(&alice()), 100);
        assert_eq!(assets.custody(), 0);
        assert!(assets.transfers().is_empty());
    }

    #[test]
    fn transfer_out_requires_custody() {
        let assets = MemoryAssetLedger::new();
        assets.fund_custody(50);
        let err = assets.transfer_out(&alice(), 60).unwrap_err();
        assert_eq!(err, TransferError::InsufficientCustody { have: 50, need: 60 });
        assets.transfer_out(&alice(), 50).unwrap();
        assert_eq!(assets.balance_of(&alice()), 50);
        assert_eq!(assets.custody(), 0);
    }

    #[test]
    fn static_admin() {
        let auth = StaticAdmin::new(Identity::from("root"));
        assert!(auth.is_admin(&Identity::from("root")));
        assert!(!auth.is_admin(&alice()));
    }

    #[test]
    fn manual_clock_moves_only_when_told() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now(), 1_000);
        clock.advance_days(2);
        assert_eq!(clock.now(), 1_000 + 2 * SECONDS_PER_DAY);
        clock.set(5);
        assert_eq!(clock.now(), 5);
    }

    #[test]
    fn manual_clock_saturates_instead_of_wrapping() {
        let clock = ManualClock::new(1_000);
        clock.advance_secs(u64::MAX);
        assert_eq!(clock.now(), u64::MAX);
        clock.advance_days(1);
        assert_eq!(clock.now(), u64::MAX);
    }

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now() > 1_577_836_800);
    }

    #[test]
    fn event_log_preserves_order() {
        let log = MemoryEventLog::new();
        for amount in [1, 2, 3] {
            log.emit(LedgerEvent::AdminWithdrawn {
                admin: alice(),
                amount,
            });
        }
        let amounts: Vec<_> = log
            .events()
            .into_iter()
            .map(|e| match e {
                LedgerEvent::AdminWithdrawn { amount, .. } => amount,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(amounts, vec![1, 2, 3]);
    }

    #[test]
    fn tracing_sink_plugs_into_a_ledger() {
        let ledger = PositionLedger::new(
            RateSchedule::default(),
            PositionStore::new(),
            Collaborators {
                calculator: Arc::new(CompoundEngine::new()),
                assets: Arc::new(MemoryAssetLedger::new()),
                authorizer: Arc::new(StaticAdmin::new(alice())),
                clock: Arc::new(SystemClock),
                events: Arc::new(TracingEventSink),
            },
        );
        assert_eq!(
            ledger.admin_withdraw(&alice(), 1),
            Err(tally_core::error::LedgerError::TransferFailure(
                TransferError::InsufficientCustody { have: 0, need: 1 }
            ))
        );
        TracingEventSink.emit(LedgerEvent::AdminWithdrawn {
            admin: alice(),
            amount: 1,
        });
    }
}
