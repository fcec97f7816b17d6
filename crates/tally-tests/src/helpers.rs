//! Shared fixtures for integration tests.

use tally_core::schedule::{RateSchedule, Tier};
use tally_core::types::{Amount, Identity, Rate, Timestamp};
use tally_ledger::{MemoryBackend, PositionLedger};

/// 10^18 base units per whole token.
pub const TOKEN: Amount = 1_000_000_000_000_000_000;

/// Fixed starting time for every fixture (2023-11-14T22:13:20Z).
pub const START: Timestamp = 1_700_000_000;

pub fn user(name: &str) -> Identity {
    Identity::from(name)
}

pub fn admin() -> Identity {
    user("admin")
}

/// A ledger over in-memory collaborators, with handles to inspect them.
pub struct Fixture {
    pub backend: MemoryBackend,
    pub ledger: PositionLedger,
}

impl Fixture {
    /// Default schedule, `reserves` pre-loaded into custody to pay rewards.
    pub fn new(reserves: Amount) -> Self {
        Self::with_schedule(RateSchedule::default(), reserves)
    }

    pub fn with_schedule(schedule: RateSchedule, reserves: Amount) -> Self {
        let backend = MemoryBackend::new(admin(), START);
        backend.assets.fund_custody(reserves);
        let ledger = backend.ledger(schedule);
        Self { backend, ledger }
    }

    /// Give `who` spendable balance.
    pub fn fund(&self, who: &Identity, amount: Amount) {
        self.backend.assets.mint(who, amount);
    }

    pub fn advance_days(&self, days: u64) {
        self.backend.clock.advance_days(days);
    }

    pub fn advance_secs(&self, secs: u64) {
        self.backend.clock.advance_secs(secs);
    }
}

/// The worked-example schedule: 30d at 0.02 %, 180d at 0.04 %, 1460d at 0.1 %,
/// minimum 0.005 %, one-day rollover.
pub fn example_schedule() -> RateSchedule {
    RateSchedule::new(
        [
            Tier::new(30, Rate::from_ppm(200)),
            Tier::new(180, Rate::from_ppm(400)),
            Tier::new(1_460, Rate::from_ppm(1_000)),
        ],
        Rate::from_ppm(50),
        1,
    )
    .expect("example schedule is valid")
}
