//! # tally-ledger: position ledger for tiered staking rewards.
//!
//! # Modules
//!
//! - [`store`]: per-owner position sets and the global id counter
//! - [`ledger`]: stake / extend / withdraw / batch / admin operations
//! - [`memory`]: in-memory asset ledger, clocks, event logs and authorizer
//! - [`config`]: serde-loadable ledger configuration

pub mod config;
pub mod ledger;
pub mod memory;
pub mod store;

pub use config::{LedgerConfig, TierConfig};
pub use ledger::{Collaborators, PositionLedger, WithdrawReceipt};
pub use memory::{
    ManualClock, MemoryAssetLedger, MemoryBackend, MemoryEventLog, StaticAdmin, SystemClock,
    TracingEventSink, TransferRecord,
};
pub use store::{PositionSet, PositionStore};
