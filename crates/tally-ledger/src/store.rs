//! Position storage: per-owner position sets and the global id counter.
//!
//! Each owner's [`PositionSet`] sits behind its own `Mutex`, so operations on
//! one owner are serialized while different owners proceed independently.
//! Ids come from a single atomic counter shared by all owners and are only
//! drawn when a position is committed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use tally_core::constants::FIRST_POSITION_ID;
use tally_core::types::{Identity, Position, PositionId, PositionSlot};

/// One owner's positions in id order, closed slots included.
#[derive(Debug, Clone, Default)]
pub struct PositionSet {
    slots: Vec<PositionSlot>,
    /// id → index into `slots`.
    index: HashMap<PositionId, usize>,
}

impl PositionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a newly committed position.
    ///
    /// Ids must arrive in increasing order; the caller draws them from
    /// [`PositionStore::allocate_id`] while holding this set's lock.
    pub fn push(&mut self, position: Position) {
        debug_assert!(
            self.slots.last().is_none_or(|s| s.id() < position.id),
            "position ids must increase"
        );
        debug_assert!(position.staked_amount > 0, "stored positions are non-empty");
        self.index.insert(position.id, self.slots.len());
        self.slots.push(PositionSlot::Active(position));
    }

    /// Close an active position in place and return its final state.
    ///
    /// Returns `None` if the id is unknown or already closed.
    pub fn close(&mut self, id: PositionId) -> Option<Position> {
        let idx = *self.index.get(&id)?;
        let slot = &mut self.slots[idx];
        if slot.is_closed() {
            return None;
        }
        match std::mem::replace(slot, PositionSlot::Closed { id }) {
            PositionSlot::Active(p) => Some(p),
            PositionSlot::Closed { .. } => None,
        }
    }

    pub fn get(&self, id: PositionId) -> Option<&PositionSlot> {
        self.index.get(&id).map(|&idx| &self.slots[idx])
    }

    /// The live position with `id`, if any.
    pub fn active(&self, id: PositionId) -> Option<&Position> {
        self.get(id).and_then(PositionSlot::active)
    }

    pub fn slots(&self) -> &[PositionSlot] {
        &self.slots
    }

    pub fn active_positions(&self) -> impl Iterator<Item = &Position> {
        self.slots.iter().filter_map(PositionSlot::active)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// All owners' position sets plus the global id counter.
///
/// Owned by a single ledger instance; nothing here is process-global.
#[derive(Debug)]
pub struct PositionStore {
    owners: DashMap<Identity, Arc<Mutex<PositionSet>>>,
    next_id: AtomicU64,
}

impl PositionStore {
    pub fn new() -> Self {
        Self {
            owners: DashMap::new(),
            next_id: AtomicU64::new(FIRST_POSITION_ID),
        }
    }

    /// The owner's set, created empty on first use.
    ///
    /// The map guard is dropped before returning so callers can hold the
    /// set's lock without blocking other owners.
    pub fn owner_set(&self, owner: &Identity) -> Arc<Mutex<PositionSet>> {
        if let Some(set) = self.owners.get(owner) {
            return Arc::clone(set.value());
        }
        Arc::clone(self.owners.entry(owner.clone()).or_default().value())
    }

    /// The owner's set if it has ever been created.
    pub fn existing_set(&self, owner: &Identity) -> Option<Arc<Mutex<PositionSet>>> {
        self.owners.get(owner).map(|set| Arc::clone(set.value()))
    }

    /// Ordered copy of an owner's slots, closed slots included.
    pub fn snapshot(&self, owner: &Identity) -> Vec<PositionSlot> {
        self.existing_set(owner)
            .map(|set| set.lock().slots().to_vec())
            .unwrap_or_default()
    }

    /// The id the next committed position will receive.
    pub fn next_id(&self) -> PositionId {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Draw the next id. Only called at commit time, after every fallible step.
    pub(crate) fn allocate_id(&self) -> PositionId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Every owner that has a set, sorted.
    pub fn owners(&self) -> Vec<Identity> {
        let mut owners: Vec<Identity> = self.owners.iter().map(|e| e.key().clone()).collect();
        owners.sort();
        owners
    }
}

impl Default for PositionStore {
    fn default() -> Self {
        Self::new()
    }
}
