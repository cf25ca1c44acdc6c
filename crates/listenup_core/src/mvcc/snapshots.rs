//! Registry of live read snapshots.

use crate::types::SequenceNumber;
use parking_lot::Mutex;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct State {
    committed: SequenceNumber,
    live: BTreeMap<SequenceNumber, usize>,
}

/// Tracks the committed sequence and every snapshot still in use.
///
/// Registering a snapshot and publishing a commit happen under the same
/// lock, so a snapshot is never taken between a commit becoming visible and
/// the pruning horizon being computed for it.
#[derive(Debug, Default)]
pub(crate) struct SnapshotRegistry {
    state: Mutex<State>,
}

impl SnapshotRegistry {
    pub(crate) fn new(committed: SequenceNumber) -> Self {
        Self {
            state: Mutex::new(State {
                committed,
                live: BTreeMap::new(),
            }),
        }
    }

    /// Latest committed sequence number.
    pub(crate) fn committed(&self) -> SequenceNumber {
        self.state.lock().committed
    }

    /// Registers a snapshot at the latest committed sequence.
    pub(crate) fn acquire(&self) -> SnapshotGuard<'_> {
        let mut state = self.state.lock();
        let seq = state.committed;
        *state.live.entry(seq).or_insert(0) += 1;
        SnapshotGuard {
            registry: self,
            seq,
        }
    }

    fn release(&self, seq: SequenceNumber) {
        let mut state = self.state.lock();
        if let Some(count) = state.live.get_mut(&seq) {
            *count -= 1;
            if *count == 0 {
                state.live.remove(&seq);
            }
        }
    }

    /// Makes `seq` the committed sequence and returns the pruning horizon.
    pub(crate) fn publish(&self, seq: SequenceNumber) -> SequenceNumber {
        let mut state = self.state.lock();
        state.committed = seq;
        Self::horizon(&state)
    }

    /// Oldest sequence any live or future snapshot can read at.
    pub(crate) fn oldest(&self) -> SequenceNumber {
        Self::horizon(&self.state.lock())
    }

    fn horizon(state: &State) -> SequenceNumber {
        state
            .live
            .keys()
            .next()
            .copied()
            .map_or(state.committed, |first| first.min(state.committed))
    }

    /// Number of snapshots currently held.
    pub(crate) fn live_count(&self) -> usize {
        self.state.lock().live.values().sum()
    }
}

/// A registered snapshot, released on drop.
#[derive(Debug)]
pub(crate) struct SnapshotGuard<'a> {
    registry: &'a SnapshotRegistry,
    seq: SequenceNumber,
}

impl SnapshotGuard<'_> {
    pub(crate) fn seq(&self) -> SequenceNumber {
        self.seq
    }
}

impl Drop for SnapshotGuard<'_> {
    fn drop(&mut self) {
        self.registry.release(self.seq);
    }
}
