use std::cmp::Reverse;
use std::collections::BinaryHeap;

use scale_engine::CreatureId;

/// Why a creature entered the world. Each reason waits a few ticks before
/// its first resolution so the creature's state has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpawnReason {
    Natural,
    Spawner,
    Breeding,
    Command,
    Other,
}

impl SpawnReason {
    pub(crate) fn delay_ticks(self) -> u64 {
        match self {
            SpawnReason::Natural => 2,
            SpawnReason::Spawner => 3,
            SpawnReason::Breeding => 3,
            SpawnReason::Command => 1,
            SpawnReason::Other => 2,
        }
    }
}

#[derive(Debug)]
pub(crate) struct SpawnQueue {
    // (due tick, insertion sequence) keeps same-tick entries in FIFO order
    pending: BinaryHeap<Reverse<(u64, u64, CreatureId)>>,
    next_sequence: u64,
    max_per_tick: usize,
}

impl SpawnQueue {
    pub(crate) fn new(max_per_tick: usize) -> Self {
        Self {
            pending: BinaryHeap::new(),
            next_sequence: 0,
            max_per_tick: max_per_tick.max(1),
        }
    }

    pub(crate) fn schedule(&mut self, creature: CreatureId, reason: SpawnReason, now: u64) {
        let due = now + reason.delay_ticks();
        self.pending.push(Reverse((due, self.next_sequence, creature)));
        self.next_sequence += 1;
    }

    /// Pops the creatures due at or before `now`, at most `max_per_tick` of
    /// them. Anything left over stays queued for the next tick.
    pub(crate) fn drain_due(&mut self, now: u64) -> Vec<CreatureId> {
        let mut due = Vec::new();
        while due.len() < self.max_per_tick {
            let Some(Reverse((tick, _, creature))) = self.pending.peek().copied() else {
                break;
            };
            if tick > now {
                break;
            }
            self.pending.pop();
            due.push(creature);
        }
        due
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}
