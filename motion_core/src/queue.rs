//! MoveQueue: bounded ring of move segments with O(1) per-axis remaining
//! step sums (§3 "MoveQueue", §4.3, §8 invariant `queue_rem_steps[a] ==
//! Σ queued.s_a`).

use heapless::Deque;
use motion_common::consts::{MOVE_QUEUE_CAPACITY, NUM_AXES};
use motion_common::types::MoveSegment;

/// Outcome of [`MoveQueue::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePushOutcome {
    Ok,
    Full,
}

pub struct MoveQueue {
    ring: Deque<MoveSegment, MOVE_QUEUE_CAPACITY>,
    /// `queue_rem_steps[a] = Σ segments-in-queue of s_a`, kept in lockstep
    /// with `ring` on every push/pop so reading it is O(1).
    queue_rem_steps: [u32; NUM_AXES],
}

impl MoveQueue {
    pub const fn new() -> Self {
        MoveQueue {
            ring: Deque::new(),
            queue_rem_steps: [0; NUM_AXES],
        }
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.len() == MOVE_QUEUE_CAPACITY
    }

    pub fn queue_rem_steps(&self, axis: usize) -> u32 {
        self.queue_rem_steps[axis]
    }

    /// Appends `seg`, failing with `Full` if `count == capacity` (§4.3).
    pub fn push(&mut self, seg: MoveSegment) -> QueuePushOutcome {
        if self.is_full() {
            return QueuePushOutcome::Full;
        }
        for axis in 0..NUM_AXES {
            self.queue_rem_steps[axis] += seg.steps[axis];
        }
        // Capacity was just checked; push_back cannot fail.
        let _ = self.ring.push_back(seg);
        QueuePushOutcome::Ok
    }

    /// Removes and returns the oldest segment, decrementing the per-axis sums.
    pub fn pop_front(&mut self) -> Option<MoveSegment> {
        let seg = self.ring.pop_front()?;
        for axis in 0..NUM_AXES {
            self.queue_rem_steps[axis] -= seg.steps[axis];
        }
        Some(seg)
    }

    /// Zeroes indices, count and all sums.
    pub fn clear(&mut self) {
        self.ring.clear();
        self.queue_rem_steps = [0; NUM_AXES];
    }

    /// Recomputes `queue_rem_steps` from scratch by scanning the ring;
    /// used only by tests/proptests to check the invariant independently
    /// of the incremental bookkeeping above.
    #[cfg(test)]
    fn recompute_rem_steps(&self) -> [u32; NUM_AXES] {
        let mut sums = [0u32; NUM_AXES];
        for seg in self.ring.iter() {
            for axis in 0..NUM_AXES {
                sums[axis] += seg.steps[axis];
            }
        }
        sums
    }
}

impl Default for MoveQueue {
    fn default() -> Self {
        Self::new()
    }
}
