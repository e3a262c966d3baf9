//! Bounded FIFO of pending mode notifications for one connection.
//!
//! Every transition is appended here and drained in order by a single
//! delivering context at a time. When the queue is full the most recent
//! pending entry is overwritten, so the last reported mode still ends up
//! correct.

use std::collections::VecDeque;

use super::Mode;

/// Outcome of appending a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModePush {
    /// Appended; nobody is delivering, the caller should deliver now.
    Deliver,
    /// Appended while another delivery is in flight; schedule a deferred
    /// delivery.
    Deferred,
    /// Queue full; the newest pending entry was overwritten.
    Overflowed { delivering: bool },
}

#[derive(Debug, Clone)]
pub struct ModeChangeQueue {
    pending: VecDeque<Mode>,
    capacity: usize,
    delivering: bool,
}

impl ModeChangeQueue {
    /// # Panics
    ///
    /// Panics if `capacity` is zero; configuration validation rejects it.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "mode change queue needs room for one entry");
        Self {
            pending: VecDeque::with_capacity(capacity),
            capacity,
            delivering: false,
        }
    }

    pub fn push(&mut self, mode: Mode) -> ModePush {
        if self.pending.len() == self.capacity {
            if let Some(last) = self.pending.back_mut() {
                *last = mode;
            }
            return ModePush::Overflowed {
                delivering: self.delivering,
            };
        }
        self.pending.push_back(mode);
        if self.delivering {
            ModePush::Deferred
        } else {
            ModePush::Deliver
        }
    }

    /// Claim the single-flight delivery slot.
    ///
    /// Returns `false` if another context is already delivering.
    pub fn begin_delivery(&mut self) -> bool {
        if self.delivering {
            return false;
        }
        self.delivering = true;
        true
    }

    /// Next mode to deliver. Releases the delivery slot once drained.
    pub fn next_for_delivery(&mut self) -> Option<Mode> {
        let next = self.pending.pop_front();
        if next.is_none() {
            self.delivering = false;
        }
        next
    }

    pub fn is_delivering(&self) -> bool {
        self.delivering
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
        self.delivering = false;
    }
}
